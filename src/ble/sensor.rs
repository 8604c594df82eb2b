//! Connection management and the notification pump.

use crate::ble::uuids;
use crate::model::{now_polar_us, HrSample, SensorEvent, StreamSelection};
use crate::pmd::{self, ControlResponse, MeasurementType};
use crate::stats::SharedStreamStats;
use btleplug::api::{Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use crossbeam_channel::{bounded, Receiver, Sender};
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Errors from the BLE transport.
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("no Bluetooth adapter available")]
    NoAdapter,
    #[error("no device named \"{0}…\" found within the scan window")]
    DeviceNotFound(String),
    #[error("characteristic {0} not found on device")]
    MissingCharacteristic(Uuid),
    #[error("bluetooth error: {0}")]
    Ble(#[from] btleplug::Error),
}

/// A connected Verity Sense.
pub struct PolarSensor {
    peripheral: Peripheral,
    name: String,
    receiver: Receiver<SensorEvent>,
    pmd_control: Characteristic,
    pmd_data: Characteristic,
    hr_measurement: Characteristic,
    battery_level: Characteristic,
    /// PMD measurements currently started, for symmetric stop.
    active: Vec<MeasurementType>,
    selection: StreamSelection,
}

impl PolarSensor {
    /// Scan for a device whose advertised name starts with `name_prefix`,
    /// connect, and start the notification pump.
    ///
    /// The scan polls discovered peripherals once per second for up to
    /// `scan_timeout_secs`.
    pub async fn connect(
        name_prefix: &str,
        scan_timeout_secs: u64,
        stats: SharedStreamStats,
    ) -> Result<Self, SensorError> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(SensorError::NoAdapter)?;

        let peripheral = scan_for_device(&adapter, name_prefix, scan_timeout_secs).await?;
        let name = peripheral
            .properties()
            .await?
            .and_then(|p| p.local_name)
            .unwrap_or_else(|| name_prefix.to_string());

        peripheral.connect().await?;
        debug!(device = %name, "connected");
        peripheral.discover_services().await?;

        let characteristics = peripheral.characteristics();
        let find = |uuid: Uuid| {
            characteristics
                .iter()
                .find(|c| c.uuid == uuid)
                .cloned()
                .ok_or(SensorError::MissingCharacteristic(uuid))
        };
        let pmd_control = find(uuids::PMD_CONTROL)?;
        let pmd_data = find(uuids::PMD_DATA)?;
        let hr_measurement = find(uuids::HEART_RATE_MEASUREMENT)?;
        let battery_level = find(uuids::BATTERY_LEVEL)?;

        let (sender, receiver) = bounded(10_000);
        spawn_notification_pump(&peripheral, sender, stats).await?;

        Ok(Self {
            peripheral,
            name,
            receiver,
            pmd_control,
            pmd_data,
            hr_measurement,
            battery_level,
            active: Vec::new(),
            selection: StreamSelection::default(),
        })
    }

    /// Advertised device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the receiver for sensor events.
    pub fn receiver(&self) -> &Receiver<SensorEvent> {
        &self.receiver
    }

    /// Read the battery level as a percentage.
    pub async fn battery_level(&self) -> Result<u8, SensorError> {
        let data = self.peripheral.read(&self.battery_level).await?;
        Ok(data.first().copied().unwrap_or(0))
    }

    /// Subscribe to the selected streams and start PMD measurements.
    pub async fn start_streaming(&mut self, selection: StreamSelection) -> Result<(), SensorError> {
        self.selection = selection;

        if selection.any_pmd() {
            self.peripheral.subscribe(&self.pmd_control).await?;
            self.peripheral.subscribe(&self.pmd_data).await?;
        }

        if selection.acc {
            self.write_control(pmd::start_measurement(MeasurementType::Acc))
                .await?;
            self.active.push(MeasurementType::Acc);
        }
        if selection.ppg {
            self.write_control(pmd::start_measurement(MeasurementType::Ppg))
                .await?;
            self.active.push(MeasurementType::Ppg);
        }

        if selection.hr {
            self.peripheral.subscribe(&self.hr_measurement).await?;
        }

        Ok(())
    }

    /// Stop active PMD measurements and unsubscribe.
    ///
    /// Errors are collected rather than short-circuited so a failed stop
    /// on one stream does not leave the others running.
    pub async fn stop_streaming(&mut self) -> Result<(), SensorError> {
        let mut first_error = None;

        for measurement in std::mem::take(&mut self.active) {
            if let Err(e) = self.write_control(pmd::stop_measurement(measurement)).await {
                warn!(?measurement, error = %e, "failed to stop measurement");
                first_error.get_or_insert(e);
            }
        }

        if self.selection.any_pmd() {
            let _ = self.peripheral.unsubscribe(&self.pmd_data).await;
            let _ = self.peripheral.unsubscribe(&self.pmd_control).await;
        }
        if self.selection.hr {
            let _ = self.peripheral.unsubscribe(&self.hr_measurement).await;
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Disconnect from the device. Safe to call after a partial failure.
    pub async fn disconnect(&self) -> Result<(), SensorError> {
        self.peripheral.disconnect().await?;
        Ok(())
    }

    async fn write_control(&self, command: Vec<u8>) -> Result<(), SensorError> {
        debug!(command = ?command, "PMD control write");
        self.peripheral
            .write(&self.pmd_control, &command, WriteType::WithResponse)
            .await?;
        Ok(())
    }
}

async fn scan_for_device(
    adapter: &Adapter,
    name_prefix: &str,
    timeout_secs: u64,
) -> Result<Peripheral, SensorError> {
    adapter.start_scan(ScanFilter::default()).await?;

    let mut found = None;
    'scan: for _ in 0..timeout_secs.max(1) {
        tokio::time::sleep(Duration::from_secs(1)).await;
        for peripheral in adapter.peripherals().await? {
            let Ok(properties) = peripheral.properties().await else {
                continue;
            };
            if let Some(name) = properties.and_then(|p| p.local_name) {
                if name.starts_with(name_prefix) {
                    debug!(device = %name, "discovered");
                    found = Some(peripheral);
                    break 'scan;
                }
            }
        }
    }

    let _ = adapter.stop_scan().await;
    found.ok_or_else(|| SensorError::DeviceNotFound(name_prefix.to_string()))
}

/// Spawn the background task that parses notifications into events.
///
/// The task ends when the peripheral's notification stream does; dropping
/// its sender disconnects the receiver, which the consuming loop observes.
async fn spawn_notification_pump(
    peripheral: &Peripheral,
    sender: Sender<SensorEvent>,
    stats: SharedStreamStats,
) -> Result<(), SensorError> {
    let mut notifications = peripheral.notifications().await?;

    tokio::spawn(async move {
        while let Some(notification) = notifications.next().await {
            stats.record_bytes(notification.value.len() as u64);

            let event = if notification.uuid == uuids::PMD_DATA {
                match pmd::parse_data_frame(&notification.value) {
                    Ok(pmd::DataFrame::Ppg(frame)) => Some(SensorEvent::Ppg(frame)),
                    Ok(pmd::DataFrame::Acc(frame)) => Some(SensorEvent::Acc(frame)),
                    Err(e) => {
                        stats.record_parse_error();
                        warn!(error = %e, "bad PMD data frame");
                        None
                    }
                }
            } else if notification.uuid == uuids::PMD_CONTROL {
                match ControlResponse::parse(&notification.value) {
                    Ok(response) => Some(SensorEvent::Control(response)),
                    Err(e) => {
                        stats.record_parse_error();
                        warn!(error = %e, "bad PMD control response");
                        None
                    }
                }
            } else if notification.uuid == uuids::HEART_RATE_MEASUREMENT {
                match HrSample::parse(&notification.value, now_polar_us()) {
                    Some(sample) => Some(SensorEvent::Hr(sample)),
                    None => {
                        stats.record_parse_error();
                        warn!("empty heart rate notification");
                        None
                    }
                }
            } else {
                debug!(uuid = %notification.uuid, "unexpected notification");
                None
            };

            if let Some(event) = event {
                if sender.try_send(event).is_err() {
                    warn!("event channel full, dropping frame");
                }
            }
        }
        debug!("notification stream ended");
    });

    Ok(())
}
