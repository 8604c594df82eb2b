//! Sensor event types shared between the BLE layer and the recorder.
//!
//! All timestamps are microseconds since the Polar epoch (2000-01-01
//! 00:00:00 UTC), the domain the device itself stamps frames in. Host-side
//! events (heart rate notifications carry no device timestamp) are mapped
//! onto the same epoch from the wall clock.

use crate::pmd::{AccFrame, ControlResponse, PpgFrame};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// The Polar epoch: 2000-01-01 00:00:00 UTC.
pub fn polar_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap()
}

/// Current wall-clock time as microseconds since the Polar epoch.
pub fn now_polar_us() -> i64 {
    (Utc::now() - polar_epoch())
        .num_microseconds()
        .unwrap_or(i64::MAX)
}

/// A heart rate reading from the standard Heart Rate Measurement
/// characteristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HrSample {
    /// Host receive time, microseconds since the Polar epoch.
    pub timestamp_us: i64,
    /// Heart rate in beats per minute.
    pub bpm: u16,
    /// RR intervals in milliseconds, when the device includes them.
    pub rr_intervals_ms: Vec<f64>,
}

impl HrSample {
    /// Parse a Heart Rate Measurement notification.
    ///
    /// Layout per the GATT specification: a flags byte (bit 0: 16-bit BPM,
    /// bit 3: energy expended field present, bit 4: RR intervals present),
    /// the BPM value, optional energy expended u16, then RR intervals as
    /// u16 values in units of 1/1024 s.
    pub fn parse(data: &[u8], timestamp_us: i64) -> Option<Self> {
        let flags = *data.first()?;
        let mut offset = 1;

        let bpm = if flags & 0x01 != 0 {
            let value = u16::from_le_bytes([*data.get(offset)?, *data.get(offset + 1)?]);
            offset += 2;
            value
        } else {
            let value = *data.get(offset)? as u16;
            offset += 1;
            value
        };

        if flags & 0x08 != 0 {
            offset += 2; // energy expended, unused
        }

        let mut rr_intervals_ms = Vec::new();
        if flags & 0x10 != 0 {
            while offset + 1 < data.len() {
                let raw = u16::from_le_bytes([data[offset], data[offset + 1]]);
                rr_intervals_ms.push(raw as f64 * 1000.0 / 1024.0);
                offset += 2;
            }
        }

        Some(Self {
            timestamp_us,
            bpm,
            rr_intervals_ms,
        })
    }
}

/// Unified event type produced by the notification pump.
#[derive(Debug, Clone)]
pub enum SensorEvent {
    Hr(HrSample),
    Ppg(PpgFrame),
    Acc(AccFrame),
    Control(ControlResponse),
}

/// Which measurement streams to record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSelection {
    pub hr: bool,
    pub ppg: bool,
    pub acc: bool,
}

impl Default for StreamSelection {
    fn default() -> Self {
        Self {
            hr: true,
            ppg: true,
            acc: true,
        }
    }
}

impl StreamSelection {
    /// Parse a selection from a comma-separated string.
    pub fn from_csv(s: &str) -> Self {
        let sources: Vec<String> = s.split(',').map(|s| s.trim().to_lowercase()).collect();
        Self {
            hr: sources.iter().any(|s| s == "hr" || s == "all"),
            ppg: sources.iter().any(|s| s == "ppg" || s == "all"),
            acc: sources.iter().any(|s| s == "acc" || s == "all"),
        }
    }

    /// Check if at least one stream is enabled.
    pub fn any_enabled(&self) -> bool {
        self.hr || self.ppg || self.acc
    }

    /// Whether any PMD stream (PPG or ACC) is enabled.
    pub fn any_pmd(&self) -> bool {
        self.ppg || self.acc
    }
}
