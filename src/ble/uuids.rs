//! Characteristic UUIDs used by the toolkit.
//!
//! The PMD service is Polar-proprietary; heart rate and battery level are
//! standard 16-bit assigned numbers expanded onto the Bluetooth base UUID.

use uuid::{uuid, Uuid};

/// PMD control point: measurement settings, start/stop commands.
pub const PMD_CONTROL: Uuid = uuid!("fb005c81-02e7-f387-1cad-8acd2d8df0c8");

/// PMD data: delta-compressed sample frames.
pub const PMD_DATA: Uuid = uuid!("fb005c82-02e7-f387-1cad-8acd2d8df0c8");

/// Standard Heart Rate Measurement characteristic.
pub const HEART_RATE_MEASUREMENT: Uuid = uuid!("00002a37-0000-1000-8000-00805f9b34fb");

/// Standard Battery Level characteristic.
pub const BATTERY_LEVEL: Uuid = uuid!("00002a19-0000-1000-8000-00805f9b34fb");

/// Advertised name prefix of the Verity Sense.
pub const DEVICE_NAME_PREFIX: &str = "Polar Sense";
