//! BLE transport for the Polar Verity Sense.
//!
//! A [`PolarSensor`] wraps a connected `btleplug` peripheral. Incoming
//! notifications are parsed on a background task and forwarded as typed
//! [`SensorEvent`](crate::model::SensorEvent)s over a crossbeam channel,
//! so the recording loop can stay synchronous.

pub mod sensor;
pub mod uuids;

pub use sensor::{PolarSensor, SensorError};
