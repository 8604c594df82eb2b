//! Measurement, frame type, and sample rate definitions for the PMD service.

use serde::{Deserialize, Serialize};

/// Measurement types understood by the PMD control point.
///
/// Only PPG and ACC are streamed by this toolkit; the remaining values are
/// part of the wire protocol and appear in control responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MeasurementType {
    Ppg = 1,
    Acc = 2,
    Gyro = 5,
    Mag = 6,
    SdkMode = 9,
}

impl MeasurementType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Ppg),
            2 => Some(Self::Acc),
            5 => Some(Self::Gyro),
            6 => Some(Self::Mag),
            9 => Some(Self::SdkMode),
            _ => None,
        }
    }
}

/// PPG frame encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PpgFrameType {
    /// Uncompressed 24-bit samples.
    Raw24 = 0,
    /// Reference sample followed by delta blocks.
    Delta = 128,
}

/// ACC frame encodings.
///
/// The Verity Sense stamps delta ACC frames with 129 rather than the
/// documented 128; both are treated as delta frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AccFrameType {
    Raw8 = 0,
    Raw16 = 1,
    Raw24 = 2,
    Delta = 128,
}

/// Check whether a raw frame type byte marks a delta-compressed frame.
pub fn is_delta_frame(frame_type: u8) -> bool {
    frame_type & 0x80 != 0
}

/// Sample rates supported by the device, with their wire encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum SampleRate {
    Hz26 = 0x001a,
    Hz52 = 0x0034,
    Hz55 = 0x0037,
    Hz135 = 0x0087,
}

impl SampleRate {
    /// Rate in Hz.
    pub fn hz(&self) -> f64 {
        match self {
            SampleRate::Hz26 => 26.0,
            SampleRate::Hz52 => 52.0,
            SampleRate::Hz55 => 55.0,
            SampleRate::Hz135 => 135.0,
        }
    }

    /// Interval between consecutive samples, in microseconds.
    pub fn period_us(&self) -> f64 {
        1_000_000.0 / self.hz()
    }

    /// Wire encoding as a little-endian u16, as used in settings TLVs.
    pub fn setting_bytes(&self) -> [u8; 2] {
        (*self as u16).to_le_bytes()
    }
}

/// PPG stream rate when SDK mode is off (fixed by firmware).
pub const PPG_RATE: SampleRate = SampleRate::Hz55;

/// ACC stream rate when SDK mode is off (fixed by firmware).
pub const ACC_RATE: SampleRate = SampleRate::Hz52;

/// Channels in a PPG sample: three PPG wavelengths plus ambient light.
pub const PPG_CHANNELS: usize = 4;

/// Channels in an ACC sample: x, y, z.
pub const ACC_CHANNELS: usize = 3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurement_type_round_trip() {
        assert_eq!(MeasurementType::from_u8(1), Some(MeasurementType::Ppg));
        assert_eq!(MeasurementType::from_u8(2), Some(MeasurementType::Acc));
        assert_eq!(MeasurementType::from_u8(9), Some(MeasurementType::SdkMode));
        assert_eq!(MeasurementType::from_u8(0x42), None);
    }

    #[test]
    fn test_sample_periods() {
        assert!((SampleRate::Hz55.period_us() - 18181.8).abs() < 0.1);
        assert!((SampleRate::Hz52.period_us() - 19230.7).abs() < 0.1);
    }

    #[test]
    fn test_delta_marker() {
        assert!(is_delta_frame(128));
        assert!(is_delta_frame(129));
        assert!(!is_delta_frame(0));
        assert!(!is_delta_frame(2));
    }

    #[test]
    fn test_rate_setting_bytes() {
        assert_eq!(SampleRate::Hz55.setting_bytes(), [0x37, 0x00]);
        assert_eq!(SampleRate::Hz52.setting_bytes(), [0x34, 0x00]);
    }
}
