//! PMD control point commands and responses.
//!
//! Commands are written to the control characteristic with response. A
//! start command carries settings TLVs of the form
//! `(setting_type, array_length, value…)`; the device answers on the same
//! characteristic with `0xF0, op_code, measurement_type, error_code, more`.

use crate::pmd::types::{MeasurementType, ACC_RATE, PPG_RATE};
use thiserror::Error;

/// Control point op codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    GetSettings = 0x01,
    StartMeasurement = 0x02,
    StopMeasurement = 0x03,
}

impl OpCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::GetSettings),
            0x02 => Some(Self::StartMeasurement),
            0x03 => Some(Self::StopMeasurement),
            _ => None,
        }
    }
}

const SETTING_SAMPLE_RATE: u8 = 0x00;
const SETTING_RESOLUTION: u8 = 0x01;
const SETTING_RANGE: u8 = 0x02;
const SETTING_CHANNELS: u8 = 0x04;

/// Marker byte opening every control point response.
const RESPONSE_MARKER: u8 = 0xF0;

/// Query the available settings for a measurement type.
pub fn get_settings(measurement: MeasurementType) -> Vec<u8> {
    vec![OpCode::GetSettings as u8, measurement as u8]
}

/// Build the start command for a measurement type with the fixed
/// (non-SDK-mode) settings used by this toolkit.
pub fn start_measurement(measurement: MeasurementType) -> Vec<u8> {
    let mut cmd = vec![OpCode::StartMeasurement as u8, measurement as u8];
    match measurement {
        MeasurementType::Ppg => {
            // 55 Hz, 22-bit resolution, 4 channels
            push_u16_setting(&mut cmd, SETTING_SAMPLE_RATE, PPG_RATE.setting_bytes());
            push_u16_setting(&mut cmd, SETTING_RESOLUTION, [0x16, 0x00]);
            cmd.extend_from_slice(&[SETTING_CHANNELS, 0x01, 0x04]);
        }
        MeasurementType::Acc => {
            // 52 Hz, 16-bit resolution, 8 G range, 3 channels
            push_u16_setting(&mut cmd, SETTING_SAMPLE_RATE, ACC_RATE.setting_bytes());
            push_u16_setting(&mut cmd, SETTING_RESOLUTION, [0x10, 0x00]);
            push_u16_setting(&mut cmd, SETTING_RANGE, [0x08, 0x00]);
            cmd.extend_from_slice(&[SETTING_CHANNELS, 0x01, 0x03]);
        }
        // SDK mode toggles and the unstreamed types take no settings.
        _ => {}
    }
    cmd
}

/// Build the stop command for a measurement type.
pub fn stop_measurement(measurement: MeasurementType) -> Vec<u8> {
    vec![OpCode::StopMeasurement as u8, measurement as u8]
}

fn push_u16_setting(cmd: &mut Vec<u8>, setting_type: u8, value: [u8; 2]) {
    cmd.push(setting_type);
    cmd.push(0x01); // array length
    cmd.extend_from_slice(&value);
}

/// Status codes returned in control responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlStatus {
    Success,
    InvalidOpCode,
    InvalidMeasurementType,
    NotSupported,
    InvalidLength,
    InvalidParameter,
    AlreadyInState,
    InvalidResolution,
    InvalidSampleRate,
    InvalidRange,
    InvalidMtu,
    InvalidChannels,
    InvalidState,
    DeviceInCharger,
    Unknown(u8),
}

impl ControlStatus {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Success,
            1 => Self::InvalidOpCode,
            2 => Self::InvalidMeasurementType,
            3 => Self::NotSupported,
            4 => Self::InvalidLength,
            5 => Self::InvalidParameter,
            6 => Self::AlreadyInState,
            7 => Self::InvalidResolution,
            8 => Self::InvalidSampleRate,
            9 => Self::InvalidRange,
            10 => Self::InvalidMtu,
            11 => Self::InvalidChannels,
            12 => Self::InvalidState,
            13 => Self::DeviceInCharger,
            other => Self::Unknown(other),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// A parsed control point response.
#[derive(Debug, Clone)]
pub struct ControlResponse {
    pub op_code: OpCode,
    pub measurement: Option<MeasurementType>,
    pub status: ControlStatus,
    /// Whether more response packets follow (settings listings span
    /// multiple notifications).
    pub more: bool,
    /// Trailing parameter bytes, if any.
    pub parameters: Vec<u8>,
}

/// Errors for control response parsing.
#[derive(Debug, Error)]
pub enum PmdControlError {
    #[error("control response too short ({0} bytes)")]
    TooShort(usize),
    #[error("not a control response (marker {0:#04x})")]
    BadMarker(u8),
    #[error("unknown op code {0:#04x} in control response")]
    UnknownOpCode(u8),
}

impl ControlResponse {
    /// Parse a notification received on the control characteristic.
    pub fn parse(data: &[u8]) -> Result<Self, PmdControlError> {
        if data.len() < 4 {
            return Err(PmdControlError::TooShort(data.len()));
        }
        if data[0] != RESPONSE_MARKER {
            return Err(PmdControlError::BadMarker(data[0]));
        }
        let op_code = OpCode::from_u8(data[1]).ok_or(PmdControlError::UnknownOpCode(data[1]))?;

        Ok(Self {
            op_code,
            measurement: MeasurementType::from_u8(data[2]),
            status: ControlStatus::from_u8(data[3]),
            more: data.get(4).copied().unwrap_or(0) != 0,
            parameters: data.get(5..).map(|p| p.to_vec()).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_ppg_command_bytes() {
        let cmd = start_measurement(MeasurementType::Ppg);
        assert_eq!(
            cmd,
            vec![
                0x02, 0x01, // start, PPG
                0x00, 0x01, 0x37, 0x00, // 55 Hz
                0x01, 0x01, 0x16, 0x00, // 22-bit
                0x04, 0x01, 0x04, // four channels
            ]
        );
    }

    #[test]
    fn test_start_acc_command_bytes() {
        let cmd = start_measurement(MeasurementType::Acc);
        assert_eq!(
            cmd,
            vec![
                0x02, 0x02, // start, ACC
                0x00, 0x01, 0x34, 0x00, // 52 Hz
                0x01, 0x01, 0x10, 0x00, // 16-bit
                0x02, 0x01, 0x08, 0x00, // 8 G
                0x04, 0x01, 0x03, // three channels
            ]
        );
    }

    #[test]
    fn test_get_settings_command() {
        assert_eq!(get_settings(MeasurementType::Ppg), vec![0x01, 0x01]);
        assert_eq!(get_settings(MeasurementType::Acc), vec![0x01, 0x02]);
    }

    #[test]
    fn test_stop_command() {
        assert_eq!(stop_measurement(MeasurementType::Ppg), vec![0x03, 0x01]);
        assert_eq!(stop_measurement(MeasurementType::Acc), vec![0x03, 0x02]);
    }

    #[test]
    fn test_sdk_mode_commands_have_no_settings() {
        assert_eq!(start_measurement(MeasurementType::SdkMode), vec![0x02, 0x09]);
        assert_eq!(stop_measurement(MeasurementType::SdkMode), vec![0x03, 0x09]);
    }

    #[test]
    fn test_control_response_parse() {
        let resp = ControlResponse::parse(&[0xF0, 0x02, 0x01, 0x00, 0x00]).unwrap();
        assert_eq!(resp.op_code, OpCode::StartMeasurement);
        assert_eq!(resp.measurement, Some(MeasurementType::Ppg));
        assert!(resp.status.is_success());
        assert!(!resp.more);
    }

    #[test]
    fn test_control_response_error_status() {
        let resp = ControlResponse::parse(&[0xF0, 0x02, 0x02, 0x08, 0x00]).unwrap();
        assert_eq!(resp.status, ControlStatus::InvalidSampleRate);
        assert!(!resp.status.is_success());
    }

    #[test]
    fn test_control_response_bad_marker() {
        assert!(matches!(
            ControlResponse::parse(&[0x00, 0x02, 0x01, 0x00]),
            Err(PmdControlError::BadMarker(0x00))
        ));
    }
}
