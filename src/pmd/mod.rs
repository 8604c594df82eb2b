//! Polar Measurement Data (PMD) protocol.
//!
//! The Verity Sense exposes raw sensor streams through a vendor service
//! with two characteristics: a control point for configuring and starting
//! measurements, and a data characteristic that delivers delta-compressed
//! sample frames. This module contains:
//! - Measurement/frame type and sample rate definitions
//! - A byte/bit reader for the packed frame encoding
//! - Data frame parsing into typed, timestamped samples
//! - Control point command builders and response parsing

pub mod control;
pub mod frame;
pub mod reader;
pub mod types;

// Re-export commonly used types
pub use control::{start_measurement, stop_measurement, ControlResponse, PmdControlError};
pub use frame::{parse_data_frame, AccFrame, AccSample, DataFrame, PpgFrame, PpgSample};
pub use reader::FrameReader;
pub use types::{AccFrameType, MeasurementType, PpgFrameType, SampleRate};

use thiserror::Error;

/// Errors produced while decoding PMD frames.
#[derive(Debug, Error)]
pub enum PmdError {
    #[error("frame truncated: needed {needed} more byte(s)")]
    Truncated { needed: usize },
    #[error("unknown measurement type {0:#04x}")]
    UnknownMeasurementType(u8),
    #[error("unsupported frame type {frame_type:#04x} for {measurement:?}")]
    UnsupportedFrameType {
        measurement: MeasurementType,
        frame_type: u8,
    },
    #[error("packed data ended before {expected} delta value(s) were read (got {got})")]
    TruncatedDeltaBlock { expected: usize, got: usize },
    #[error("delta size of {0} bits is out of range")]
    InvalidDeltaSize(u8),
}
