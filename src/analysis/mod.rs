//! Signal processing for recorded sessions.
//!
//! This module contains:
//! - Band-pass filtering of the raw PPG signal
//! - Systolic peak detection on the filtered signal
//! - HRV metrics (RMSSD, SDNN, normalized HF power) from inter-beat intervals
//! - Resampling of recorded series onto a fixed output rate

pub mod filter;
pub mod hrv;
pub mod peaks;
pub mod resample;

// Re-export commonly used items
pub use filter::band_pass_zero_phase;
pub use hrv::{analyze_ppg_window, HrvSummary};
pub use peaks::detect_peaks;
pub use resample::{resample_hrv, resample_step_hold, resample_window_mean};

/// PPG band-pass corner frequencies (Hz) for pulse wave extraction.
pub const PPG_BAND_LOW_HZ: f64 = 0.5;
pub const PPG_BAND_HIGH_HZ: f64 = 5.0;
