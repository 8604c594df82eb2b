//! Pulsekit - Polar Verity Sense streaming and analysis toolkit.
//!
//! This library streams heart rate, PPG, and accelerometer data from a
//! Polar Verity Sense over BLE, records it to per-session CSV logs, and
//! post-processes recorded sessions into HRV metrics, aggregated series,
//! and PNG charts.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Pulsekit                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌───────────┐   ┌───────────┐              │
//! │  │    BLE    │──▶│    PMD    │──▶│ Recording │              │
//! │  │ (btleplug)│   │ (decode)  │   │  (CSV)    │              │
//! │  └───────────┘   └───────────┘   └───────────┘              │
//! │        │                               │                    │
//! │        ▼                               ▼                    │
//! │  ┌───────────┐   ┌───────────┐   ┌───────────┐              │
//! │  │   Stats   │   │ Analysis  │──▶│ Aggregate │              │
//! │  │ (counters)│   │(HRV/peaks)│   │  + Plot   │              │
//! │  └───────────┘   └───────────┘   └───────────┘              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use pulsekit::analysis::analyze_ppg_window;
//!
//! // Analyze a window of raw PPG samples recorded at 55 Hz
//! let ppg: Vec<f64> = vec![0.0; 550];
//! if let Some(summary) = analyze_ppg_window(&ppg, 55.0) {
//!     println!("RMSSD: {:.1} ms", summary.rmssd_ms);
//! }
//! ```

pub mod aggregate;
pub mod analysis;
pub mod ble;
pub mod config;
pub mod model;
pub mod plot;
pub mod pmd;
pub mod recording;
pub mod stats;

// Re-export key types at crate root for convenience
pub use ble::{PolarSensor, SensorError};
pub use config::Config;
pub use model::{HrSample, SensorEvent, StreamSelection};
pub use pmd::{parse_data_frame, DataFrame, MeasurementType, PmdError};
pub use recording::{SessionPaths, SessionWriter};
pub use stats::{SharedStreamStats, StreamStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
