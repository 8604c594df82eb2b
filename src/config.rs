//! Configuration for the toolkit.
//!
//! Stored as JSON under the platform config directory; every field has a
//! default so a missing file is not an error.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding raw session logs and aggregated output
    pub data_dir: PathBuf,

    /// Advertised name prefix to match while scanning
    pub device_name_prefix: String,

    /// How long to scan for the device before giving up (seconds)
    pub scan_timeout_secs: u64,

    /// Seconds trimmed from both ends of a recording during aggregation
    pub trim_offset_secs: u64,

    /// Output rate of aggregated series (Hz)
    pub aggregate_rate_hz: f64,

    /// Half-width of the sliding HRV window (seconds of PPG on each side)
    pub hrv_window_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pulsekit")
            .join("data");

        Self {
            data_dir,
            device_name_prefix: crate::ble::uuids::DEVICE_NAME_PREFIX.to_string(),
            scan_timeout_secs: 10,
            trim_offset_secs: 6,
            aggregate_rate_hz: 1.0,
            hrv_window_secs: 5,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pulsekit")
            .join("config.json")
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    /// Path for persisted stream statistics.
    pub fn stats_path(&self) -> PathBuf {
        self.data_dir.join("stream_stats.json")
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.device_name_prefix, "Polar Sense");
        assert_eq!(config.scan_timeout_secs, 10);
        assert_eq!(config.trim_offset_secs, 6);
        assert!((config.aggregate_rate_hz - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_config_round_trip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.device_name_prefix, config.device_name_prefix);
        assert_eq!(parsed.data_dir, config.data_dir);
    }
}
