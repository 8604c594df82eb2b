//! Stream statistics.
//!
//! Counters updated while streaming, printed as a summary at shutdown and
//! optionally persisted as JSON so counts accumulate across sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for the current streaming session.
#[derive(Debug)]
pub struct StreamStats {
    hr_samples: AtomicU64,
    ppg_frames: AtomicU64,
    ppg_samples: AtomicU64,
    acc_frames: AtomicU64,
    acc_samples: AtomicU64,
    control_responses: AtomicU64,
    parse_errors: AtomicU64,
    bytes_received: AtomicU64,
    session_start: DateTime<Utc>,
    persist_path: Option<PathBuf>,
}

impl StreamStats {
    pub fn new() -> Self {
        Self {
            hr_samples: AtomicU64::new(0),
            ppg_frames: AtomicU64::new(0),
            ppg_samples: AtomicU64::new(0),
            acc_frames: AtomicU64::new(0),
            acc_samples: AtomicU64::new(0),
            control_responses: AtomicU64::new(0),
            parse_errors: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create stats with persistence, continuing counts from a previous
    /// session when the file exists.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut stats = Self::new();
        stats.persist_path = Some(path);

        if let Err(e) = stats.load() {
            eprintln!("Note: Could not load previous stream stats: {e}");
        }

        stats
    }

    pub fn record_hr_sample(&self) {
        self.hr_samples.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ppg_frame(&self, samples: u64) {
        self.ppg_frames.fetch_add(1, Ordering::Relaxed);
        self.ppg_samples.fetch_add(samples, Ordering::Relaxed);
    }

    pub fn record_acc_frame(&self, samples: u64) {
        self.acc_frames.fetch_add(1, Ordering::Relaxed);
        self.acc_samples.fetch_add(samples, Ordering::Relaxed);
    }

    pub fn record_control_response(&self) {
        self.control_responses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_parse_error(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bytes(&self, count: u64) {
        self.bytes_received.fetch_add(count, Ordering::Relaxed);
    }

    /// Get the current counter values.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hr_samples: self.hr_samples.load(Ordering::Relaxed),
            ppg_frames: self.ppg_frames.load(Ordering::Relaxed),
            ppg_samples: self.ppg_samples.load(Ordering::Relaxed),
            acc_frames: self.acc_frames.load(Ordering::Relaxed),
            acc_samples: self.acc_samples.load(Ordering::Relaxed),
            control_responses: self.control_responses.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let s = self.snapshot();
        let mut out = String::from("Stream statistics:\n");
        out.push_str(&format!("  HR samples: {}\n", s.hr_samples));
        out.push_str(&format!(
            "  PPG frames: {} ({} samples)\n",
            s.ppg_frames, s.ppg_samples
        ));
        out.push_str(&format!(
            "  ACC frames: {} ({} samples)\n",
            s.acc_frames, s.acc_samples
        ));
        out.push_str(&format!("  Control responses: {}\n", s.control_responses));
        out.push_str(&format!("  Parse errors: {}\n", s.parse_errors));
        out.push_str(&format!("  Bytes received: {}\n", s.bytes_received));
        out.push_str(&format!("  Session duration: {}s", s.session_duration_secs));
        out
    }

    /// Persist the current counters as JSON.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let Some(ref path) = self.persist_path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(&self.snapshot())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Load previously persisted counters into the live counters.
    fn load(&self) -> Result<(), std::io::Error> {
        let Some(ref path) = self.persist_path else {
            return Ok(());
        };
        if !path.exists() {
            return Ok(());
        }

        let content = std::fs::read_to_string(path)?;
        let snapshot: StatsSnapshot = serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        self.hr_samples.store(snapshot.hr_samples, Ordering::Relaxed);
        self.ppg_frames.store(snapshot.ppg_frames, Ordering::Relaxed);
        self.ppg_samples.store(snapshot.ppg_samples, Ordering::Relaxed);
        self.acc_frames.store(snapshot.acc_frames, Ordering::Relaxed);
        self.acc_samples.store(snapshot.acc_samples, Ordering::Relaxed);
        self.control_responses
            .store(snapshot.control_responses, Ordering::Relaxed);
        self.parse_errors
            .store(snapshot.parse_errors, Ordering::Relaxed);
        self.bytes_received
            .store(snapshot.bytes_received, Ordering::Relaxed);

        Ok(())
    }
}

impl Default for StreamStats {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub hr_samples: u64,
    pub ppg_frames: u64,
    pub ppg_samples: u64,
    pub acc_frames: u64,
    pub acc_samples: u64,
    pub control_responses: u64,
    pub parse_errors: u64,
    pub bytes_received: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Stats shared between the notification pump and the recording loop.
pub type SharedStreamStats = Arc<StreamStats>;

/// Create shared stats without persistence.
pub fn create_shared_stats() -> SharedStreamStats {
    Arc::new(StreamStats::new())
}

/// Create shared stats persisted at the given path.
pub fn create_shared_stats_with_persistence(path: PathBuf) -> SharedStreamStats {
    Arc::new(StreamStats::with_persistence(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = StreamStats::new();
        stats.record_hr_sample();
        stats.record_hr_sample();
        stats.record_ppg_frame(36);
        stats.record_acc_frame(20);
        stats.record_parse_error();
        stats.record_bytes(200);

        let s = stats.snapshot();
        assert_eq!(s.hr_samples, 2);
        assert_eq!(s.ppg_frames, 1);
        assert_eq!(s.ppg_samples, 36);
        assert_eq!(s.acc_frames, 1);
        assert_eq!(s.acc_samples, 20);
        assert_eq!(s.parse_errors, 1);
        assert_eq!(s.bytes_received, 200);
    }

    #[test]
    fn test_summary_contains_counts() {
        let stats = StreamStats::new();
        stats.record_ppg_frame(10);
        let summary = stats.summary();
        assert!(summary.contains("PPG frames: 1 (10 samples)"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = std::env::temp_dir().join("pulsekit-stats-test");
        let _ = std::fs::create_dir_all(&dir);
        let path = dir.join("stats.json");
        let _ = std::fs::remove_file(&path);

        let stats = StreamStats::with_persistence(path.clone());
        stats.record_hr_sample();
        stats.save().unwrap();

        let reloaded = StreamStats::with_persistence(path.clone());
        assert_eq!(reloaded.snapshot().hr_samples, 1);

        let _ = std::fs::remove_file(&path);
    }
}
