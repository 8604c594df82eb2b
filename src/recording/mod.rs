//! Raw session logs.
//!
//! A recording session is identified by an integer record id and stored as
//! up to three CSV files under the data directory: `<id>-hr.csv`,
//! `<id>-ppg.csv`, `<id>-acc.csv`. Writers flush after every frame so a
//! crash loses at most the in-flight frame.

pub mod reader;
pub mod writer;

pub use reader::{read_acc_magnitude, read_hr, read_ppg, TimeSeries};
pub use writer::SessionWriter;

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from session log IO.
#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// File paths for one recording session.
#[derive(Debug, Clone)]
pub struct SessionPaths {
    pub hr: PathBuf,
    pub ppg: PathBuf,
    pub acc: PathBuf,
}

impl SessionPaths {
    pub fn new(data_dir: &Path, record_id: u32) -> Self {
        Self {
            hr: data_dir.join(format!("{record_id}-hr.csv")),
            ppg: data_dir.join(format!("{record_id}-ppg.csv")),
            acc: data_dir.join(format!("{record_id}-acc.csv")),
        }
    }

    /// Whether any of the session files already exists.
    pub fn any_exists(&self) -> bool {
        self.hr.exists() || self.ppg.exists() || self.acc.exists()
    }
}

/// Summary of one recorded session.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub record_id: u32,
    pub hr_rows: usize,
    pub ppg_rows: usize,
    pub acc_rows: usize,
}

/// Enumerate recorded sessions in the data directory, ordered by id.
///
/// A session is anything with an `<id>-hr.csv` file; PPG/ACC logs are
/// optional (HR-only recordings are valid).
pub fn list_sessions(data_dir: &Path) -> Result<Vec<SessionInfo>, RecordingError> {
    let mut sessions = Vec::new();
    if !data_dir.exists() {
        return Ok(sessions);
    }

    for entry in std::fs::read_dir(data_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(id_str) = name.strip_suffix("-hr.csv") else {
            continue;
        };
        let Ok(record_id) = id_str.parse::<u32>() else {
            continue;
        };

        let paths = SessionPaths::new(data_dir, record_id);
        sessions.push(SessionInfo {
            record_id,
            hr_rows: count_rows(&paths.hr),
            ppg_rows: count_rows(&paths.ppg),
            acc_rows: count_rows(&paths.acc),
        });
    }

    sessions.sort_by_key(|s| s.record_id);
    Ok(sessions)
}

/// Data rows in a CSV file (excluding the header), 0 if unreadable.
fn count_rows(path: &Path) -> usize {
    std::fs::read_to_string(path)
        .map(|content| content.lines().count().saturating_sub(1))
        .unwrap_or(0)
}
