//! Session aggregation.
//!
//! Turns raw session logs into three cross-session CSV files
//! (`aggregated_hr.csv`, `aggregated_hrv.csv`, `aggregated_acc.csv`),
//! one row per record id, resampled onto a common rate. The HR log is the
//! time reference for each session; a configurable offset is trimmed from
//! both ends to drop the settling period around start and stop.

use crate::analysis::resample::{resample_hrv, resample_step_hold, resample_window_mean};
use crate::pmd::types::PPG_RATE;
use crate::recording::{self, RecordingError, SessionPaths};
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors from aggregation.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("recording error: {0}")]
    Recording(#[from] RecordingError),
    #[error("no usable sessions among the requested ids")]
    NoUsableSessions,
}

/// Aggregation parameters.
#[derive(Debug, Clone, Copy)]
pub struct AggregateOptions {
    /// Output rate of the aggregated series (Hz)
    pub rate_hz: f64,
    /// Seconds trimmed from both ends of each recording
    pub offset_secs: u64,
    /// Half-width of the sliding HRV window (seconds)
    pub hrv_window_secs: u64,
}

/// Per-session outcome of an aggregation run.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub record_id: u32,
    /// Samples written per metric, or the reason the session was skipped.
    pub result: SessionResult,
}

#[derive(Debug, Clone)]
pub enum SessionResult {
    Aggregated {
        hr_samples: usize,
        hrv_samples: usize,
        acc_samples: usize,
    },
    Skipped(String),
}

/// Paths of the aggregated output files.
pub fn aggregated_paths(data_dir: &Path) -> (PathBuf, PathBuf, PathBuf) {
    (
        data_dir.join("aggregated_hr.csv"),
        data_dir.join("aggregated_hrv.csv"),
        data_dir.join("aggregated_acc.csv"),
    )
}

/// Aggregate the given sessions into the three output CSVs.
///
/// Sessions missing an HR log (the time reference) or too short for the
/// trim offset are reported as skipped; the run continues with the rest.
pub fn aggregate_sessions(
    data_dir: &Path,
    record_ids: &[u32],
    options: &AggregateOptions,
) -> Result<Vec<SessionOutcome>, AggregateError> {
    let (hr_path, hrv_path, acc_path) = aggregated_paths(data_dir);
    let mut hr_out = HeaderedWriter::create(&hr_path)?;
    let mut hrv_out = HeaderedWriter::create(&hrv_path)?;
    let mut acc_out = HeaderedWriter::create(&acc_path)?;

    let mut outcomes = Vec::new();
    let mut any = false;

    for &record_id in record_ids {
        match aggregate_one(
            data_dir, record_id, options, &mut hr_out, &mut hrv_out, &mut acc_out,
        ) {
            Ok(result) => {
                any = true;
                outcomes.push(SessionOutcome { record_id, result });
            }
            Err(reason) => outcomes.push(SessionOutcome {
                record_id,
                result: SessionResult::Skipped(reason),
            }),
        }
    }

    if !any {
        return Err(AggregateError::NoUsableSessions);
    }

    hr_out.flush()?;
    hrv_out.flush()?;
    acc_out.flush()?;
    Ok(outcomes)
}

fn aggregate_one(
    data_dir: &Path,
    record_id: u32,
    options: &AggregateOptions,
    hr_out: &mut HeaderedWriter,
    hrv_out: &mut HeaderedWriter,
    acc_out: &mut HeaderedWriter,
) -> Result<SessionResult, String> {
    let paths = SessionPaths::new(data_dir, record_id);

    if !paths.hr.exists() {
        return Err("no HR log".to_string());
    }
    let hr = recording::read_hr(&paths.hr).map_err(|e| e.to_string())?;

    // The HR log runs at 1 Hz, so the trim offset indexes straight into it.
    let offset = options.offset_secs as usize;
    if hr.len() < 2 * offset.max(1) {
        return Err(format!(
            "only {} HR samples, too short for a {}s trim",
            hr.len(),
            options.offset_secs
        ));
    }
    let start_us = hr.timestamps_us[offset.saturating_sub(1)];
    let end_us = hr.timestamps_us[hr.len() - offset.max(1)];
    debug!(record_id, start_us, end_us, "session window");

    let hr_row = resample_step_hold(&hr, start_us, end_us, options.rate_hz);
    hr_out
        .write_row(record_id, &hr_row)
        .map_err(|e| e.to_string())?;

    let mut hrv_samples = 0;
    if paths.ppg.exists() {
        let ppg = recording::read_ppg(&paths.ppg).map_err(|e| e.to_string())?;
        let hrv_row = resample_hrv(
            &ppg,
            start_us,
            end_us,
            options.rate_hz,
            options.hrv_window_secs,
            PPG_RATE.hz(),
        );
        hrv_samples = hrv_row.len();
        hrv_out
            .write_row(record_id, &hrv_row)
            .map_err(|e| e.to_string())?;
    }

    let mut acc_samples = 0;
    if paths.acc.exists() {
        let acc = recording::read_acc_magnitude(&paths.acc).map_err(|e| e.to_string())?;
        let acc_row = resample_window_mean(&acc, start_us, end_us, options.rate_hz);
        acc_samples = acc_row.len();
        acc_out
            .write_row(record_id, &acc_row)
            .map_err(|e| e.to_string())?;
    }

    Ok(SessionResult::Aggregated {
        hr_samples: hr_row.len(),
        hrv_samples,
        acc_samples,
    })
}

/// CSV writer that emits a `record_id,0,1,…` header sized to the first row.
struct HeaderedWriter {
    writer: csv::Writer<File>,
    header_written: bool,
}

impl HeaderedWriter {
    fn create(path: &Path) -> Result<Self, AggregateError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            writer: csv::Writer::from_path(path)?,
            header_written: false,
        })
    }

    fn write_row(&mut self, record_id: u32, values: &[f64]) -> Result<(), AggregateError> {
        if !self.header_written {
            let mut header = vec!["record_id".to_string()];
            header.extend((0..values.len()).map(|i| i.to_string()));
            self.writer.write_record(&header)?;
            self.header_written = true;
        }

        let mut row = vec![record_id.to_string()];
        row.extend(values.iter().map(|v| format!("{v:.3}")));
        self.writer.write_record(&row)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), AggregateError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Read one aggregated CSV back as `(record_id, values)` rows.
pub fn read_aggregated(path: &Path) -> Result<Vec<(u32, Vec<f64>)>, AggregateError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let Ok(record) = record else { continue };
        let mut fields = record.iter();
        let Some(id) = fields.next().and_then(|f| f.parse::<u32>().ok()) else {
            continue;
        };
        let values: Vec<f64> = fields.filter_map(|f| f.parse().ok()).collect();
        rows.push((id, values));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pulsekit-agg-{tag}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_hr_log(dir: &Path, record_id: u32, secs: usize) {
        let paths = SessionPaths::new(dir, record_id);
        let mut file = std::fs::File::create(&paths.hr).unwrap();
        writeln!(file, "timestamp_us,bpm,rr_ms").unwrap();
        for i in 0..secs {
            writeln!(file, "{},{},", i as i64 * 1_000_000, 60 + (i % 5)).unwrap();
        }
    }

    #[test]
    fn test_aggregate_hr_only_session() {
        let dir = temp_dir("hr-only");
        write_hr_log(&dir, 1, 30);

        let options = AggregateOptions {
            rate_hz: 1.0,
            offset_secs: 6,
            hrv_window_secs: 5,
        };
        let outcomes = aggregate_sessions(&dir, &[1], &options).unwrap();
        assert_eq!(outcomes.len(), 1);
        let SessionResult::Aggregated { hr_samples, hrv_samples, acc_samples } = &outcomes[0].result
        else {
            panic!("expected aggregation");
        };
        // Window spans hr_ts[5]..hr_ts[24] inclusive at 1 Hz.
        assert_eq!(*hr_samples, 20);
        assert_eq!(*hrv_samples, 0);
        assert_eq!(*acc_samples, 0);

        let (hr_path, _, _) = aggregated_paths(&dir);
        let rows = read_aggregated(&hr_path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, 1);
        assert_eq!(rows[0].1.len(), 20);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_session_is_skipped() {
        let dir = temp_dir("skip");
        write_hr_log(&dir, 2, 30);

        let options = AggregateOptions {
            rate_hz: 1.0,
            offset_secs: 6,
            hrv_window_secs: 5,
        };
        let outcomes = aggregate_sessions(&dir, &[1, 2], &options).unwrap();
        assert!(matches!(outcomes[0].result, SessionResult::Skipped(_)));
        assert!(matches!(
            outcomes[1].result,
            SessionResult::Aggregated { .. }
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_all_missing_is_an_error() {
        let dir = temp_dir("none");
        let options = AggregateOptions {
            rate_hz: 1.0,
            offset_secs: 6,
            hrv_window_secs: 5,
        };
        assert!(matches!(
            aggregate_sessions(&dir, &[7], &options),
            Err(AggregateError::NoUsableSessions)
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_short_session_is_skipped() {
        let dir = temp_dir("short");
        write_hr_log(&dir, 1, 8); // shorter than 2 * offset
        let options = AggregateOptions {
            rate_hz: 1.0,
            offset_secs: 6,
            hrv_window_secs: 5,
        };
        assert!(matches!(
            aggregate_sessions(&dir, &[1], &options),
            Err(AggregateError::NoUsableSessions)
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
