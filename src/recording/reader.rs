//! Readers for recorded session logs.
//!
//! Rows are returned sorted by timestamp; malformed rows are skipped the
//! way a live recording can leave a torn final line.

use crate::recording::RecordingError;
use std::path::Path;

/// A timestamped series of values from one session log.
#[derive(Debug, Clone, Default)]
pub struct TimeSeries {
    pub timestamps_us: Vec<i64>,
    pub values: Vec<f64>,
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        self.timestamps_us.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps_us.is_empty()
    }

    /// Keep only the trailing `n` samples.
    pub fn tail(mut self, n: usize) -> Self {
        if n > 0 && self.len() > n {
            let cut = self.len() - n;
            self.timestamps_us.drain(..cut);
            self.values.drain(..cut);
        }
        self
    }

    fn push(&mut self, timestamp_us: i64, value: f64) {
        self.timestamps_us.push(timestamp_us);
        self.values.push(value);
    }

    fn sort_by_time(&mut self) {
        let mut pairs: Vec<(i64, f64)> = self
            .timestamps_us
            .iter()
            .copied()
            .zip(self.values.iter().copied())
            .collect();
        pairs.sort_by_key(|(ts, _)| *ts);
        self.timestamps_us = pairs.iter().map(|(ts, _)| *ts).collect();
        self.values = pairs.iter().map(|(_, v)| *v).collect();
    }
}

/// Read the heart rate log: `timestamp_us,bpm,rr_ms`.
pub fn read_hr(path: &Path) -> Result<TimeSeries, RecordingError> {
    read_series(path, 2, |fields| {
        let ts = fields[0].parse().ok()?;
        let bpm: f64 = fields[1].parse().ok()?;
        Some((ts, bpm))
    })
}

/// Read the PPG log: `timestamp_us,ppg0,ambient`. Returns the ppg0 channel.
pub fn read_ppg(path: &Path) -> Result<TimeSeries, RecordingError> {
    read_series(path, 3, |fields| {
        let ts = fields[0].parse().ok()?;
        let ppg0: f64 = fields[1].parse().ok()?;
        Some((ts, ppg0))
    })
}

/// Read the ACC log: `timestamp_us,x,y,z`. Returns the mean absolute
/// acceleration per sample, scaled from milli-g to g.
pub fn read_acc_magnitude(path: &Path) -> Result<TimeSeries, RecordingError> {
    read_series(path, 4, |fields| {
        let ts = fields[0].parse().ok()?;
        let x: f64 = fields[1].parse().ok()?;
        let y: f64 = fields[2].parse().ok()?;
        let z: f64 = fields[3].parse().ok()?;
        Some((ts, (x.abs() + y.abs() + z.abs()) / 3000.0))
    })
}

fn read_series(
    path: &Path,
    min_fields: usize,
    parse: impl Fn(&[&str]) -> Option<(i64, f64)>,
) -> Result<TimeSeries, RecordingError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let mut series = TimeSeries::default();
    for record in reader.records() {
        let Ok(record) = record else { continue };
        let fields: Vec<&str> = record.iter().collect();
        if fields.len() < min_fields {
            continue;
        }
        if let Some((ts, value)) = parse(&fields) {
            series.push(ts, value);
        }
    }

    series.sort_by_time();
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("pulsekit-reader-{}-{name}", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_read_hr_sorts_and_skips_malformed() {
        let path = write_temp(
            "hr.csv",
            "timestamp_us,bpm,rr_ms\n2000000,62,\n1000000,61,983.4\nnot-a-row\n",
        );
        let series = read_hr(&path).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.timestamps_us, vec![1_000_000, 2_000_000]);
        assert_eq!(series.values, vec![61.0, 62.0]);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_read_acc_magnitude() {
        let path = write_temp("acc.csv", "timestamp_us,x,y,z\n0,300,-300,900\n");
        let series = read_acc_magnitude(&path).unwrap();
        assert_eq!(series.len(), 1);
        assert!((series.values[0] - 0.5).abs() < 1e-9);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_tail() {
        let series = TimeSeries {
            timestamps_us: vec![1, 2, 3, 4],
            values: vec![1.0, 2.0, 3.0, 4.0],
        };
        let tail = series.tail(2);
        assert_eq!(tail.timestamps_us, vec![3, 4]);

        let short = TimeSeries {
            timestamps_us: vec![1],
            values: vec![1.0],
        };
        assert_eq!(short.tail(5).len(), 1);
    }
}
