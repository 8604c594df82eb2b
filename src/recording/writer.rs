//! CSV writers for an in-progress recording session.

use crate::model::{SensorEvent, StreamSelection};
use crate::pmd::{AccFrame, PpgFrame};
use crate::recording::{RecordingError, SessionPaths};
use std::fs::File;
use std::path::Path;

/// Writes incoming sensor events to per-stream session logs.
///
/// Only the logs for selected streams are created, so an HR-only
/// recording does not leave empty PPG/ACC files behind.
pub struct SessionWriter {
    hr: Option<csv::Writer<File>>,
    ppg: Option<csv::Writer<File>>,
    acc: Option<csv::Writer<File>>,
}

impl SessionWriter {
    /// Create the log files for the selected streams and write headers.
    pub fn create(
        paths: &SessionPaths,
        selection: StreamSelection,
    ) -> Result<Self, RecordingError> {
        let hr = if selection.hr {
            Some(create_log(&paths.hr, &["timestamp_us", "bpm", "rr_ms"])?)
        } else {
            None
        };
        let ppg = if selection.ppg {
            Some(create_log(&paths.ppg, &["timestamp_us", "ppg0", "ambient"])?)
        } else {
            None
        };
        let acc = if selection.acc {
            Some(create_log(&paths.acc, &["timestamp_us", "x", "y", "z"])?)
        } else {
            None
        };

        Ok(Self { hr, ppg, acc })
    }

    /// Append an event to the matching log and flush it.
    ///
    /// Events for unselected streams are ignored; control responses are
    /// not recorded.
    pub fn write_event(&mut self, event: &SensorEvent) -> Result<(), RecordingError> {
        match event {
            SensorEvent::Hr(sample) => {
                if let Some(writer) = self.hr.as_mut() {
                    let rr = sample
                        .rr_intervals_ms
                        .iter()
                        .map(|v| format!("{v:.1}"))
                        .collect::<Vec<_>>()
                        .join(";");
                    writer.write_record([
                        sample.timestamp_us.to_string(),
                        sample.bpm.to_string(),
                        rr,
                    ])?;
                    writer.flush()?;
                }
            }
            SensorEvent::Ppg(frame) => {
                if let Some(writer) = self.ppg.as_mut() {
                    write_ppg_frame(writer, frame)?;
                }
            }
            SensorEvent::Acc(frame) => {
                if let Some(writer) = self.acc.as_mut() {
                    write_acc_frame(writer, frame)?;
                }
            }
            SensorEvent::Control(_) => {}
        }
        Ok(())
    }

    /// Flush all open logs.
    pub fn flush(&mut self) -> Result<(), RecordingError> {
        for writer in [&mut self.hr, &mut self.ppg, &mut self.acc]
            .into_iter()
            .flatten()
        {
            writer.flush()?;
        }
        Ok(())
    }
}

fn create_log(path: &Path, header: &[&str]) -> Result<csv::Writer<File>, RecordingError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(header)?;
    writer.flush()?;
    Ok(writer)
}

fn write_ppg_frame(writer: &mut csv::Writer<File>, frame: &PpgFrame) -> Result<(), RecordingError> {
    for sample in &frame.samples {
        writer.write_record([
            sample.timestamp_us.to_string(),
            sample.ppg0.to_string(),
            sample.ambient.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_acc_frame(writer: &mut csv::Writer<File>, frame: &AccFrame) -> Result<(), RecordingError> {
    for sample in &frame.samples {
        writer.write_record([
            sample.timestamp_us.to_string(),
            sample.x.to_string(),
            sample.y.to_string(),
            sample.z.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HrSample;
    use crate::pmd::{AccSample, PpgSample};

    fn temp_session(tag: &str) -> (std::path::PathBuf, SessionPaths) {
        let dir = std::env::temp_dir().join(format!(
            "pulsekit-writer-{tag}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let paths = SessionPaths::new(&dir, 1);
        (dir, paths)
    }

    #[test]
    fn test_writes_selected_streams_only() {
        let (dir, paths) = temp_session("selected");
        let selection = StreamSelection {
            hr: true,
            ppg: false,
            acc: false,
        };
        let mut writer = SessionWriter::create(&paths, selection).unwrap();

        writer
            .write_event(&SensorEvent::Hr(HrSample {
                timestamp_us: 100,
                bpm: 61,
                rr_intervals_ms: vec![983.4],
            }))
            .unwrap();
        writer
            .write_event(&SensorEvent::Ppg(PpgFrame {
                samples: vec![PpgSample {
                    timestamp_us: 100,
                    ppg0: 1,
                    ppg1: 2,
                    ppg2: 3,
                    ambient: 4,
                }],
            }))
            .unwrap();

        assert!(paths.hr.exists());
        assert!(!paths.ppg.exists());

        let content = std::fs::read_to_string(&paths.hr).unwrap();
        assert!(content.starts_with("timestamp_us,bpm,rr_ms"));
        assert!(content.contains("100,61,983.4"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_acc_rows() {
        let (dir, paths) = temp_session("acc");
        let mut writer = SessionWriter::create(&paths, StreamSelection::default()).unwrap();

        writer
            .write_event(&SensorEvent::Acc(AccFrame {
                samples: vec![AccSample {
                    timestamp_us: 50,
                    x: 10,
                    y: -20,
                    z: 1000,
                }],
            }))
            .unwrap();

        let content = std::fs::read_to_string(&paths.acc).unwrap();
        assert!(content.contains("50,10,-20,1000"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
