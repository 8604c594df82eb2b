//! PNG chart rendering for recorded and aggregated data.
//!
//! Charts are drawn into an in-memory RGB buffer with `plotters` and
//! encoded to PNG with `image`. A session chart stacks one panel per
//! available log (HR, filtered PPG with detected peaks, ACC magnitude);
//! the aggregated chart stacks the three aggregated metrics with one line
//! per record id.

use crate::aggregate::{aggregated_paths, read_aggregated};
use crate::analysis::{band_pass_zero_phase, detect_peaks, PPG_BAND_HIGH_HZ, PPG_BAND_LOW_HZ};
use crate::pmd::types::PPG_RATE;
use crate::recording::{self, RecordingError, SessionPaths, TimeSeries};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::*;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

/// Errors from chart rendering.
#[derive(Debug, Error)]
pub enum PlotError {
    #[error("failed to render plot: {0}")]
    Render(String),
    #[error("recording error: {0}")]
    Recording(#[from] RecordingError),
    #[error("nothing to plot: {0}")]
    Empty(String),
}

impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for PlotError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        PlotError::Render(format!("{value:?}"))
    }
}

impl From<image::ImageError> for PlotError {
    fn from(value: image::ImageError) -> Self {
        PlotError::Render(value.to_string())
    }
}

/// Chart dimensions and colors.
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub palette: Vec<RGBColor>,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 700,
            background: RGBColor(15, 15, 15),
            palette: vec![RED, GREEN, BLUE, CYAN, MAGENTA, YELLOW, WHITE],
        }
    }
}

/// One panel of a stacked chart.
struct Panel {
    title: String,
    series: Vec<(String, Vec<(f64, f64)>)>,
    markers: Vec<(f64, f64)>,
}

/// Render a recorded session to a PNG.
///
/// `tail` limits each log to its trailing N samples, the way a live view
/// follows the end of an in-progress recording.
pub fn render_session_png(
    data_dir: &Path,
    record_id: u32,
    tail: usize,
    style: &PlotStyle,
) -> Result<Vec<u8>, PlotError> {
    let paths = SessionPaths::new(data_dir, record_id);
    let mut panels = Vec::new();

    if paths.hr.exists() {
        let hr = recording::read_hr(&paths.hr)?.tail(tail);
        if !hr.is_empty() {
            panels.push(Panel {
                title: format!("HR (bpm), session {record_id}"),
                series: vec![("HR".to_string(), to_seconds(&hr))],
                markers: Vec::new(),
            });
        }
    }

    if paths.ppg.exists() {
        let ppg = recording::read_ppg(&paths.ppg)?.tail(tail);
        if !ppg.is_empty() {
            let filtered = band_pass_zero_phase(
                &ppg.values,
                PPG_RATE.hz(),
                PPG_BAND_LOW_HZ,
                PPG_BAND_HIGH_HZ,
            );
            let peaks = detect_peaks(&filtered, PPG_RATE.hz());

            let t0 = ppg.timestamps_us[0];
            let points: Vec<(f64, f64)> = ppg
                .timestamps_us
                .iter()
                .zip(filtered.iter())
                .map(|(&ts, &v)| ((ts - t0) as f64 / 1_000_000.0, v))
                .collect();
            let markers = peaks.iter().map(|&i| points[i]).collect();

            panels.push(Panel {
                title: format!("PPG (filtered), session {record_id}"),
                series: vec![("PPG".to_string(), points)],
                markers,
            });
        }
    }

    if paths.acc.exists() {
        let acc = recording::read_acc_magnitude(&paths.acc)?.tail(tail);
        if !acc.is_empty() {
            panels.push(Panel {
                title: format!("ACC magnitude (g), session {record_id}"),
                series: vec![("ACC".to_string(), to_seconds(&acc))],
                markers: Vec::new(),
            });
        }
    }

    if panels.is_empty() {
        return Err(PlotError::Empty(format!(
            "session {record_id} has no logs under {}",
            data_dir.display()
        )));
    }

    render_panels(&panels, style)
}

/// Render the aggregated metrics to a PNG, one line per record id.
pub fn render_aggregated_png(data_dir: &Path, style: &PlotStyle) -> Result<Vec<u8>, PlotError> {
    let (hr_path, hrv_path, acc_path) = aggregated_paths(data_dir);
    let mut panels = Vec::new();

    for (path, title) in [
        (hr_path, "Aggregated HR (bpm)"),
        (hrv_path, "Aggregated HRV (RMSSD, ms)"),
        (acc_path, "Aggregated ACC (g)"),
    ] {
        if !path.exists() {
            continue;
        }
        let rows = read_aggregated(&path).map_err(|e| PlotError::Render(e.to_string()))?;
        if rows.is_empty() {
            continue;
        }
        let series = rows
            .into_iter()
            .map(|(id, values)| {
                let points = values
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| (i as f64, v))
                    .collect();
                (format!("id {id}"), points)
            })
            .collect();
        panels.push(Panel {
            title: title.to_string(),
            series,
            markers: Vec::new(),
        });
    }

    if panels.is_empty() {
        return Err(PlotError::Empty(format!(
            "no aggregated CSVs under {} (run `pulsekit process` first)",
            data_dir.display()
        )));
    }

    render_panels(&panels, style)
}

fn to_seconds(series: &TimeSeries) -> Vec<(f64, f64)> {
    let t0 = series.timestamps_us[0];
    series
        .timestamps_us
        .iter()
        .zip(series.values.iter())
        .map(|(&ts, &v)| ((ts - t0) as f64 / 1_000_000.0, v))
        .collect()
}

fn render_panels(panels: &[Panel], style: &PlotStyle) -> Result<Vec<u8>, PlotError> {
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let areas = root.split_evenly((panels.len(), 1));

        for (panel, area) in panels.iter().zip(areas.iter()) {
            draw_panel(panel, area, style)?;
        }
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}

fn draw_panel(
    panel: &Panel,
    area: &DrawingArea<BitMapBackend, plotters::coord::Shift>,
    style: &PlotStyle,
) -> Result<(), PlotError> {
    let (x_range, y_range) = bounds(panel);

    let mut chart = ChartBuilder::on(area)
        .margin(8)
        .caption(&panel.title, ("sans-serif", 18).into_font().color(&WHITE))
        .set_label_area_size(LabelAreaPosition::Left, 55)
        .set_label_area_size(LabelAreaPosition::Bottom, 28)
        .build_cartesian_2d(x_range, y_range)?;
    chart
        .configure_mesh()
        .light_line_style(&WHITE.mix(0.1))
        .label_style(("sans-serif", 12).into_font().color(&WHITE))
        .draw()?;

    for (idx, (label, points)) in panel.series.iter().enumerate() {
        let color = style.palette[idx % style.palette.len()];
        chart
            .draw_series(LineSeries::new(points.iter().copied(), &color))?
            .label(label.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
    }

    if !panel.markers.is_empty() {
        chart.draw_series(
            panel
                .markers
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 3, WHITE.filled())),
        )?;
    }

    if panel.series.len() > 1 {
        chart
            .configure_series_labels()
            .border_style(&WHITE.mix(0.2))
            .background_style(&style.background)
            .label_font(("sans-serif", 12).into_font().color(&WHITE))
            .draw()?;
    }

    Ok(())
}

fn bounds(panel: &Panel) -> (std::ops::Range<f64>, std::ops::Range<f64>) {
    let mut x_max = 0.0f64;
    let mut y_min = f64::MAX;
    let mut y_max = f64::MIN;
    for (_, points) in &panel.series {
        for &(x, y) in points {
            x_max = x_max.max(x);
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
    }
    if y_min > y_max {
        (0.0..1.0, 0.0..1.0)
    } else if (y_max - y_min).abs() < f64::EPSILON {
        (0.0..x_max.max(1.0), y_min - 1.0..y_max + 1.0)
    } else {
        let pad = (y_max - y_min) * 0.05;
        (0.0..x_max.max(1.0), y_min - pad..y_max + pad)
    }
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, PlotError> {
    let img = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| PlotError::Render("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    DynamicImage::ImageRgb8(img).write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("pulsekit-plot-{tag}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_session_chart_from_hr_log() {
        let dir = temp_dir("session");
        let paths = SessionPaths::new(&dir, 1);
        let mut file = std::fs::File::create(&paths.hr).unwrap();
        writeln!(file, "timestamp_us,bpm,rr_ms").unwrap();
        for i in 0..30 {
            writeln!(file, "{},{},", i * 1_000_000, 60 + (i % 7)).unwrap();
        }

        let png = render_session_png(&dir, 1, 0, &PlotStyle::default()).unwrap();
        // PNG magic bytes
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_session_is_empty_error() {
        let dir = temp_dir("missing");
        assert!(matches!(
            render_session_png(&dir, 42, 0, &PlotStyle::default()),
            Err(PlotError::Empty(_))
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_flat_series_bounds_are_padded() {
        let panel = Panel {
            title: "flat".to_string(),
            series: vec![("s".to_string(), vec![(0.0, 5.0), (1.0, 5.0)])],
            markers: Vec::new(),
        };
        let (_, y) = bounds(&panel);
        assert!(y.start < 5.0 && y.end > 5.0);
    }
}
