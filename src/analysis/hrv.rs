//! HRV metrics from detected peaks.
//!
//! Time-domain metrics (RMSSD, SDNN) come straight from the inter-beat
//! intervals. The frequency-domain HF fraction is computed from an evenly
//! resampled tachogram via FFT and normalized against LF + HF.

use crate::analysis::filter::band_pass_zero_phase;
use crate::analysis::peaks::detect_peaks;
use crate::analysis::{PPG_BAND_HIGH_HZ, PPG_BAND_LOW_HZ};
use rustfft::{num_complex::Complex64, FftPlanner};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Plausible inter-beat interval range (ms); values outside are artifacts.
const RR_MIN_MS: f64 = 300.0;
const RR_MAX_MS: f64 = 2000.0;

/// Tachogram resampling rate for spectral analysis (Hz).
const TACHOGRAM_RATE_HZ: f64 = 4.0;

/// LF and HF band edges (Hz).
const LF_BAND: (f64, f64) = (0.04, 0.15);
const HF_BAND: (f64, f64) = (0.15, 0.40);

/// HRV metrics for one analysis window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HrvSummary {
    /// Root mean square of successive RR differences (ms)
    pub rmssd_ms: f64,
    /// Standard deviation of RR intervals (ms)
    pub sdnn_ms: f64,
    /// Mean heart rate implied by the RR intervals (bpm)
    pub mean_hr_bpm: f64,
    /// HF power as a fraction of LF + HF power
    pub hf_norm: f64,
    /// Number of beats the metrics are based on
    pub beat_count: usize,
}

/// Analyze a window of raw PPG samples.
///
/// Filters, detects peaks, and computes HRV metrics. Returns `None` when
/// fewer than 5 peaks are found — a window that sparse cannot produce a
/// trustworthy interval series. The first and last peaks are discarded as
/// unreliable.
pub fn analyze_ppg_window(ppg: &[f64], sample_rate_hz: f64) -> Option<HrvSummary> {
    let filtered = band_pass_zero_phase(ppg, sample_rate_hz, PPG_BAND_LOW_HZ, PPG_BAND_HIGH_HZ);
    let peaks = detect_peaks(&filtered, sample_rate_hz);
    if peaks.len() < 5 {
        return None;
    }

    let interior = &peaks[1..peaks.len() - 1];
    let rr_ms = intervals_ms(interior, sample_rate_hz);
    hrv_from_rr(&rr_ms)
}

/// Compute HRV metrics from a series of RR intervals in milliseconds.
///
/// Artifact intervals outside the plausible range are dropped before any
/// statistic is computed.
pub fn hrv_from_rr(rr_ms: &[f64]) -> Option<HrvSummary> {
    let rr: Vec<f64> = rr_ms
        .iter()
        .copied()
        .filter(|&v| (RR_MIN_MS..=RR_MAX_MS).contains(&v))
        .collect();
    if rr.len() < 3 {
        return None;
    }

    let successive_sq: Vec<f64> = rr.windows(2).map(|p| (p[1] - p[0]).powi(2)).collect();
    let rmssd_ms = (successive_sq.iter().sum::<f64>() / successive_sq.len() as f64).sqrt();

    let mean_rr = (&rr).mean();
    let sdnn_ms = (&rr).std_dev();
    let mean_hr_bpm = 60_000.0 / mean_rr;

    Some(HrvSummary {
        rmssd_ms,
        sdnn_ms,
        mean_hr_bpm,
        hf_norm: hf_fraction(&rr),
        beat_count: rr.len() + 1,
    })
}

/// Inter-peak intervals in milliseconds.
fn intervals_ms(peaks: &[usize], sample_rate_hz: f64) -> Vec<f64> {
    peaks
        .windows(2)
        .map(|p| (p[1] - p[0]) as f64 * 1000.0 / sample_rate_hz)
        .collect()
}

/// HF power normalized against LF + HF.
///
/// The RR series is placed at its cumulative beat times, linearly
/// interpolated onto an even grid, mean-removed, and transformed. Returns
/// 0 when the window is too short to resolve the bands.
fn hf_fraction(rr_ms: &[f64]) -> f64 {
    // Beat times in seconds, starting at zero.
    let mut times = Vec::with_capacity(rr_ms.len());
    let mut t = 0.0;
    for rr in rr_ms {
        t += rr / 1000.0;
        times.push(t);
    }
    let span = t - times[0];
    if span < 5.0 {
        // Too short to resolve the LF/HF bands at all.
        return 0.0;
    }

    // Even tachogram.
    let step = 1.0 / TACHOGRAM_RATE_HZ;
    let n = (span / step) as usize;
    if n < 8 {
        return 0.0;
    }
    let mut grid = Vec::with_capacity(n);
    for i in 0..n {
        grid.push(interpolate(&times, rr_ms, times[0] + i as f64 * step));
    }

    let mean = (&grid).mean();
    let size = n.next_power_of_two();
    let mut buffer: Vec<Complex64> = grid
        .iter()
        .map(|&v| Complex64::new(v - mean, 0.0))
        .collect();
    buffer.resize(size, Complex64::new(0.0, 0.0));

    let mut planner = FftPlanner::new();
    planner.plan_fft_forward(size).process(&mut buffer);

    let bin_hz = TACHOGRAM_RATE_HZ / size as f64;
    let band_power = |band: (f64, f64)| -> f64 {
        buffer
            .iter()
            .take(size / 2)
            .enumerate()
            .filter(|(k, _)| {
                let f = *k as f64 * bin_hz;
                f >= band.0 && f < band.1
            })
            .map(|(_, c)| c.norm_sqr())
            .sum()
    };

    let lf = band_power(LF_BAND);
    let hf = band_power(HF_BAND);
    if lf + hf <= 0.0 {
        0.0
    } else {
        hf / (lf + hf)
    }
}

/// Linear interpolation of `(times, values)` at `at`.
fn interpolate(times: &[f64], values: &[f64], at: f64) -> f64 {
    match times.iter().position(|&t| t >= at) {
        Some(0) => values[0],
        Some(i) => {
            let (t0, t1) = (times[i - 1], times[i]);
            let (v0, v1) = (values[i - 1], values[i]);
            if t1 - t0 <= 0.0 {
                v0
            } else {
                v0 + (v1 - v0) * (at - t0) / (t1 - t0)
            }
        }
        None => *values.last().unwrap(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_constant_rr_has_zero_variability() {
        let rr = vec![800.0; 20];
        let summary = hrv_from_rr(&rr).unwrap();
        assert!(summary.rmssd_ms.abs() < 1e-9);
        assert!(summary.sdnn_ms.abs() < 1e-9);
        assert!((summary.mean_hr_bpm - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_alternating_rr_rmssd() {
        // Alternating 780/820: every successive difference is 40 ms.
        let rr: Vec<f64> = (0..20)
            .map(|i| if i % 2 == 0 { 780.0 } else { 820.0 })
            .collect();
        let summary = hrv_from_rr(&rr).unwrap();
        assert!((summary.rmssd_ms - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_artifacts_are_dropped() {
        let mut rr = vec![800.0; 10];
        rr.push(50.0); // impossible beat
        rr.push(5000.0); // dropped contact
        let summary = hrv_from_rr(&rr).unwrap();
        assert_eq!(summary.beat_count, 11);
        assert!(summary.rmssd_ms.abs() < 1e-9);
    }

    #[test]
    fn test_too_few_beats() {
        assert!(hrv_from_rr(&[800.0, 810.0]).is_none());
        assert!(hrv_from_rr(&[]).is_none());
    }

    #[test]
    fn test_hf_fraction_tracks_modulation_frequency() {
        // RR modulated at 0.3 Hz (inside HF) vs 0.08 Hz (inside LF).
        let make = |freq: f64| -> Vec<f64> {
            let mut rr = Vec::new();
            let mut t = 0.0;
            for _ in 0..120 {
                let interval = 800.0 + 50.0 * (2.0 * PI * freq * t).sin();
                rr.push(interval);
                t += interval / 1000.0;
            }
            rr
        };

        let hf_dominant = hf_fraction(&make(0.3));
        let lf_dominant = hf_fraction(&make(0.08));
        assert!(
            hf_dominant > lf_dominant,
            "hf {hf_dominant} should exceed lf {lf_dominant}"
        );
        assert!(hf_dominant > 0.5);
        assert!(lf_dominant < 0.5);
    }

    #[test]
    fn test_analyze_window_on_synthetic_pulse() {
        let fs = 55.0;
        let beat_hz = 1.25; // 75 bpm
        let signal: Vec<f64> = (0..(fs as usize * 30))
            .map(|i| {
                let phase = (i as f64 / fs * beat_hz) % 1.0;
                if phase < 0.25 {
                    1000.0 * (phase / 0.25 * PI).sin()
                } else {
                    0.0
                }
            })
            .collect();

        let summary = analyze_ppg_window(&signal, fs).expect("expected metrics");
        assert!(
            (summary.mean_hr_bpm - 75.0).abs() < 8.0,
            "mean HR {}",
            summary.mean_hr_bpm
        );
        // A perfectly regular pulse has near-zero short-term variability;
        // allow sampling jitter of one sample period.
        assert!(summary.rmssd_ms < 40.0, "rmssd {}", summary.rmssd_ms);
    }

    #[test]
    fn test_interpolation() {
        let times = vec![0.0, 1.0, 2.0];
        let values = vec![10.0, 20.0, 40.0];
        assert!((interpolate(&times, &values, 0.5) - 15.0).abs() < 1e-9);
        assert!((interpolate(&times, &values, 1.5) - 30.0).abs() < 1e-9);
        assert!((interpolate(&times, &values, -1.0) - 10.0).abs() < 1e-9);
        assert!((interpolate(&times, &values, 5.0) - 40.0).abs() < 1e-9);
    }
}
