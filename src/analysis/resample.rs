//! Resampling of recorded series onto a fixed output rate.
//!
//! Aggregation walks target instants from a synced start to a synced end
//! at the requested rate. Each series type resamples differently: HR
//! step-holds (it arrives at 1 Hz), ACC magnitude averages over the
//! interval, and PPG yields an RMSSD value from a sliding window.

use crate::analysis::hrv::analyze_ppg_window;
use crate::recording::TimeSeries;

/// Target instants from `start_us` to `end_us` inclusive at `rate_hz`.
fn instants(start_us: i64, end_us: i64, rate_hz: f64) -> Vec<i64> {
    let step = (1_000_000.0 / rate_hz) as i64;
    let mut out = Vec::new();
    let mut t = start_us;
    while t <= end_us {
        out.push(t);
        t += step;
    }
    out
}

/// Step-hold resampling: each instant takes the most recent sample.
///
/// Instants before the first sample take the first value, so the output
/// always has one entry per instant.
pub fn resample_step_hold(series: &TimeSeries, start_us: i64, end_us: i64, rate_hz: f64) -> Vec<f64> {
    let mut out = Vec::new();
    if series.is_empty() {
        return out;
    }

    let mut index = 0;
    for t in instants(start_us, end_us, rate_hz) {
        while index + 1 < series.len() && series.timestamps_us[index + 1] <= t {
            index += 1;
        }
        if series.timestamps_us[index] <= t {
            out.push(series.values[index]);
        } else {
            out.push(series.values[0]);
        }
    }
    out
}

/// Windowed-mean resampling: each instant averages the samples since the
/// previous instant. An empty interval carries the previous output value.
pub fn resample_window_mean(
    series: &TimeSeries,
    start_us: i64,
    end_us: i64,
    rate_hz: f64,
) -> Vec<f64> {
    let step = (1_000_000.0 / rate_hz) as i64;
    let mut out = Vec::new();
    if series.is_empty() {
        return out;
    }

    let mut index = 0;
    let mut last = 0.0;
    for t in instants(start_us, end_us, rate_hz) {
        let window_start = t - step;
        let mut sum = 0.0;
        let mut count = 0usize;

        while index < series.len() && series.timestamps_us[index] <= t {
            if series.timestamps_us[index] > window_start {
                sum += series.values[index];
                count += 1;
            }
            index += 1;
        }

        if count > 0 {
            last = sum / count as f64;
        }
        out.push(last);
    }
    out
}

/// Sliding-window HRV resampling: each instant computes RMSSD over the
/// PPG samples within `window_secs` on each side, 0 where no value can be
/// detected.
pub fn resample_hrv(
    ppg: &TimeSeries,
    start_us: i64,
    end_us: i64,
    rate_hz: f64,
    window_secs: u64,
    sample_rate_hz: f64,
) -> Vec<f64> {
    let half_us = window_secs as i64 * 1_000_000;
    let mut out = Vec::new();
    if ppg.is_empty() {
        return out;
    }

    for t in instants(start_us, end_us, rate_hz) {
        let lo = ppg.timestamps_us.partition_point(|&ts| ts < t - half_us);
        let hi = ppg.timestamps_us.partition_point(|&ts| ts <= t + half_us);

        let value = if hi > lo {
            analyze_ppg_window(&ppg.values[lo..hi], sample_rate_hz)
                .map(|summary| summary.rmssd_ms)
                .unwrap_or(0.0)
        } else {
            0.0
        };
        out.push(value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn series(points: &[(i64, f64)]) -> TimeSeries {
        TimeSeries {
            timestamps_us: points.iter().map(|(t, _)| *t).collect(),
            values: points.iter().map(|(_, v)| *v).collect(),
        }
    }

    #[test]
    fn test_step_hold_at_source_rate() {
        let s = series(&[(0, 60.0), (1_000_000, 61.0), (2_000_000, 62.0)]);
        let out = resample_step_hold(&s, 0, 2_000_000, 1.0);
        assert_eq!(out, vec![60.0, 61.0, 62.0]);
    }

    #[test]
    fn test_step_hold_repeats_when_upsampling() {
        let s = series(&[(0, 60.0), (1_000_000, 61.0)]);
        let out = resample_step_hold(&s, 0, 1_000_000, 2.0);
        assert_eq!(out, vec![60.0, 60.0, 61.0]);
    }

    #[test]
    fn test_step_hold_before_first_sample() {
        let s = series(&[(5_000_000, 70.0)]);
        let out = resample_step_hold(&s, 0, 5_000_000, 1.0);
        assert_eq!(out.len(), 6);
        assert_eq!(out[0], 70.0);
    }

    #[test]
    fn test_window_mean() {
        // 10 Hz samples, resampled to 1 Hz: each output averages ten inputs.
        let points: Vec<(i64, f64)> = (1..=20)
            .map(|i| (i as i64 * 100_000, if i <= 10 { 1.0 } else { 3.0 }))
            .collect();
        let s = series(&points);
        let out = resample_window_mean(&s, 1_000_000, 2_000_000, 1.0);
        assert_eq!(out.len(), 2);
        assert!((out[0] - 1.0).abs() < 1e-9);
        assert!((out[1] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_window_mean_carries_empty_intervals() {
        let s = series(&[(0, 2.0), (3_000_000, 4.0)]);
        let out = resample_window_mean(&s, 0, 3_000_000, 1.0);
        assert_eq!(out, vec![2.0, 2.0, 2.0, 4.0]);
    }

    #[test]
    fn test_resample_hrv_produces_values_over_pulse() {
        // 40 s of synthetic pulse at 75 bpm, 55 Hz.
        let fs = 55.0;
        let beat_hz = 1.25;
        let n = (fs * 40.0) as usize;
        let mut timestamps = Vec::with_capacity(n);
        let mut values = Vec::with_capacity(n);
        for i in 0..n {
            timestamps.push((i as f64 * 1_000_000.0 / fs) as i64);
            let phase = (i as f64 / fs * beat_hz) % 1.0;
            values.push(if phase < 0.25 {
                1000.0 * (phase / 0.25 * PI).sin()
            } else {
                0.0
            });
        }
        let ppg = TimeSeries {
            timestamps_us: timestamps,
            values,
        };

        let out = resample_hrv(&ppg, 10_000_000, 30_000_000, 1.0, 5, fs);
        assert_eq!(out.len(), 21);
        // Regular pulse: RMSSD defined and small for interior instants.
        assert!(out.iter().all(|v| *v >= 0.0));
        assert!(out[10] < 60.0);
    }

    #[test]
    fn test_empty_series() {
        let empty = TimeSeries::default();
        assert!(resample_step_hold(&empty, 0, 1_000_000, 1.0).is_empty());
        assert!(resample_window_mean(&empty, 0, 1_000_000, 1.0).is_empty());
        assert!(resample_hrv(&empty, 0, 1_000_000, 1.0, 5, 55.0).is_empty());
    }
}
