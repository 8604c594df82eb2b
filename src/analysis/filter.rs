//! Butterworth filtering.
//!
//! Second-order low/high-pass biquads derived via the bilinear transform,
//! cascaded into a band-pass and applied forward-backward for zero phase
//! shift (peak positions must not move in time).

use std::f64::consts::{PI, SQRT_2};

/// A second-order IIR section, direct form II transposed.
#[derive(Debug, Clone)]
pub struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    z1: f64,
    z2: f64,
}

impl Biquad {
    /// Butterworth low-pass at `cutoff_hz`.
    pub fn low_pass(cutoff_hz: f64, sample_rate_hz: f64) -> Self {
        let k = (PI * cutoff_hz / sample_rate_hz).tan();
        let norm = 1.0 / (1.0 + SQRT_2 * k + k * k);
        Self {
            b0: k * k * norm,
            b1: 2.0 * k * k * norm,
            b2: k * k * norm,
            a1: 2.0 * (k * k - 1.0) * norm,
            a2: (1.0 - SQRT_2 * k + k * k) * norm,
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// Butterworth high-pass at `cutoff_hz`.
    pub fn high_pass(cutoff_hz: f64, sample_rate_hz: f64) -> Self {
        let k = (PI * cutoff_hz / sample_rate_hz).tan();
        let norm = 1.0 / (1.0 + SQRT_2 * k + k * k);
        Self {
            b0: norm,
            b1: -2.0 * norm,
            b2: norm,
            a1: 2.0 * (k * k - 1.0) * norm,
            a2: (1.0 - SQRT_2 * k + k * k) * norm,
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// Process one sample.
    pub fn process(&mut self, x: f64) -> f64 {
        let y = self.b0 * x + self.z1;
        self.z1 = self.b1 * x - self.a1 * y + self.z2;
        self.z2 = self.b2 * x - self.a2 * y;
        y
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

/// Single-pass band-pass: high-pass then low-pass cascade.
pub fn band_pass(data: &[f64], sample_rate_hz: f64, low_hz: f64, high_hz: f64) -> Vec<f64> {
    let mut hp = Biquad::high_pass(low_hz, sample_rate_hz);
    let mut lp = Biquad::low_pass(high_hz, sample_rate_hz);
    data.iter().map(|&x| lp.process(hp.process(x))).collect()
}

/// Zero-phase band-pass: filter forward, then backward.
///
/// The signal is extended at both ends with mirrored samples so the filter
/// transient settles outside the region of interest.
pub fn band_pass_zero_phase(
    data: &[f64],
    sample_rate_hz: f64,
    low_hz: f64,
    high_hz: f64,
) -> Vec<f64> {
    if data.len() < 3 {
        return data.to_vec();
    }

    let pad = (3.0 * sample_rate_hz) as usize;
    let pad = pad.min(data.len() - 1);

    let mut extended = Vec::with_capacity(data.len() + 2 * pad);
    for i in (1..=pad).rev() {
        extended.push(data[i]);
    }
    extended.extend_from_slice(data);
    for i in (data.len() - pad - 1..data.len() - 1).rev() {
        extended.push(data[i]);
    }

    let mut filtered = band_pass(&extended, sample_rate_hz, low_hz, high_hz);
    filtered.reverse();
    let mut filtered = band_pass(&filtered, sample_rate_hz, low_hz, high_hz);
    filtered.reverse();

    filtered[pad..pad + data.len()].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_pass_passes_dc() {
        let mut lp = Biquad::low_pass(5.0, 55.0);
        let mut last = 0.0;
        for _ in 0..500 {
            last = lp.process(1.0);
        }
        assert!((last - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_high_pass_blocks_dc() {
        let mut hp = Biquad::high_pass(0.5, 55.0);
        let mut last = 1.0;
        for _ in 0..2000 {
            last = hp.process(1.0);
        }
        assert!(last.abs() < 1e-3);
    }

    #[test]
    fn test_band_pass_removes_offset() {
        let fs = 55.0;
        // 1.5 Hz sine riding on a large DC offset
        let data: Vec<f64> = (0..(fs as usize * 20))
            .map(|i| 50_000.0 + 100.0 * (2.0 * PI * 1.5 * i as f64 / fs).sin())
            .collect();

        let filtered = band_pass_zero_phase(&data, fs, 0.5, 5.0);
        assert_eq!(filtered.len(), data.len());

        // Interior of the filtered signal should be centered near zero with
        // the oscillation preserved.
        let interior = &filtered[100..filtered.len() - 100];
        let mean: f64 = interior.iter().sum::<f64>() / interior.len() as f64;
        assert!(mean.abs() < 5.0, "mean was {mean}");
        let max = interior.iter().cloned().fold(f64::MIN, f64::max);
        assert!(max > 50.0, "max was {max}");
    }

    #[test]
    fn test_zero_phase_keeps_short_input() {
        let data = vec![1.0, 2.0];
        assert_eq!(band_pass_zero_phase(&data, 55.0, 0.5, 5.0), data);
    }
}
