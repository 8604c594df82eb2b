//! Demonstration of the PMD decoding and HRV pipeline without a device.
//!
//! This example shows how to:
//! 1. Decode a PMD data frame payload into typed samples
//! 2. Parse a standard Heart Rate Measurement notification
//! 3. Run the analysis pipeline on a synthetic PPG window
//!
//! Run with: cargo run --example replay_demo

use pulsekit::analysis::analyze_ppg_window;
use pulsekit::model::HrSample;
use pulsekit::pmd::{parse_data_frame, DataFrame, MeasurementType, PpgFrameType};
use std::f64::consts::PI;

fn main() {
    println!("Pulsekit - Replay Demo");
    println!("======================");
    println!();

    // 1. A hand-built PPG delta frame: reference sample [1000, 2000, 3000, 40]
    //    followed by two 8-bit delta samples.
    let mut payload = vec![MeasurementType::Ppg as u8];
    payload.extend_from_slice(&2_000_000_000u64.to_le_bytes()); // end ts: 2 s
    payload.push(PpgFrameType::Delta as u8);
    for value in [1000u32, 2000, 3000, 40] {
        payload.push(value as u8);
        payload.push((value >> 8) as u8);
        payload.push((value >> 16) as u8);
    }
    payload.push(8); // delta size in bits
    payload.push(2); // two samples
    payload.extend_from_slice(&[1, 0xff, 2, 0]); // +1, -1, +2, 0
    payload.extend_from_slice(&[3, 0, 0xfe, 1]); // +3, 0, -2, +1

    match parse_data_frame(&payload) {
        Ok(DataFrame::Ppg(frame)) => {
            println!("Decoded PPG frame with {} samples:", frame.samples.len());
            for sample in &frame.samples {
                println!(
                    "  t={}us ppg0={} ppg1={} ppg2={} ambient={}",
                    sample.timestamp_us, sample.ppg0, sample.ppg1, sample.ppg2, sample.ambient
                );
            }
        }
        Ok(_) => println!("unexpected frame type"),
        Err(e) => println!("decode error: {e}"),
    }
    println!();

    // 2. A Heart Rate Measurement notification with an RR interval.
    let hr = HrSample::parse(&[0x10, 72, 0x00, 0x04], 0).unwrap();
    println!(
        "Heart rate notification: {} bpm, RR {:?} ms",
        hr.bpm, hr.rr_intervals_ms
    );
    println!();

    // 3. HRV metrics over 30 s of synthetic pulse at 72 bpm.
    let fs = 55.0;
    let beat_hz = 1.2;
    let ppg: Vec<f64> = (0..(fs as usize * 30))
        .map(|i| {
            let phase = (i as f64 / fs * beat_hz) % 1.0;
            if phase < 0.25 {
                1000.0 * (phase / 0.25 * PI).sin()
            } else {
                0.0
            }
        })
        .collect();

    match analyze_ppg_window(&ppg, fs) {
        Some(summary) => {
            println!("HRV over the synthetic window:");
            println!("  Beats: {}", summary.beat_count);
            println!("  Mean HR: {:.1} bpm", summary.mean_hr_bpm);
            println!("  RMSSD: {:.1} ms", summary.rmssd_ms);
            println!("  SDNN: {:.1} ms", summary.sdnn_ms);
            println!("  HF fraction: {:.2}", summary.hf_norm);
        }
        None => println!("window too sparse for HRV"),
    }

    println!();
    println!("Demo complete!");
}
