//! Pulsekit CLI
//!
//! Stream, plot, and process Polar Verity Sense sessions.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use pulsekit::aggregate::{
    aggregate_sessions, aggregated_paths, AggregateOptions, SessionResult,
};
use pulsekit::plot::{render_aggregated_png, render_session_png, PlotStyle};
use pulsekit::recording::{list_sessions, SessionWriter};
use pulsekit::stats::{create_shared_stats, create_shared_stats_with_persistence};
use pulsekit::{Config, PolarSensor, SensorEvent, SessionPaths, StreamSelection, VERSION};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pulsekit")]
#[command(version = VERSION)]
#[command(about = "Polar Verity Sense streaming and HRV analysis toolkit", long_about = None)]
struct Cli {
    /// Enable protocol-level debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a session to the data directory
    Stream {
        /// Record id for the session files
        #[arg(long, default_value = "1")]
        id: u32,

        /// Recording duration in seconds
        #[arg(long, default_value = "30")]
        duration: u64,

        /// Streams to record (hr, ppg, acc, or all)
        #[arg(long, default_value = "all")]
        sources: String,

        /// Overwrite an existing session with the same id
        #[arg(long)]
        force: bool,
    },

    /// Show live heart rate and battery level without recording
    Check {
        /// How long to watch, in seconds
        #[arg(long, default_value = "2")]
        duration: u64,
    },

    /// Aggregate recorded sessions into cross-session CSVs
    Process {
        /// Comma-separated record ids (default: every recorded session)
        #[arg(long)]
        ids: Option<String>,

        /// Output rate in Hz
        #[arg(long)]
        rate: Option<f64>,

        /// Seconds to trim from both ends of each recording
        #[arg(long)]
        offset: Option<u64>,
    },

    /// Render a session or the aggregated metrics to a PNG chart
    Plot {
        /// Record id of the session to plot
        #[arg(long)]
        id: Option<u32>,

        /// Plot the aggregated metrics instead of a single session
        #[arg(long)]
        aggregated: bool,

        /// Output path (default: under the data directory)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Plot only the trailing N samples of each log
        #[arg(long, default_value = "0")]
        last: usize,
    },

    /// List recorded sessions
    Sessions,

    /// Show configuration
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("pulsekit=debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Stream {
            id,
            duration,
            sources,
            force,
        } => cmd_stream(id, duration, &sources, force),
        Commands::Check { duration } => cmd_check(duration),
        Commands::Process { ids, rate, offset } => cmd_process(ids, rate, offset),
        Commands::Plot {
            id,
            aggregated,
            output,
            last,
        } => cmd_plot(id, aggregated, output, last),
        Commands::Sessions => cmd_sessions(),
        Commands::Config => cmd_config(),
    }
}

fn cmd_stream(id: u32, duration: u64, sources: &str, force: bool) -> anyhow::Result<()> {
    let selection = StreamSelection::from_csv(sources);
    if !selection.any_enabled() {
        bail!("at least one stream must be enabled (hr, ppg, or acc)");
    }

    let config = Config::load().unwrap_or_default();
    config
        .ensure_directories()
        .context("could not create data directory")?;

    let paths = SessionPaths::new(&config.data_dir, id);
    if paths.any_exists() && !force {
        bail!("session {id} already exists; pass --force to overwrite it");
    }

    println!("Pulsekit v{VERSION}");
    println!();
    println!("Recording session {id} for {duration}s");
    println!("  HR: {}", if selection.hr { "enabled" } else { "disabled" });
    println!("  PPG: {}", if selection.ppg { "enabled" } else { "disabled" });
    println!("  ACC: {}", if selection.acc { "enabled" } else { "disabled" });
    println!();

    let stats = create_shared_stats_with_persistence(config.stats_path());

    let runtime = tokio::runtime::Runtime::new()?;
    println!("Scanning for \"{}\"...", config.device_name_prefix);
    let mut sensor = runtime.block_on(PolarSensor::connect(
        &config.device_name_prefix,
        config.scan_timeout_secs,
        stats.clone(),
    ))?;
    println!("Connected to {}", sensor.name());

    match runtime.block_on(sensor.battery_level()) {
        Ok(level) => println!("Battery level: {level}%"),
        Err(e) => eprintln!("Warning: could not read battery level: {e}"),
    }

    let mut writer = SessionWriter::create(&paths, selection)?;
    runtime.block_on(sensor.start_streaming(selection))?;

    println!();
    println!("Streaming... press Ctrl+C to stop early");
    println!();

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone());

    let receiver = sensor.receiver().clone();
    let start = Instant::now();

    while running.load(Ordering::SeqCst) && start.elapsed() < Duration::from_secs(duration) {
        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => {
                match &event {
                    SensorEvent::Hr(sample) => {
                        stats.record_hr_sample();
                        println!("HR: {} bpm", sample.bpm);
                    }
                    SensorEvent::Ppg(frame) => {
                        stats.record_ppg_frame(frame.samples.len() as u64);
                    }
                    SensorEvent::Acc(frame) => {
                        stats.record_acc_frame(frame.samples.len() as u64);
                    }
                    SensorEvent::Control(response) => {
                        stats.record_control_response();
                        println!(
                            "PMD control: {:?} {:?} -> {:?}",
                            response.op_code, response.measurement, response.status
                        );
                    }
                }
                writer.write_event(&event)?;
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                eprintln!("Device disconnected unexpectedly");
                break;
            }
        }
    }

    println!();
    println!("Stopping streams...");
    if let Err(e) = runtime.block_on(sensor.stop_streaming()) {
        eprintln!("Warning: could not stop measurements cleanly: {e}");
    }
    if let Err(e) = runtime.block_on(sensor.disconnect()) {
        eprintln!("Warning: disconnect failed: {e}");
    }
    writer.flush()?;

    if let Err(e) = stats.save() {
        eprintln!("Warning: could not save stream stats: {e}");
    }

    println!();
    println!("{}", stats.summary());
    println!();
    println!("Session {id} written to {}", config.data_dir.display());
    Ok(())
}

fn cmd_check(duration: u64) -> anyhow::Result<()> {
    let config = Config::load().unwrap_or_default();
    let stats = create_shared_stats();

    let runtime = tokio::runtime::Runtime::new()?;
    println!("Scanning for \"{}\"...", config.device_name_prefix);
    let mut sensor = runtime.block_on(PolarSensor::connect(
        &config.device_name_prefix,
        config.scan_timeout_secs,
        stats,
    ))?;
    println!("Connected to {}", sensor.name());

    match runtime.block_on(sensor.battery_level()) {
        Ok(level) => println!("Battery level: {level}%"),
        Err(e) => eprintln!("Warning: could not read battery level: {e}"),
    }

    let selection = StreamSelection {
        hr: true,
        ppg: false,
        acc: false,
    };
    runtime.block_on(sensor.start_streaming(selection))?;
    println!("Watching heart rate for {duration}s...");
    println!();

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone());

    let receiver = sensor.receiver().clone();
    let start = Instant::now();
    while running.load(Ordering::SeqCst) && start.elapsed() < Duration::from_secs(duration) {
        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(SensorEvent::Hr(sample)) => println!("HR: {} bpm", sample.bpm),
            Ok(_) => {}
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                eprintln!("Device disconnected unexpectedly");
                break;
            }
        }
    }

    if let Err(e) = runtime.block_on(sensor.stop_streaming()) {
        eprintln!("Warning: could not stop cleanly: {e}");
    }
    let _ = runtime.block_on(sensor.disconnect());
    Ok(())
}

fn cmd_process(ids: Option<String>, rate: Option<f64>, offset: Option<u64>) -> anyhow::Result<()> {
    let config = Config::load().unwrap_or_default();

    let record_ids: Vec<u32> = match ids {
        Some(csv) => csv
            .split(',')
            .map(|s| {
                s.trim()
                    .parse::<u32>()
                    .with_context(|| format!("invalid record id \"{}\"", s.trim()))
            })
            .collect::<Result<_, _>>()?,
        None => list_sessions(&config.data_dir)?
            .iter()
            .map(|s| s.record_id)
            .collect(),
    };

    if record_ids.is_empty() {
        bail!(
            "no sessions found in {}; record one with `pulsekit stream`",
            config.data_dir.display()
        );
    }

    let options = AggregateOptions {
        rate_hz: rate.unwrap_or(config.aggregate_rate_hz),
        offset_secs: offset.unwrap_or(config.trim_offset_secs),
        hrv_window_secs: config.hrv_window_secs,
    };

    println!(
        "Aggregating {} session(s) at {} Hz (trim {}s)...",
        record_ids.len(),
        options.rate_hz,
        options.offset_secs
    );

    let outcomes = aggregate_sessions(&config.data_dir, &record_ids, &options)?;
    for outcome in &outcomes {
        match &outcome.result {
            SessionResult::Aggregated {
                hr_samples,
                hrv_samples,
                acc_samples,
            } => println!(
                "  id {}: HR {} | HRV {} | ACC {} samples",
                outcome.record_id, hr_samples, hrv_samples, acc_samples
            ),
            SessionResult::Skipped(reason) => {
                println!("  id {}: skipped ({reason})", outcome.record_id)
            }
        }
    }

    let (hr_path, hrv_path, acc_path) = aggregated_paths(&config.data_dir);
    println!();
    println!("Wrote:");
    println!("  {}", hr_path.display());
    println!("  {}", hrv_path.display());
    println!("  {}", acc_path.display());
    Ok(())
}

fn cmd_plot(
    id: Option<u32>,
    aggregated: bool,
    output: Option<PathBuf>,
    last: usize,
) -> anyhow::Result<()> {
    let config = Config::load().unwrap_or_default();
    let style = PlotStyle::default();

    let (png, default_name) = if aggregated {
        (
            render_aggregated_png(&config.data_dir, &style)?,
            "aggregated.png".to_string(),
        )
    } else {
        let id = id.context("pass --id <N> or --aggregated")?;
        (
            render_session_png(&config.data_dir, id, last, &style)?,
            format!("session_{id}.png"),
        )
    };

    let output_path = output.unwrap_or_else(|| config.data_dir.join(default_name));
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&output_path, png)?;
    println!("Chart written to {}", output_path.display());
    Ok(())
}

fn cmd_sessions() -> anyhow::Result<()> {
    let config = Config::load().unwrap_or_default();
    let sessions = list_sessions(&config.data_dir)?;

    if sessions.is_empty() {
        println!("No sessions recorded in {}", config.data_dir.display());
        println!("Record one with `pulsekit stream --id 1 --duration 30`");
        return Ok(());
    }

    println!("Sessions in {}:", config.data_dir.display());
    println!();
    println!("  {:>4}  {:>8}  {:>8}  {:>8}", "id", "hr", "ppg", "acc");
    for session in sessions {
        println!(
            "  {:>4}  {:>8}  {:>8}  {:>8}",
            session.record_id, session.hr_rows, session.ppg_rows, session.acc_rows
        );
    }
    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
    Ok(())
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");
}
