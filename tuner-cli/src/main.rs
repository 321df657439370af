//! # guitar-tuner - Command-line front end
//!
//! Opens the default microphone, runs the tuning session at the display
//! refresh rate and prints one report per pass.
//!
//! ## Architecture
//! - **Main Thread**: owns the session and runs every pipeline pass
//! - **Audio Thread**: CPAL callback, only forwards samples (see `tuner-core`)
//! - **Stop**: the `--seconds` timer, or else pressing Enter, raises the session's stop flag

mod display;

use anyhow::{Context, Result, bail};
use clap::Parser;
use clap::builder::PossibleValuesParser;
use guitar_tuner_core::audio::MicrophoneCapture;
use guitar_tuner_core::scheduler::{FrameClock, StopHandle};
use guitar_tuner_core::tuning;
use guitar_tuner_core::{Session, TargetSelection, TunerConfig};
use std::io::Write;
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "guitar-tuner", version, about = "Real-time guitar tuner")]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tuning preset
    #[arg(long, value_parser = PossibleValuesParser::new(tuning::preset_names()))]
    tuning: Option<String>,

    /// Lock onto one string by name (e.g. A2) instead of the nearest
    #[arg(long)]
    string: Option<String>,

    /// Silence threshold (RMS)
    #[arg(long)]
    rms_threshold: Option<f32>,

    /// Minimum in-band energy ratio; enables the spectral gate
    #[arg(long)]
    spectral_gate: Option<f32>,

    /// Stop after this many seconds. Without it the tuner stops when Enter
    /// is pressed, or right away if stdin is already closed (e.g. `< /dev/null`)
    #[arg(long)]
    seconds: Option<u64>,

    /// Preferred capture sample rate in Hz; the device's nearest supported rate is used
    #[arg(long, default_value_t = 44100, value_parser = clap::value_parser!(u32).range(8000..=192000))]
    sample_rate: u32,

    /// Print one JSON object per pass
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .init();

    info!("Starting guitar-tuner v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let config = build_config(&args)?;
    let targets = config.targets()?;
    let names: Vec<&str> = targets.iter().map(|t| t.name.as_str()).collect();
    info!("Targets: {}", names.join(" "));

    let selection = match &args.string {
        Some(name) => match tuning::target_index(&targets, name) {
            Some(index) => TargetSelection::Locked(index),
            None => bail!("string {} is not part of the tuning ({})", name, names.join(" ")),
        },
        None => TargetSelection::Auto,
    };

    let mut session = Session::new(&config, targets)?;
    session.select_target(selection);

    let mut capture = MicrophoneCapture::with_sample_rate(args.sample_rate);
    if let Err(e) = session.start(&mut capture) {
        error!("Could not start tuning session: {}", e);
        return Err(e).context("microphone unavailable");
    }

    let stop = session.stop_handle();
    match args.seconds {
        Some(seconds) => spawn_stop_after(stop.clone(), Duration::from_secs(seconds)),
        None => {
            spawn_stop_on_enter(stop.clone());
            eprintln!("Play a string. Press Enter to stop.");
        }
    }

    let clock = FrameClock::new(config.tick_interval(), stop);
    let stdout = std::io::stdout();
    let passes = clock.run(|| {
        let Some(report) = session.tick() else {
            return ControlFlow::Break(());
        };
        let line = if args.json {
            match serde_json::to_string(&report) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize report: {}", e);
                    return ControlFlow::Break(());
                }
            }
        } else {
            display::format_report(&report)
        };
        if writeln!(stdout.lock(), "{}", line).is_err() {
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    });

    session.stop();
    info!("Finished after {} passes", passes);
    Ok(())
}

/// `RUST_LOG` when it parses, otherwise `info`.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Loads the configuration file (or defaults) and applies flag overrides.
fn build_config(args: &Args) -> Result<TunerConfig> {
    let mut config = match &args.config {
        Some(path) => TunerConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => TunerConfig::default(),
    };
    if let Some(tuning) = &args.tuning {
        config.tuning = tuning.clone();
        config.targets = None;
    }
    if let Some(threshold) = args.rms_threshold {
        config.rms_threshold = threshold;
    }
    if let Some(ratio) = args.spectral_gate {
        config.spectral_gate = Some(ratio);
    }
    config.validate()?;
    Ok(config)
}

fn spawn_stop_on_enter(stop: StopHandle) {
    std::thread::spawn(move || {
        let mut line = String::new();
        // EOF or a read error also ends the session.
        let _ = std::io::stdin().read_line(&mut line);
        stop.stop();
    });
}

fn spawn_stop_after(stop: StopHandle, after: Duration) {
    std::thread::spawn(move || {
        std::thread::sleep(after);
        stop.stop();
    });
}
