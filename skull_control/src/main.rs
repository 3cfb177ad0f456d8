//! # Skull Control
//!
//! Runs the motion engine and protocol decoder against the simulated drive.
//! Configuration comes from an optional TOML file; defaults apply when no
//! file is given. Ctrl-C stops both workers and prints their cycle stats.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use skull_common::config::LogLevel;
use skull_common::control::config::CoreConfig;
use skull_control::config::{ConfigHandle, load_config};
use skull_control::decoder::universe::SharedUniverse;
use skull_control::drive::{SimAxisConfig, SimulatedAxis};
use skull_control::engine::limits::LimitCapture;
use skull_control::runtime::Core;

/// Skull Control: stepper motion engine with DMX control
#[derive(Parser, Debug)]
#[command(name = "skull_control")]
#[command(version)]
#[command(about = "Real-time stepper motion engine with DMX512 control")]
struct Args {
    /// Path to the core configuration TOML. Defaults apply when omitted.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,

    /// Travel of the simulated axis between its limit switches [steps].
    #[arg(long, default_value_t = 4000)]
    simulate_travel: i32,

    /// Home on the first engine tick.
    #[arg(long)]
    auto_home: bool,

    /// Feed a slow position sweep into the simulated DMX universe.
    #[arg(long)]
    dmx_sweep: bool,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,
}

fn main() {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match load_config(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("configuration error: {e}");
                process::exit(2);
            }
        },
        None => CoreConfig::default(),
    };
    if args.auto_home {
        config.engine.auto_home_on_boot = true;
    }

    if args.print_config {
        match toml::to_string_pretty(&config) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("failed to render configuration: {e}");
                process::exit(1);
            }
        }
        return;
    }

    setup_tracing(&args, config.shared.log_level);
    info!("{} v{} starting", config.shared.service_name, env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args, config) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("shutdown complete");
}

fn run(args: &Args, config: CoreConfig) -> Result<(), Box<dyn std::error::Error>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    let capture = Arc::new(LimitCapture::new());
    let drive = SimulatedAxis::new(
        SimAxisConfig::with_travel(args.simulate_travel),
        Arc::clone(&capture),
    );
    let universe = SharedUniverse::new();
    let base_channel = config.decoder.base_channel;

    let core = Core::start(
        ConfigHandle::new(config),
        Box::new(drive),
        capture,
        Box::new(universe.reader()),
        Arc::clone(&running),
    )?;

    let started = Instant::now();
    let mut last_report = Instant::now();
    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(25));
        if args.dmx_sweep {
            universe.write_channels(base_channel, &sweep_frame(started.elapsed()));
        }
        if last_report.elapsed() >= Duration::from_secs(1) {
            last_report = Instant::now();
            let s = core.engine().status();
            info!(
                state = ?s.state,
                position = s.current_position,
                target = s.target_position,
                speed = s.current_speed,
                homed = s.homed,
                homing = s.homing_progress,
                faults = ?s.faults,
                link = ?s.link,
                mode = ?core.decoder().current_mode(),
                "status"
            );
        }
    }

    let decoder_stats = core.decoder().stats();
    info!(
        frames = decoder_stats.frames_total,
        corrupt = decoder_stats.frames_corrupt,
        emitted = decoder_stats.commands_emitted,
        dropped = decoder_stats.commands_dropped,
        "decoder totals"
    );
    for (name, stats) in core.shutdown()? {
        info!(
            task = name,
            cycles = stats.cycle_count,
            avg_ns = stats.avg_cycle_ns(),
            max_ns = stats.max_cycle_ns,
            overruns = stats.overruns,
            "cycle stats"
        );
    }
    Ok(())
}

/// Control-mode frame whose position byte follows a 20 s triangle wave.
fn sweep_frame(elapsed: Duration) -> [u8; 5] {
    let phase = (elapsed.as_millis() % 20_000) as u32;
    let tri = if phase < 10_000 { phase } else { 20_000 - phase };
    let position = (tri * 255 / 10_000) as u8;
    [position, 0, 128, 128, 200]
}

/// Setup tracing subscriber based on CLI arguments and configured level.
fn setup_tracing(args: &Args, level: LogLevel) {
    let filter = if args.verbose {
        EnvFilter::new(LogLevel::Debug.as_directive())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_directive()))
    };

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
