//! liftcore simulator — Main Entry Point
//!
//! Runs the full control core against the simulated car, driving the call
//! and stop buttons from a command-line script.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SimulatedCar                 LogEventSink    JsonConfigFile   │
//! │  (RawInput+Car+MotorObserver) (EventSink)     (ConfigPort)     │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              ElevatorCore (pure logic)                 │    │
//! │  │  Debouncer · Tracker · Planner · SafetyMonitor         │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ```text
//! liftcore --call 0:3 --call 4000:2 --stop 9000:500 --duration-secs 30
//! ```
#![deny(unused_must_use)]

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{info, warn};

use liftcore::adapters::config_file::JsonConfigFile;
use liftcore::adapters::log_sink::LogEventSink;
use liftcore::adapters::sim::SimulatedCar;
use liftcore::app::ports::ConfigPort;
use liftcore::app::service::ElevatorCore;
use liftcore::config::SystemConfig;
use liftcore::error::Error;
use liftcore::pins::InputLine;
use liftcore::planner::queue::Floor;
use liftcore::scheduler::{TaskSpec, spawn_task};

/// Nominal priority of the plant thread: above every core task.
const PLANT_PRIORITY: u8 = 6;

#[derive(Parser, Debug)]
#[command(name = "liftcore", version, about = "Elevator control core simulator")]
struct Args {
    /// JSON configuration file (defaults are used when absent)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// How long to run the simulation
    #[arg(long, default_value_t = 20)]
    duration_secs: u64,

    /// Press a call button: `<at_ms>:<floor>`, floor 1..3
    #[arg(long = "call", value_parser = parse_call)]
    calls: Vec<(u64, Floor)>,

    /// Hold the stop button: `<at_ms>:<duration_ms>`
    #[arg(long = "stop", value_parser = parse_stop)]
    stops: Vec<(u64, u64)>,

    /// How long a call button is held down (ms)
    #[arg(long, default_value_t = 100)]
    hold_ms: u64,
}

fn parse_pair(s: &str) -> Result<(u64, u64), String> {
    let (a, b) = s
        .split_once(':')
        .ok_or_else(|| format!("expected `<a>:<b>`, got `{s}`"))?;
    let a = a.trim().parse().map_err(|e| format!("`{a}`: {e}"))?;
    let b = b.trim().parse().map_err(|e| format!("`{b}`: {e}"))?;
    Ok((a, b))
}

fn parse_call(s: &str) -> Result<(u64, Floor), String> {
    let (at_ms, n) = parse_pair(s)?;
    let floor = u8::try_from(n)
        .ok()
        .and_then(Floor::from_number)
        .ok_or_else(|| format!("no floor {n}"))?;
    Ok((at_ms, floor))
}

fn parse_stop(s: &str) -> Result<(u64, u64), String> {
    parse_pair(s)
}

fn call_line(floor: Floor) -> InputLine {
    match floor {
        Floor::Floor1 => InputLine::CallFloor1,
        Floor::Floor2 => InputLine::CallFloor2,
        Floor::Floor3 => InputLine::CallFloor3,
    }
}

/// Button level changes ordered by time.
fn build_script(args: &Args) -> Vec<(u64, InputLine, bool)> {
    let mut script = Vec::new();
    for &(at_ms, floor) in &args.calls {
        script.push((at_ms, call_line(floor), true));
        script.push((at_ms + args.hold_ms, call_line(floor), false));
    }
    for &(at_ms, held_ms) in &args.stops {
        script.push((at_ms, InputLine::StopButton, true));
        script.push((at_ms + held_ms, InputLine::StopButton, false));
    }
    script.sort_by_key(|(at_ms, _, _)| *at_ms);
    script
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    info!("=== liftcore simulator v{} ===", env!("CARGO_PKG_VERSION"));

    // ── 1. Configuration ──────────────────────────────────────
    let config = match &args.config {
        Some(path) => JsonConfigFile::new(path)
            .load()
            .with_context(|| format!("loading {}", path.display()))?,
        None => SystemConfig::default(),
    };

    // ── 2. Core + plant ───────────────────────────────────────
    let core = ElevatorCore::new(config.clone()).context("building core")?;
    let car = Arc::new(SimulatedCar::new(&config, core.tracker()));
    let mut sink = LogEventSink::new();
    core.start(&mut sink);

    let plant_shutdown = Arc::new(AtomicBool::new(false));
    let plant = {
        let car = car.clone();
        let period = car.half_step_period().as_millis() as u32;
        spawn_task(
            TaskSpec::new("plant", period, PLANT_PRIORITY),
            plant_shutdown.clone(),
            move || car.step(),
        )
        .context("spawning plant")?
    };
    let running = core.spawn(car.clone(), sink).context("spawning core")?;

    // ── 3. Scripted button presses ────────────────────────────
    let script = build_script(&args);
    let start = Instant::now();
    let end = start + Duration::from_secs(args.duration_secs);
    let mut pending = script.into_iter().peekable();
    let mut next_report = start;

    while Instant::now() < end {
        let elapsed_ms = start.elapsed().as_millis() as u64;
        while let Some(&(at_ms, line, level)) = pending.peek() {
            if at_ms > elapsed_ms {
                break;
            }
            let action = if level { "down" } else { "up" };
            info!("t={}ms: {} {}", elapsed_ms, line.name(), action);
            car.press(line, level);
            pending.next();
        }

        if Instant::now() >= next_report {
            let plant = car.snapshot();
            let view = running.view();
            info!(
                "STATUS | car={}cm tracked={}cm target={}cm doors={} queue={:?}",
                plant.position,
                view.position(),
                view.planner_target(),
                if plant.doors_closed { "closed" } else { "open" },
                view.queue().as_slice(),
            );
            next_report += Duration::from_secs(1);
        }

        if running.view().emergency_stopped() && pending.peek().is_none() {
            warn!("emergency stop latched, ending simulation");
            break;
        }
        thread::sleep(Duration::from_millis(5));
    }

    // ── 4. Shutdown ──────────────────────────────────────────
    let outcome = running.stop();
    plant_shutdown.store(true, Ordering::Release);
    if plant.join().is_err() {
        bail!("plant thread panicked");
    }

    let plant = car.snapshot();
    info!(
        "Finished after {} ms at {} cm",
        plant.elapsed_ms, plant.position
    );
    match outcome {
        Err(Error::Safety(requirement)) => {
            bail!("car halted by the safety monitor: {requirement}")
        }
        other => other.context("stopping core"),
    }
}
