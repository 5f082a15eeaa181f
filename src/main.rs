//! Reflow oven controller: host entry point.
//!
//! Runs the full controller against a simulated oven and reads console
//! commands from stdin.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │   SimulatedOven (Thermocouple + Heater)    LogEventSink      │
//! │   ThreadTicker ×2 (phase / sample clocks)  stdin Console     │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ─────────────────────  │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │     ReflowController active object (own thread)        │  │
//! │  │     FSM · Safety · PID · TimeEvents                    │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `reflow-oven [config.json]`.  Log filtering follows `RUST_LOG`
//! (default `info`).

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use reflow::active::ThreadConfig;
use reflow::adapters::{LogEventSink, PlantParams, SimulatedOven};
use reflow::app::service::{self, CONTROLLER_NAME, ReflowParts};
use reflow::config::SystemConfig;
use reflow::drivers::ThreadTicker;

/// Controller thread stack.  The target runs in 2 KiB; host formatting
/// and logging need more.
const CONTROLLER_STACK_BYTES: usize = 64 * 1024;

fn load_config(path: Option<&Path>) -> Result<SystemConfig> {
    let Some(path) = path else {
        info!("Config: factory defaults");
        return Ok(SystemConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: SystemConfig = serde_json::from_str(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;
    info!("Config loaded from {}", path.display());
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("╔══════════════════════════════════════╗");
    info!("║  Reflow oven v{:<23}║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let arg = std::env::args_os().nth(1);
    let config = load_config(arg.as_deref().map(Path::new))?;

    let oven = SimulatedOven::new(PlantParams {
        step_secs: config.pid.sample_period_secs,
        max_command: config.pid.out_max,
        ..PlantParams::default()
    });
    let parts = ReflowParts {
        thermocouple: Box::new(oven.clone()),
        heater: Box::new(oven),
        sink: Box::new(LogEventSink::new()),
        phase_ticks: Box::new(ThreadTicker::new("phase-tick")),
        sample_ticks: Box::new(ThreadTicker::new("sample-tick")),
    };

    let system = service::build(config, parts).context("building reflow controller")?;
    let console = system
        .spawn(ThreadConfig::new(CONTROLLER_NAME).with_stack_size(CONTROLLER_STACK_BYTES))
        .context("starting reflow controller")?;

    info!("Reflow oven controller initialized.");
    info!("Enter command \"reflow start\" to start reflow process.");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line.context("reading console")?;
        stdout.write_all(console.execute_line(&line).as_bytes())?;
        stdout.flush()?;
    }

    info!("Console closed, exiting");
    Ok(())
}
