//! End-to-end reflow runs against the simulated oven.
//!
//! The clocks are ticked by hand: one sample-clock tick per 0.5 s sample
//! and one phase-clock tick every second sample, so simulated time and
//! timer time advance together.

use reflow::adapters::SimulatedOven;
use reflow::app::console::Console;
use reflow::app::events::AppEvent;
use reflow::app::service::{self, ReflowParts, ReflowSystem};
use reflow::config::SystemConfig;
use reflow::error::ThermocoupleError;
use reflow::fsm::StateId;
use reflow::time_event::ManualTickSource;

use crate::mock_hw::RecordingSink;

/// Samples per phase-clock tick (1 s tick / 0.5 s sample period).
const SAMPLES_PER_TICK: u64 = 2;

/// Generous bound on a whole run (cooldown dominates).
const MAX_RUN_SAMPLES: u64 = 4_000;

struct Bench {
    system: ReflowSystem,
    console: Console,
    oven: SimulatedOven,
    sink: RecordingSink,
    samples: u64,
}

impl Bench {
    fn new() -> Self {
        let oven = SimulatedOven::default();
        let sink = RecordingSink::new();
        let mut system = service::build(
            SystemConfig::default(),
            ReflowParts {
                thermocouple: Box::new(oven.clone()),
                heater: Box::new(oven.clone()),
                sink: Box::new(sink.clone()),
                phase_ticks: Box::new(ManualTickSource::new()),
                sample_ticks: Box::new(ManualTickSource::new()),
            },
        )
        .unwrap();
        system.active.dispatch_pending();
        let console = system.console();
        Self {
            system,
            console,
            oven,
            sink,
            samples: 0,
        }
    }

    fn state(&self) -> StateId {
        self.system.active.handler().state()
    }

    fn command(&mut self, line: &str) -> String {
        let out = self.console.execute_line(line);
        self.system.active.dispatch_pending();
        out
    }

    /// Advance simulated time by one sample period.
    fn step(&mut self) {
        self.samples += 1;
        self.system.clocks.sample.tick();
        if self.samples % SAMPLES_PER_TICK == 0 {
            self.system.clocks.phase.tick();
        }
        self.system.active.dispatch_pending();
    }

    /// Step until `done` holds.  Returns the samples taken, or `None` if
    /// `max` samples were not enough.
    fn run_until(&mut self, max: u64, done: impl Fn(&Self) -> bool) -> Option<u64> {
        for n in 1..=max {
            self.step();
            if done(self) {
                return Some(n);
            }
        }
        None
    }
}

#[test]
fn full_profile_visits_every_phase_and_returns_to_idle() {
    let mut bench = Bench::new();
    bench.command("reflow start");
    assert_eq!(bench.state(), StateId::Preheat);

    let samples = bench.run_until(MAX_RUN_SAMPLES, |b| b.state() == StateId::Idle);
    assert!(samples.is_some(), "run did not finish");

    assert_eq!(
        bench.sink.states_entered(),
        vec![
            StateId::Idle,
            StateId::Preheat,
            StateId::Soak,
            StateId::RampUp,
            StateId::Peak,
            StateId::Cooldown,
            StateId::Idle,
        ]
    );
    assert!(!bench.oven.is_heating());
    assert_eq!(bench.oven.applied_command(), 0.0);
    assert!(!bench.system.active.handler().context().timers_armed());
}

#[test]
fn soak_lasts_its_configured_duration() {
    let mut bench = Bench::new();
    bench.command("start");
    bench
        .run_until(MAX_RUN_SAMPLES, |b| b.state() == StateId::Soak)
        .unwrap();
    let soak_samples = bench
        .run_until(MAX_RUN_SAMPLES, |b| b.state() != StateId::Soak)
        .unwrap();

    // 120 s at 0.5 s per sample; the phase tick can land up to one
    // sample early depending on where the phase started.
    assert!((239..=241).contains(&soak_samples), "soak took {soak_samples} samples");
    assert_eq!(bench.state(), StateId::RampUp);
}

#[test]
fn telemetry_tracks_the_oven_during_a_run() {
    let mut bench = Bench::new();
    bench.command("start");
    bench
        .run_until(MAX_RUN_SAMPLES, |b| b.state() == StateId::RampUp)
        .unwrap();

    let telemetry = bench.sink.telemetry();
    assert!(!telemetry.is_empty());
    for t in &telemetry {
        assert!((0.0..=4095.0).contains(&t.command));
        assert!(t.setpoint_c <= 215.0);
    }
    // Soak setpoint rises monotonically.
    let soak: Vec<f32> = telemetry
        .iter()
        .filter(|t| t.state == StateId::Soak)
        .map(|t| t.setpoint_c)
        .collect();
    assert!(soak.windows(2).all(|w| w[1] >= w[0]));
}

#[test]
fn injected_thermocouple_fault_aborts_mid_soak() {
    let mut bench = Bench::new();
    bench.command("start");
    bench
        .run_until(MAX_RUN_SAMPLES, |b| b.state() == StateId::Soak)
        .unwrap();
    assert!(bench.oven.applied_command() > 0.0);

    bench.oven.inject_fault(Some(ThermocoupleError::OpenCircuit));
    bench.step();

    assert_eq!(bench.state(), StateId::Idle);
    assert_eq!(bench.oven.applied_command(), 0.0);
    assert!(bench
        .sink
        .events()
        .iter()
        .any(|e| matches!(e, AppEvent::RunAborted { state: StateId::Soak, .. })));
}

#[test]
fn second_start_refused_until_oven_cools() {
    let mut bench = Bench::new();
    bench.command("start");
    bench
        .run_until(MAX_RUN_SAMPLES, |b| b.state() == StateId::Peak)
        .unwrap();
    bench.command("stop");
    assert_eq!(bench.state(), StateId::Idle);

    bench.command("start");
    assert_eq!(bench.state(), StateId::Idle);

    bench.oven.set_temperature(30.0);
    bench.command("start");
    assert_eq!(bench.state(), StateId::Preheat);
}
