//! Integration tests for the console → mailbox → FSM → heater pipeline.
//!
//! The controller is built exactly as `main` builds it, but with scripted
//! hardware and manually ticked clocks, and is driven on the test thread
//! with `dispatch_pending`.

use reflow::app::console::Console;
use reflow::app::events::{AppEvent, StartRejection};
use reflow::app::service::{self, ReflowParts, ReflowSystem};
use reflow::config::SystemConfig;
use reflow::error::{SafetyFault, ThermocoupleError};
use reflow::fsm::StateId;
use reflow::time_event::ManualTickSource;

use crate::mock_hw::{HeaterCall, MockHeater, RecordingSink, ScriptedThermocouple};

struct Rig {
    system: ReflowSystem,
    console: Console,
    thermocouple: ScriptedThermocouple,
    heater: MockHeater,
    sink: RecordingSink,
}

impl Rig {
    fn new() -> Self {
        Self::with_config(SystemConfig::default())
    }

    fn with_config(config: SystemConfig) -> Self {
        let thermocouple = ScriptedThermocouple::at(25.0);
        let heater = MockHeater::new();
        let sink = RecordingSink::new();
        let mut system = service::build(
            config,
            ReflowParts {
                thermocouple: Box::new(thermocouple.clone()),
                heater: Box::new(heater.clone()),
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
            thermocouple,
            heater,
            sink,
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

    fn sample(&mut self) {
        self.system.clocks.sample.tick();
        self.system.active.dispatch_pending();
    }

    fn phase_tick(&mut self) {
        self.system.clocks.phase.tick();
        self.system.active.dispatch_pending();
    }

    fn setpoint(&self) -> f32 {
        self.system.status.snapshot().setpoint_c
    }
}

// ── Start ─────────────────────────────────────────────────────

#[test]
fn start_enters_preheat_and_heats() {
    let mut rig = Rig::new();
    assert_eq!(rig.state(), StateId::Idle);

    let out = rig.command("reflow start");
    assert_eq!(out, "Posted START signal to reflow active object.\n");
    assert_eq!(rig.state(), StateId::Preheat);
    assert!(rig.heater.is_running());

    rig.sample();
    // P-only default: Kp=10 × (100 − 25).
    assert_eq!(rig.heater.last_command(), Some(750.0));
    assert_eq!(rig.sink.telemetry().len(), 1);
}

#[test]
fn start_rejected_while_oven_is_hot() {
    let mut rig = Rig::new();
    rig.thermocouple.set(40.0);
    rig.command("start");

    assert_eq!(rig.state(), StateId::Idle);
    assert!(!rig.heater.calls().contains(&HeaterCall::Start));
    assert!(rig.sink.events().iter().any(|e| matches!(
        e,
        AppEvent::StartRejected(StartRejection::TooHot { limit_c, .. }) if *limit_c == 35.0
    )));
}

#[test]
fn start_rejected_on_sensor_fault() {
    let mut rig = Rig::new();
    rig.thermocouple.fail(ThermocoupleError::ShortToGround);
    rig.command("start");

    assert_eq!(rig.state(), StateId::Idle);
    assert!(rig.sink.events().contains(&AppEvent::StartRejected(
        StartRejection::SensorFault(ThermocoupleError::ShortToGround)
    )));
    let status = rig.command("status");
    assert!(status.contains("Oven temperature read error: SHORT_GND"));
}

// ── Phase progression ─────────────────────────────────────────

#[test]
fn reaching_preheat_target_enters_soak_and_ramps() {
    let mut rig = Rig::new();
    rig.command("start");

    rig.thermocouple.set(99.0);
    rig.sample();
    assert_eq!(rig.state(), StateId::Soak);
    assert!(rig.system.clocks.phase.is_armed(rig.system.clocks.phase_timer));

    // 100 → 150 C over 120 s at 0.5 s per sample.
    let step = 50.0 / 240.0;
    let before = rig.setpoint();
    rig.sample();
    assert!((rig.setpoint() - before - step).abs() < 1e-3);
}

#[test]
fn soak_ends_after_its_duration_in_ticks() {
    let mut rig = Rig::new();
    rig.command("start");
    rig.thermocouple.set(100.0);
    rig.sample();
    assert_eq!(rig.state(), StateId::Soak);

    for _ in 0..119 {
        rig.phase_tick();
    }
    assert_eq!(rig.state(), StateId::Soak);
    rig.phase_tick();
    assert_eq!(rig.state(), StateId::RampUp);
    assert!((rig.setpoint() - 215.0).abs() < f32::EPSILON);
}

#[test]
fn hold_setpoint_never_passes_target() {
    let mut rig = Rig::new();
    rig.command("start");
    rig.thermocouple.set(100.0);
    rig.sample();

    for _ in 0..400 {
        rig.thermocouple.set(rig.setpoint());
        rig.sample();
        assert!(rig.setpoint() <= 150.0);
    }
    assert!((rig.setpoint() - 150.0).abs() < f32::EPSILON);
    assert_eq!(rig.state(), StateId::Soak);
}

// ── Stop and aborts ───────────────────────────────────────────

#[test]
fn stop_turns_heater_off_and_disarms_timers() {
    let mut rig = Rig::new();
    rig.command("start");
    rig.thermocouple.set(100.0);
    rig.sample();
    assert_eq!(rig.state(), StateId::Soak);

    rig.command("stop");
    assert_eq!(rig.state(), StateId::Idle);
    let calls = rig.heater.calls();
    assert_eq!(
        &calls[calls.len() - 2..],
        &[HeaterCall::SetCommand(0.0), HeaterCall::Stop]
    );
    let clocks = &rig.system.clocks;
    assert!(!clocks.sample.is_armed(clocks.sample_timer));
    assert!(!clocks.phase.is_armed(clocks.phase_timer));

    // A stray tick after the stop does nothing.
    let n = rig.heater.calls().len();
    rig.sample();
    assert_eq!(rig.heater.calls().len(), n);
}

#[test]
fn sensor_fault_aborts_within_one_sample() {
    let mut rig = Rig::new();
    rig.command("start");
    rig.sample();
    assert!(rig.heater.last_command().unwrap() > 0.0);

    rig.thermocouple.fail(ThermocoupleError::OpenCircuit);
    rig.sample();

    assert_eq!(rig.state(), StateId::Idle);
    assert_eq!(rig.heater.last_command(), Some(0.0));
    assert!(!rig.heater.is_running());
    let events = rig.sink.events();
    assert!(events.contains(&AppEvent::FaultDetected(SafetyFault::SensorFault.mask())));
    assert!(events.contains(&AppEvent::RunAborted {
        state: StateId::Preheat,
        faults: SafetyFault::SensorFault.mask(),
    }));
}

#[test]
fn over_temperature_aborts_the_run() {
    let mut config = SystemConfig::default();
    config.max_temperature_c = 230.0;
    let mut rig = Rig::with_config(config);
    rig.command("start");
    rig.thermocouple.set(240.0);
    rig.sample();

    assert_eq!(rig.state(), StateId::Idle);
    assert!(rig.sink.events().contains(&AppEvent::FaultDetected(
        SafetyFault::OverTemperature.mask()
    )));

    // Latched until a good reading below the limit is seen.
    rig.command("start");
    assert_eq!(rig.state(), StateId::Idle);
}

// ── Gains ─────────────────────────────────────────────────────

#[test]
fn set_gains_takes_effect_on_next_sample() {
    let mut rig = Rig::new();
    let out = rig.command("reflow set kp 20 tau 2");
    assert!(out.contains("Updated Kp to 20.00"));
    assert_eq!(rig.system.status.snapshot().gains.kp, 20.0);
    assert_eq!(rig.system.status.snapshot().gains.tau, 2.0);

    rig.command("start");
    rig.sample();
    assert_eq!(rig.heater.last_command(), Some(1500.0));
}

#[test]
fn status_reports_state_and_profile() {
    let mut rig = Rig::new();
    rig.command("start");
    rig.sample();
    let out = rig.command("status");
    assert!(out.contains("State: Preheat"));
    assert!(out.contains("Oven temperature: 25.00"));
    assert!(out.contains("Reach temperature: 100.0 C"));
}
