//! Shared mutable context threaded through every FSM action.
//!
//! `ReflowContext` is the single struct that state actions read from and
//! write to: profile progress (setpoint, ramp step), the PID controller,
//! the safety supervisor, the hardware ports, the controller's timers and
//! a handle for posting events back to itself.  Think of it as the
//! "blackboard" in a blackboard architecture.  It is owned by the
//! controller's active object, so only that object's thread touches it.

use std::sync::Arc;

use log::{error, warn};

use crate::active::{ActiveRef, Event, Signal};
use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, HeaterPort, ThermocouplePort};
use crate::config::SystemConfig;
use crate::control::PidController;
use crate::error::Result;
use crate::profile::{Phase, PhaseKind};
use crate::safety::SafetySupervisor;
use crate::time_event::{TimeEventId, TimeEventService};

use super::{ReflowPayload, SAMPLE_TICK, StateId, TIME_ELAPSED};

// ---------------------------------------------------------------------------
// Timers
// ---------------------------------------------------------------------------

/// The controller's two time events and the clocks that drive them.
///
/// - *phase*: one-shot hold-phase timer on the slow (1 s) clock.
/// - *sample*: periodic control-loop timer on the sample-period clock.
#[derive(Debug, Clone)]
pub struct Clocks {
    pub phase: Arc<TimeEventService>,
    pub phase_timer: TimeEventId,
    pub sample: Arc<TimeEventService>,
    pub sample_timer: TimeEventId,
}

impl Clocks {
    /// Register the controller's timers on the two clocks.  Startup only.
    pub fn register(
        mut phase: TimeEventService,
        mut sample: TimeEventService,
        owner: &ActiveRef<ReflowPayload>,
    ) -> Result<Self> {
        let phase_timer = phase.register(owner.clone(), Event::new(TIME_ELAPSED))?;
        let sample_timer = sample.register(owner.clone(), Event::new(SAMPLE_TICK))?;
        Ok(Self {
            phase: Arc::new(phase),
            phase_timer,
            sample: Arc::new(sample),
            sample_timer,
        })
    }
}

// ---------------------------------------------------------------------------
// Reach detection
// ---------------------------------------------------------------------------

/// Direction the oven has to travel to reach a phase target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Approach {
    #[default]
    Rising,
    Falling,
}

impl Approach {
    /// Heating unless the oven is already above the target.
    pub fn toward(target_c: f32, current_c: Option<f32>) -> Self {
        match current_c {
            Some(t) if t > target_c => Self::Falling,
            _ => Self::Rising,
        }
    }

    /// Within `tolerance_c` of the target, or already past it.
    pub fn reached(self, reading_c: f32, target_c: f32, tolerance_c: f32) -> bool {
        if (reading_c - target_c).abs() <= tolerance_c {
            return true;
        }
        match self {
            Self::Rising => reading_c > target_c,
            Self::Falling => reading_c < target_c,
        }
    }
}

/// Profile slot backing a controller state.
pub fn phase_kind(state: StateId) -> Option<PhaseKind> {
    match state {
        StateId::Idle => None,
        StateId::Preheat => Some(PhaseKind::Preheat),
        StateId::Soak => Some(PhaseKind::Soak),
        StateId::RampUp => Some(PhaseKind::RampUp),
        StateId::Peak => Some(PhaseKind::Peak),
        StateId::Cooldown => Some(PhaseKind::Cooldown),
    }
}

// ---------------------------------------------------------------------------
// ReflowContext
// ---------------------------------------------------------------------------

/// The blackboard passed to every state action.
pub struct ReflowContext {
    /// Mirrors the engine's current state (updated on every transition).
    pub state: StateId,
    pub config: SystemConfig,

    // ── Profile progress ──────────────────────────────────────
    /// Instantaneous PID setpoint (°C).
    pub setpoint_c: f32,
    /// Setpoint increment per sample in hold phases (°C).
    pub step_c: f32,
    pub approach: Approach,
    /// `TemperatureReached` already posted for this phase entry.
    pub reach_posted: bool,
    /// Last good thermocouple reading.
    pub last_temperature_c: Option<f32>,
    /// Last command written to the heater.
    pub last_command: f32,

    // ── Collaborators ─────────────────────────────────────────
    pub pid: PidController,
    pub safety: SafetySupervisor,
    pub thermocouple: Box<dyn ThermocouplePort>,
    pub heater: Box<dyn HeaterPort>,
    pub sink: Box<dyn EventSink>,
    pub clocks: Clocks,
    /// Posting handle to the controller itself.
    pub me: ActiveRef<ReflowPayload>,
}

impl ReflowContext {
    pub fn new(
        config: SystemConfig,
        thermocouple: Box<dyn ThermocouplePort>,
        heater: Box<dyn HeaterPort>,
        sink: Box<dyn EventSink>,
        clocks: Clocks,
        me: ActiveRef<ReflowPayload>,
    ) -> Self {
        Self {
            state: StateId::Idle,
            pid: PidController::new(&config.pid),
            safety: SafetySupervisor::new(&config),
            config,
            setpoint_c: 0.0,
            step_c: 0.0,
            approach: Approach::Rising,
            reach_posted: false,
            last_temperature_c: None,
            last_command: 0.0,
            thermocouple,
            heater,
            sink,
            clocks,
            me,
        }
    }

    /// Forget the progress of any previous run.
    pub fn reset_run(&mut self) {
        self.setpoint_c = 0.0;
        self.step_c = 0.0;
        self.approach = Approach::Rising;
        self.reach_posted = false;
    }

    /// Profile phase for the current state (`None` in Idle).
    pub fn current_phase(&self) -> Option<Phase> {
        phase_kind(self.state).map(|k| *self.config.profile.phase(k))
    }

    // ── Heater ────────────────────────────────────────────────

    pub fn heater_on(&mut self) {
        if let Err(e) = self.heater.start() {
            error!("{}: heater start failed: {e}", self.state);
        }
    }

    /// Output stage off and command forced to zero.
    pub fn heater_off(&mut self) {
        self.last_command = 0.0;
        if let Err(e) = self.heater.set_command(0.0) {
            error!("{}: heater zero failed: {e}", self.state);
        }
        if let Err(e) = self.heater.stop() {
            error!("{}: heater stop failed: {e}", self.state);
        }
    }

    pub fn drive_heater(&mut self, command: f32) {
        self.last_command = command;
        if let Err(e) = self.heater.set_command(command) {
            warn!("{}: heater command {command:.0} not applied: {e}", self.state);
        }
    }

    // ── Timers ────────────────────────────────────────────────

    /// Start the periodic control-loop tick.  Fails if the sample clock
    /// cannot start its tick source.
    pub fn arm_sample_timer(&self) -> Result<()> {
        self.clocks.sample.try_arm(self.clocks.sample_timer, 1, 1)
    }

    pub fn arm_phase_timer(&self, ticks: u32) {
        self.clocks.phase.arm(self.clocks.phase_timer, ticks, 0);
    }

    pub fn disarm_timers(&self) {
        self.clocks.phase.disarm(self.clocks.phase_timer);
        self.clocks.sample.disarm(self.clocks.sample_timer);
    }

    pub fn timers_armed(&self) -> bool {
        self.clocks.phase.is_armed(self.clocks.phase_timer)
            || self.clocks.sample.is_armed(self.clocks.sample_timer)
    }

    // ── Events ────────────────────────────────────────────────

    /// Post a payload-free event to this controller.
    pub fn post_self(&self, signal: Signal) -> Result<()> {
        self.me.post(Event::new(signal))
    }

    pub fn emit(&mut self, event: &AppEvent) {
        self.sink.emit(event);
    }
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------
