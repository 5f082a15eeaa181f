//! Concrete state actions and table builder.
//!
//! Every table cell is a plain `fn` pointer: no closures, no dynamic
//! dispatch, no heap.  This is the classic embedded C FSM pattern
//! expressed in safe Rust.
//!
//! ```text
//!          [start, T < cooldown target]
//!  IDLE ───────────────────────────────▶ PREHEAT ──[reached]──▶ SOAK
//!    ▲                                                           │
//!    │                                                      [elapsed]
//!    │                                                           ▼
//!    │                                                        RAMP_UP
//!    │                                                           │
//!    │                                                       [reached]
//!    │                                                           ▼
//!    └──────────[reached]────── COOLDOWN ◀──[elapsed]────────── PEAK
//!
//!  Any running state ──[stop | safety abort]──▶ IDLE
//! ```
//!
//! Running states also handle `SAMPLE_TICK` (the control loop) and every
//! state handles `SET_GAINS`.

use log::{debug, error, info, warn};

use super::context::{Approach, ReflowContext};
use super::{
    ReflowEvent, ReflowPayload, SAMPLE_TICK, SET_GAINS, START_REQUESTED, STOP_REQUESTED,
    StateDescriptor, StateId, Status, TEMPERATURE_REACHED, TIME_ELAPSED,
};
use crate::active::Signal;
use crate::app::events::{AppEvent, StartRejection, TelemetryData};
use crate::profile::Phase;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Idle
        StateDescriptor::new(StateId::Idle)
            .on(Signal::INIT, idle_init)
            .on(Signal::ENTRY, idle_entry)
            .on(START_REQUESTED, idle_start)
            .on(SET_GAINS, set_gains),
        // Index 1: Preheat
        running(StateId::Preheat)
            .on(Signal::ENTRY, preheat_entry)
            .on(TEMPERATURE_REACHED, next_phase),
        // Index 2: Soak
        running(StateId::Soak)
            .on(Signal::ENTRY, hold_entry)
            .on(TIME_ELAPSED, next_phase),
        // Index 3: RampUp
        running(StateId::RampUp)
            .on(Signal::ENTRY, reach_entry)
            .on(TEMPERATURE_REACHED, next_phase),
        // Index 4: Peak
        running(StateId::Peak)
            .on(Signal::ENTRY, hold_entry)
            .on(TIME_ELAPSED, next_phase),
        // Index 5: Cooldown
        running(StateId::Cooldown)
            .on(Signal::ENTRY, reach_entry)
            .on(TEMPERATURE_REACHED, next_phase),
    ]
}

/// Cells shared by every non-Idle state.
fn running(id: StateId) -> StateDescriptor {
    StateDescriptor::new(id)
        .on(STOP_REQUESTED, stop)
        .on(SAMPLE_TICK, sample)
        .on(SET_GAINS, set_gains)
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE
// ═══════════════════════════════════════════════════════════════════════════

fn idle_init(ctx: &mut ReflowContext, _e: &ReflowEvent) -> Status {
    ctx.reset_run();
    ctx.last_temperature_c = None;
    info!("reflow: initialised");
    Status::InitialTransition(StateId::Idle)
}

/// The one place every run ends: heater off, PID memory cleared, timers
/// disarmed.
fn idle_entry(ctx: &mut ReflowContext, _e: &ReflowEvent) -> Status {
    ctx.heater_off();
    ctx.pid.reset();
    ctx.disarm_timers();
    ctx.reset_run();
    info!("Idle: heater off, waiting for start");
    Status::Handled
}

fn idle_start(ctx: &mut ReflowContext, _e: &ReflowEvent) -> Status {
    let reading = ctx.thermocouple.read_temperature();
    let faults = ctx.safety.evaluate(reading);

    let rejection = match reading {
        Err(e) => Some(StartRejection::SensorFault(e)),
        Ok(_) if faults != 0 => Some(StartRejection::FaultLatched(faults)),
        Ok(temp) => {
            ctx.last_temperature_c = Some(temp);
            let limit = ctx.config.profile.cooldown_target_c();
            (temp >= limit).then_some(StartRejection::TooHot {
                temperature_c: temp,
                limit_c: limit,
            })
        }
    };

    if let Some(reason) = rejection {
        match reason {
            StartRejection::SensorFault(e) => {
                warn!("Idle: start refused, thermocouple read failed: {e}");
            }
            StartRejection::TooHot {
                temperature_c,
                limit_c,
            } => warn!(
                "Idle: start refused, oven at {temperature_c:.1} C (must be below {limit_c:.1} C)"
            ),
            StartRejection::FaultLatched(mask) => {
                warn!("Idle: start refused, safety faults 0b{mask:08b} latched");
            }
        }
        ctx.emit(&AppEvent::StartRejected(reason));
        return Status::Handled;
    }

    info!("Idle: starting reflow run");
    Status::Transitioned(StateId::Preheat)
}

// ═══════════════════════════════════════════════════════════════════════════
//  Phase entries
// ═══════════════════════════════════════════════════════════════════════════

/// Preheat is the first running state: start the control loop, switch the
/// heater on, then behave like any other reach phase.  Without a running
/// sample clock nothing would regulate the heater, so the run ends there.
fn preheat_entry(ctx: &mut ReflowContext, e: &ReflowEvent) -> Status {
    if let Err(err) = ctx.arm_sample_timer() {
        error!("{}: control loop did not start ({err}), back to Idle", ctx.state);
        ctx.heater_off();
        return Status::Transitioned(StateId::Idle);
    }
    ctx.heater_on();
    reach_entry(ctx, e)
}

/// Reach phase: drive straight at the target.
fn reach_entry(ctx: &mut ReflowContext, _e: &ReflowEvent) -> Status {
    let Some(phase) = ctx.current_phase() else {
        return Status::Handled;
    };
    let target = phase.target_c();
    ctx.setpoint_c = target;
    ctx.step_c = 0.0;
    ctx.approach = Approach::toward(target, ctx.last_temperature_c);
    ctx.reach_posted = false;
    info!("{}: reach {target:.1} C ({:?})", ctx.state, ctx.approach);
    Status::Handled
}

/// Hold phase: ramp the setpoint from where it is to the target over the
/// phase duration, and arm the one-shot phase timer.
fn hold_entry(ctx: &mut ReflowContext, _e: &ReflowEvent) -> Status {
    let Some(Phase::HoldDuration {
        target_c,
        duration_secs,
    }) = ctx.current_phase()
    else {
        error!("{}: hold entry on a non-hold phase", ctx.state);
        return Status::Handled;
    };

    let samples = duration_secs as f32 / ctx.pid.sample_period_secs();
    ctx.step_c = (target_c - ctx.setpoint_c) / samples;
    ctx.reach_posted = false;

    let tick_ms = ctx.clocks.phase.tick_period().as_millis().max(1);
    let ticks = (u128::from(duration_secs) * 1000).div_ceil(tick_ms);
    ctx.arm_phase_timer(u32::try_from(ticks).unwrap_or(u32::MAX));

    info!(
        "{}: hold {target_c:.1} C for {duration_secs} s, {:.1} -> {target_c:.1} C at {:.4} C/sample",
        ctx.state, ctx.setpoint_c, ctx.step_c
    );
    Status::Handled
}

// ═══════════════════════════════════════════════════════════════════════════
//  Shared running-state actions
// ═══════════════════════════════════════════════════════════════════════════

fn next_phase(ctx: &mut ReflowContext, _e: &ReflowEvent) -> Status {
    Status::Transitioned(ctx.state.next())
}

fn stop(ctx: &mut ReflowContext, _e: &ReflowEvent) -> Status {
    info!("{}: stop requested", ctx.state);
    Status::Transitioned(StateId::Idle)
}

fn set_gains(ctx: &mut ReflowContext, e: &ReflowEvent) -> Status {
    let Some(ReflowPayload::Gains(updates)) = e.payload() else {
        warn!("{}: SET_GAINS without gains", ctx.state);
        return Status::Handled;
    };
    let gains = updates
        .iter()
        .fold(ctx.pid.gains(), |g, (param, value)| g.with(*param, *value));
    ctx.pid.set_gains(gains);
    info!(
        "{}: gains Kp={} Ki={} Kd={} Tau={}",
        ctx.state, gains.kp, gains.ki, gains.kd, gains.tau
    );
    Status::Handled
}

/// One control-loop sample.
fn sample(ctx: &mut ReflowContext, _e: &ReflowEvent) -> Status {
    let reading = ctx.thermocouple.read_temperature();
    let before = ctx.safety.faults();
    let faults = ctx.safety.evaluate(reading);
    if faults != 0 {
        return abort(ctx, before, faults);
    }
    // No faults means the read succeeded.
    let Ok(temp) = reading else {
        return Status::Handled;
    };
    ctx.last_temperature_c = Some(temp);

    match ctx.current_phase() {
        Some(Phase::ReachTemperature { target_c }) => {
            let tolerance = ctx.config.reach_tolerance_c;
            if !ctx.reach_posted && ctx.approach.reached(temp, target_c, tolerance) {
                match ctx.post_self(TEMPERATURE_REACHED) {
                    Ok(()) => {
                        ctx.reach_posted = true;
                        info!("{}: reached {target_c:.1} C (read {temp:.1} C)", ctx.state);
                    }
                    Err(e) => warn!("{}: TEMPERATURE_REACHED not posted: {e}", ctx.state),
                }
            }
        }
        Some(Phase::HoldDuration { target_c, .. }) => {
            let next = ctx.setpoint_c + ctx.step_c;
            ctx.setpoint_c = if ctx.step_c >= 0.0 {
                next.min(target_c)
            } else {
                next.max(target_c)
            };
        }
        None => {}
    }

    let command = ctx.pid.compute(ctx.setpoint_c, temp);
    ctx.drive_heater(command);

    let telemetry = TelemetryData {
        state: ctx.state,
        setpoint_c: ctx.setpoint_c,
        temperature_c: temp,
        proportional: ctx.pid.proportional(),
        integral: ctx.pid.integral(),
        derivative: ctx.pid.derivative(),
        command,
    };
    debug!("{}: sp={:.2} T={temp:.2} u={command:.0}", ctx.state, ctx.setpoint_c);
    ctx.emit(&AppEvent::Telemetry(telemetry));
    Status::Handled
}

/// Safety abort: heater command to zero right now, then stop the run.
///
/// The normal path posts `STOP_REQUESTED` so the stop goes through the
/// mailbox like any other.  If the mailbox is full the abort cannot wait,
/// so the action transitions to Idle itself.
fn abort(ctx: &mut ReflowContext, before: u8, faults: u8) -> Status {
    ctx.drive_heater(0.0);
    if faults & !before != 0 {
        ctx.emit(&AppEvent::FaultDetected(faults));
    }
    ctx.emit(&AppEvent::RunAborted {
        state: ctx.state,
        faults,
    });
    match ctx.safety.sensor_error() {
        Some(e) => error!("{}: thermocouple fault ({}), aborting run", ctx.state, e.name()),
        None => error!("{}: safety faults 0b{faults:08b}, aborting run", ctx.state),
    }

    match ctx.post_self(STOP_REQUESTED) {
        Ok(()) => Status::Handled,
        Err(e) => {
            error!("{}: STOP_REQUESTED not posted ({e}), stopping directly", ctx.state);
            Status::Transitioned(StateId::Idle)
        }
    }
}
