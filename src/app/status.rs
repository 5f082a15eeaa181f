//! Controller status snapshot.
//!
//! The controller publishes a [`ReflowStatus`] after every event it
//! handles.  The console reads it from any thread without talking to the
//! controller's mailbox, so `status` works even while the controller is
//! busy or its mailbox is full.

use core::cell::Cell;
use core::fmt;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use crate::config::SystemConfig;
use crate::control::PidGains;
use crate::error::{SafetyFault, ThermocoupleError};
use crate::fsm::StateId;
use crate::fsm::context::ReflowContext;

/// Point-in-time view of the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReflowStatus {
    pub state: StateId,
    pub setpoint_c: f32,
    /// Last good reading, if any.
    pub temperature_c: Option<f32>,
    pub command: f32,
    pub gains: PidGains,
    pub sample_period_secs: f32,
    pub out_min: f32,
    pub out_max: f32,
    pub faults: u8,
    pub sensor_error: Option<ThermocoupleError>,
}

impl ReflowStatus {
    /// Status before the controller has handled anything.
    pub fn initial(config: &SystemConfig) -> Self {
        Self {
            state: StateId::Idle,
            setpoint_c: 0.0,
            temperature_c: None,
            command: 0.0,
            gains: config.pid.gains,
            sample_period_secs: config.pid.sample_period_secs,
            out_min: config.pid.out_min,
            out_max: config.pid.out_max,
            faults: 0,
            sensor_error: None,
        }
    }

    pub fn capture(ctx: &ReflowContext) -> Self {
        let (out_min, out_max) = ctx.pid.limits();
        Self {
            state: ctx.state,
            setpoint_c: ctx.setpoint_c,
            temperature_c: ctx.last_temperature_c,
            command: ctx.last_command,
            gains: ctx.pid.gains(),
            sample_period_secs: ctx.pid.sample_period_secs(),
            out_min,
            out_max,
            faults: ctx.safety.faults(),
            sensor_error: ctx.safety.sensor_error(),
        }
    }
}

impl fmt::Display for ReflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let g = &self.gains;
        writeln!(
            f,
            "PID: Kp={:.2} Ki={:.2} Kd={:.2} Tau={:.2} Ts={:.2} s, output [{:.0}, {:.0}]",
            g.kp, g.ki, g.kd, g.tau, self.sample_period_secs, self.out_min, self.out_max
        )?;
        writeln!(
            f,
            "State: {} (setpoint {:.2} C, command {:.0})",
            self.state, self.setpoint_c, self.command
        )?;
        match (self.sensor_error, self.temperature_c) {
            (Some(e), _) => writeln!(f, "Oven temperature read error: {}", e.name())?,
            (None, Some(t)) => writeln!(f, "Oven temperature: {t:.2}")?,
            (None, None) => writeln!(f, "Oven temperature: not sampled yet")?,
        }
        if self.faults != 0 {
            let names: Vec<_> = [SafetyFault::SensorFault, SafetyFault::OverTemperature]
                .into_iter()
                .filter(|fault| self.faults & fault.mask() != 0)
                .map(|fault| fault.to_string())
                .collect();
            writeln!(f, "Faults: {}", names.join(", "))?;
        }
        Ok(())
    }
}

/// Latest published [`ReflowStatus`], readable from any thread.
pub struct StatusBoard {
    cell: Mutex<CriticalSectionRawMutex, Cell<ReflowStatus>>,
}

impl StatusBoard {
    pub fn new(initial: ReflowStatus) -> Self {
        Self {
            cell: Mutex::new(Cell::new(initial)),
        }
    }

    pub fn publish(&self, status: ReflowStatus) {
        self.cell.lock(|c| c.set(status));
    }

    pub fn snapshot(&self) -> ReflowStatus {
        self.cell.lock(Cell::get)
    }
}

impl fmt::Debug for StatusBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StatusBoard").field(&self.snapshot()).finish()
    }
}
