//! Outbound controller events.
//!
//! The reflow controller emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: write the log line the plotting
//! script reads, stream to a host, or record them in tests.

use crate::error::ThermocoupleError;
use crate::fsm::StateId;

/// Structured events emitted by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// One control-loop sample.
    Telemetry(TelemetryData),

    /// The FSM transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// A start request was refused.
    StartRejected(StartRejection),

    /// One or more safety faults were raised (bitmask).
    FaultDetected(u8),

    /// The run was aborted because of a safety fault.
    RunAborted { state: StateId, faults: u8 },
}

/// Why Idle refused to start a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StartRejection {
    /// The thermocouple could not be read.
    SensorFault(ThermocoupleError),
    /// The oven is still at or above the cooldown target.
    TooHot { temperature_c: f32, limit_c: f32 },
    /// A latched safety fault has not cleared yet.
    FaultLatched(u8),
}

/// Per-sample telemetry, in the field order of the plotting log line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryData {
    pub state: StateId,
    pub setpoint_c: f32,
    pub temperature_c: f32,
    pub proportional: f32,
    pub integral: f32,
    pub derivative: f32,
    pub command: f32,
}
