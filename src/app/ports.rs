//! Port traits: the hexagonal boundary between the controller and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ReflowController (domain)
//! ```
//!
//! Driven adapters (thermocouple digitiser, heater PWM, event sinks)
//! implement these traits.  The controller holds them as boxed trait
//! objects inside its context, so the domain core never touches hardware
//! directly and tests swap in recording fakes.
//!
//! All port errors are typed; callers must handle every variant.

use crate::error::{ActuatorError, ThermocoupleError};

// ───────────────────────────────────────────────────────────────
// Thermocouple port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the controller calls this once per sample.
pub trait ThermocouplePort: Send {
    /// Hot-junction temperature in °C.
    fn read_temperature(&mut self) -> Result<f32, ThermocoupleError>;
}

// ───────────────────────────────────────────────────────────────
// Heater port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the heating element.
pub trait HeaterPort: Send {
    /// Enable the output stage.
    fn start(&mut self) -> Result<(), ActuatorError>;

    /// Disable the output stage and force the duty to zero.
    fn stop(&mut self) -> Result<(), ActuatorError>;

    /// Apply a PID command.  Implementations clamp it to their range.
    fn set_command(&mut self, command: f32) -> Result<(), ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The controller emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink: Send {
    fn emit(&mut self, event: &super::events::AppEvent);
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &super::events::AppEvent) {}
}
