//! Unified error types for the reflow oven firmware.
//!
//! A single `Error` enum that every subsystem converts into, so the
//! console and the boot sequence handle failures the same way.  All
//! variants are `Copy` so they can be passed through the active-object
//! runtime and the state machine without allocation.
//!
//! | Variant             | Raised by                     | Policy                 |
//! |---------------------|-------------------------------|------------------------|
//! | `Argument`          | active-object construction    | fatal at boot          |
//! | `ResourceExhausted` | thread / mailbox / timer slot | fatal at boot          |
//! | `TimedOut`          | `post` into a full mailbox    | caller decides         |
//! | `Sensor`            | thermocouple read             | safety shutdown + log  |
//! | `Actuator`          | PWM write                     | logged                 |
//! | `Config`            | config validation             | fatal at boot          |
//! | `Command`           | console parsing               | reported to the user   |

use core::fmt;

use crate::app::commands::CommandError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Bad constructor input (e.g. an active object without a handler).
    Argument(&'static str),
    /// A fixed-capacity resource could not be allocated.
    ResourceExhausted(&'static str),
    /// A mailbox was full; the event was not enqueued.
    TimedOut,
    /// The thermocouple could not be read.
    Sensor(ThermocoupleError),
    /// The heater output could not be driven.
    Actuator(ActuatorError),
    /// Configuration is invalid.
    Config(&'static str),
    /// A console command could not be parsed.
    Command(CommandError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Argument(msg) => write!(f, "bad argument: {msg}"),
            Self::ResourceExhausted(what) => write!(f, "resource exhausted: {what}"),
            Self::TimedOut => write!(f, "mailbox full"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Command(e) => write!(f, "command: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Thermocouple errors
// ---------------------------------------------------------------------------

/// Faults reported by the thermocouple digitiser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThermocoupleError {
    /// Thermocouple shorted to VCC.
    ShortToSupply,
    /// Thermocouple shorted to GND.
    ShortToGround,
    /// Thermocouple connection is open.
    OpenCircuit,
    /// The SPI transfer clocked in nothing but zeros.
    AllZeros,
    /// The SPI transfer itself failed.
    TransferFailure,
}

impl ThermocoupleError {
    /// Short, fixed name used in status output.
    pub const fn name(self) -> &'static str {
        match self {
            Self::ShortToSupply => "SHORT_VCC",
            Self::ShortToGround => "SHORT_GND",
            Self::OpenCircuit => "OPEN",
            Self::AllZeros => "ZEROS",
            Self::TransferFailure => "SPI_FAIL",
        }
    }
}

impl fmt::Display for ThermocoupleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShortToSupply => write!(f, "thermocouple shorted to supply"),
            Self::ShortToGround => write!(f, "thermocouple shorted to ground"),
            Self::OpenCircuit => write!(f, "thermocouple open circuit"),
            Self::AllZeros => write!(f, "digitiser returned all zeros"),
            Self::TransferFailure => write!(f, "SPI transfer failed"),
        }
    }
}

impl From<ThermocoupleError> for Error {
    fn from(e: ThermocoupleError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// PWM duty-cycle write failed.
    PwmWriteFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PwmWriteFailed => write!(f, "PWM write failed"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Safety faults
// ---------------------------------------------------------------------------

/// Conditions latched by the safety supervisor.  Each one aborts a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SafetyFault {
    /// The last thermocouple read failed.
    SensorFault = 0b0000_0001,
    /// Oven temperature above the configured maximum.
    OverTemperature = 0b0000_0010,
}

impl SafetyFault {
    /// Return the bitmask for this fault.
    pub const fn mask(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for SafetyFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SensorFault => write!(f, "sensor fault"),
            Self::OverTemperature => write!(f, "over temperature"),
        }
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

// ---------------------------------------------------------------------------
// Fatal errors
// ---------------------------------------------------------------------------

/// Stop the device after an unrecoverable configuration fault.
///
/// Capacities are static, so reaching this means the build is misconfigured.
/// On the target the watchdog resets the board; on the host the panic takes
/// the process down.
#[cold]
pub fn halt(reason: &str) -> ! {
    log::error!("FATAL: {reason}, halting");
    panic!("halted: {reason}");
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
