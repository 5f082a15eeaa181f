//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements                   | Connects to                |
//! |-------------|------------------------------|----------------------------|
//! | `log_sink`  | EventSink                    | `log` facade (plot lines)  |
//! | `sim_oven`  | ThermocouplePort, HeaterPort | first-order thermal model  |
//!
//! The MAX31855K and PWM heater drivers in [`crate::drivers`] implement
//! the same ports on real hardware.

pub mod log_sink;
pub mod sim_oven;

pub use log_sink::LogEventSink;
pub use sim_oven::{PlantParams, SimulatedOven};
