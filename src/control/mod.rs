//! Closed-loop control algorithms.

pub mod pid;

pub use pid::{GainParam, PidConfig, PidController, PidGains};
