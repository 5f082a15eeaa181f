//! Application core: reflow domain logic behind port traits.
//!
//! The controller service wires the FSM, PID and safety supervisor into
//! an active object; the console turns text commands into events for it.
//! All interaction with hardware happens through the **port traits** in
//! [`ports`], so the whole layer runs on the host with fakes.

pub mod commands;
pub mod console;
pub mod events;
pub mod ports;
pub mod service;
pub mod status;
