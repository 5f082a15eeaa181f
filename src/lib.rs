//! Reflow oven controller library.
//!
//! Exposes the active-object runtime, the time-event service, the reflow
//! state machine and its collaborators for the host binary, integration
//! tests and fuzzing.  Hardware is reached only through the port traits in
//! [`app::ports`]; [`drivers`] implements them over `embedded-hal`,
//! [`adapters`] over a simulated oven.

#![deny(unused_must_use)]

pub mod active;
pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod drivers;
pub mod error;
pub mod fsm;
pub mod profile;
pub mod safety;
pub mod time_event;
