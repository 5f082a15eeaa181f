//! Mock hardware adapters for integration tests.
//!
//! Records every heater call and every emitted event so tests can assert
//! on the full history without touching real SPI or PWM peripherals.
//! Handles are cheap clones sharing one record, so a test keeps one copy
//! while the controller owns the other.

use std::sync::{Arc, Mutex};

use reflow::app::events::{AppEvent, TelemetryData};
use reflow::app::ports::{EventSink, HeaterPort, ThermocouplePort};
use reflow::error::{ActuatorError, ThermocoupleError};
use reflow::fsm::StateId;

// ── Heater call record ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeaterCall {
    Start,
    Stop,
    SetCommand(f32),
}

// ── MockHeater ────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockHeater {
    calls: Arc<Mutex<Vec<HeaterCall>>>,
}

#[allow(dead_code)]
impl MockHeater {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<HeaterCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Whether the output stage is currently enabled.
    pub fn is_running(&self) -> bool {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|c| match c {
                HeaterCall::Start => Some(true),
                HeaterCall::Stop => Some(false),
                HeaterCall::SetCommand(_) => None,
            })
            .unwrap_or(false)
    }

    pub fn last_command(&self) -> Option<f32> {
        self.calls.lock().unwrap().iter().rev().find_map(|c| match c {
            HeaterCall::SetCommand(v) => Some(*v),
            _ => None,
        })
    }
}

impl HeaterPort for MockHeater {
    fn start(&mut self) -> Result<(), ActuatorError> {
        self.calls.lock().unwrap().push(HeaterCall::Start);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ActuatorError> {
        self.calls.lock().unwrap().push(HeaterCall::Stop);
        Ok(())
    }

    fn set_command(&mut self, command: f32) -> Result<(), ActuatorError> {
        self.calls.lock().unwrap().push(HeaterCall::SetCommand(command));
        Ok(())
    }
}

// ── ScriptedThermocouple ──────────────────────────────────────

/// Returns whatever the test last set.
#[derive(Clone)]
pub struct ScriptedThermocouple {
    reading: Arc<Mutex<Result<f32, ThermocoupleError>>>,
}

#[allow(dead_code)]
impl ScriptedThermocouple {
    pub fn at(temp_c: f32) -> Self {
        Self {
            reading: Arc::new(Mutex::new(Ok(temp_c))),
        }
    }

    pub fn set(&self, temp_c: f32) {
        *self.reading.lock().unwrap() = Ok(temp_c);
    }

    pub fn fail(&self, e: ThermocoupleError) {
        *self.reading.lock().unwrap() = Err(e);
    }
}

impl ThermocouplePort for ScriptedThermocouple {
    fn read_temperature(&mut self) -> Result<f32, ThermocoupleError> {
        *self.reading.lock().unwrap()
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<AppEvent>>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AppEvent> {
        self.events.lock().unwrap().clone()
    }

    /// States entered, in order.
    pub fn states_entered(&self) -> Vec<StateId> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                AppEvent::StateChanged { to, .. } => Some(to),
                _ => None,
            })
            .collect()
    }

    pub fn telemetry(&self) -> Vec<TelemetryData> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                AppEvent::Telemetry(t) => Some(t),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
