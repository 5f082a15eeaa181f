//! Safety supervisor.
//!
//! Evaluated by the controller on **every sample** before the control law
//! runs.  It keeps a latched fault bitmask; any set bit aborts an active
//! reflow run (heater forced off, controller back to Idle).
//!
//! ## Fault lifecycle
//!
//! 1. A sample fails to read, or reads above the configured maximum.
//! 2. The supervisor sets the corresponding bit and reports the new mask.
//! 3. The controller aborts the run.
//! 4. The bit clears the next time the condition is evaluated false
//!    (a good read, a reading back under the limit).
//! 5. Idle refuses `start` while any bit is still set.

use log::{error, info};

use crate::config::SystemConfig;
use crate::error::{SafetyFault, ThermocoupleError};

/// Safety supervisor.
#[derive(Debug, Clone)]
pub struct SafetySupervisor {
    max_temp_c: f32,
    /// Latched fault bitmask.
    faults: u8,
    /// Most recent thermocouple error while `SensorFault` is set.
    sensor_error: Option<ThermocoupleError>,
}

impl SafetySupervisor {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            max_temp_c: config.max_temperature_c,
            faults: 0,
            sensor_error: None,
        }
    }

    /// Evaluate one sample.  Returns the updated fault bitmask.
    pub fn evaluate(&mut self, reading: Result<f32, ThermocoupleError>) -> u8 {
        // ── Sensor ────────────────────────────────────────────────
        self.eval_fault(SafetyFault::SensorFault, reading.is_err());
        self.sensor_error = reading.err();

        // ── Temperature ───────────────────────────────────────────
        // A failed read says nothing about temperature; keep the bit.
        if let Ok(temp) = reading {
            self.eval_fault(SafetyFault::OverTemperature, temp > self.max_temp_c);
        }

        self.faults
    }

    /// Current fault bitmask.
    pub fn faults(&self) -> u8 {
        self.faults
    }

    /// True if **any** fault is active.
    pub fn has_faults(&self) -> bool {
        self.faults != 0
    }

    /// Check if a specific fault is active.
    pub fn has_fault(&self, fault: SafetyFault) -> bool {
        self.faults & fault.mask() != 0
    }

    pub fn sensor_error(&self) -> Option<ThermocoupleError> {
        self.sensor_error
    }

    pub fn max_temp_c(&self) -> f32 {
        self.max_temp_c
    }

    // ── Internal ──────────────────────────────────────────────────

    /// Set or clear a fault bit based on a boolean condition.
    fn eval_fault(&mut self, fault: SafetyFault, condition: bool) {
        if condition {
            if self.faults & fault.mask() == 0 {
                error!("SAFETY FAULT SET: {fault}");
            }
            self.faults |= fault.mask();
        } else {
            if self.faults & fault.mask() != 0 {
                info!("SAFETY FAULT CLEARED: {fault}");
            }
            self.faults &= !fault.mask();
        }
    }
}
