//! Simulated oven: a host stand-in for the thermocouple and the heater.
//!
//! First-order thermal plant: the element adds heat in proportion to the
//! PWM duty, the chamber loses heat to ambient in proportion to the
//! temperature difference.
//!
//! ```text
//!   dT/dt = heat_rate · duty − loss · (T − ambient)
//! ```
//!
//! The plant advances by one sample period per thermocouple read, so a
//! run is deterministic no matter how fast the clocks are driven.  Clones
//! share the same plant, which lets one oven back both ports.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::{debug, warn};
use std::sync::Arc;

use crate::app::ports::{HeaterPort, ThermocouplePort};
use crate::error::{ActuatorError, ThermocoupleError};

/// Physical constants of the simulated chamber.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlantParams {
    pub ambient_c: f32,
    /// Heating rate at full duty (°C/s).
    pub heat_rate_c_per_s: f32,
    /// Fraction of the excess over ambient lost per second.
    pub loss_per_s: f32,
    /// Simulated time per read (s).
    pub step_secs: f32,
    /// Command that maps to full duty.
    pub max_command: f32,
}

impl Default for PlantParams {
    fn default() -> Self {
        Self {
            ambient_c: 25.0,
            heat_rate_c_per_s: 200.0,
            loss_per_s: 0.004,
            step_secs: 0.5,
            max_command: 4095.0,
        }
    }
}

#[derive(Debug)]
struct Plant {
    params: PlantParams,
    temperature_c: f32,
    running: bool,
    command: f32,
    elapsed_secs: f32,
    fault: Option<ThermocoupleError>,
}

impl Plant {
    fn step(&mut self) {
        let p = &self.params;
        let duty = if self.running {
            self.command / p.max_command
        } else {
            0.0
        };
        let dt = p.heat_rate_c_per_s * duty - p.loss_per_s * (self.temperature_c - p.ambient_c);
        self.temperature_c += dt * p.step_secs;
        self.elapsed_secs += p.step_secs;
    }
}

/// Shared handle to a simulated oven.
#[derive(Clone)]
pub struct SimulatedOven {
    plant: Arc<Mutex<CriticalSectionRawMutex, RefCell<Plant>>>,
}

impl SimulatedOven {
    /// Oven at ambient temperature with the heater off.
    pub fn new(params: PlantParams) -> Self {
        Self {
            plant: Arc::new(Mutex::new(RefCell::new(Plant {
                params,
                temperature_c: params.ambient_c,
                running: false,
                command: 0.0,
                elapsed_secs: 0.0,
                fault: None,
            }))),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut Plant) -> R) -> R {
        self.plant.lock(|p| f(&mut p.borrow_mut()))
    }

    pub fn temperature_c(&self) -> f32 {
        self.with(|p| p.temperature_c)
    }

    /// Force the chamber temperature, e.g. to start a scenario hot.
    pub fn set_temperature(&self, temperature_c: f32) {
        self.with(|p| p.temperature_c = temperature_c);
    }

    /// Command currently applied to the element (0 while stopped).
    pub fn applied_command(&self) -> f32 {
        self.with(|p| if p.running { p.command } else { 0.0 })
    }

    pub fn is_heating(&self) -> bool {
        self.with(|p| p.running)
    }

    /// Simulated seconds since construction.
    pub fn elapsed_secs(&self) -> f32 {
        self.with(|p| p.elapsed_secs)
    }

    /// Make every following read fail with `fault`, or heal with `None`.
    pub fn inject_fault(&self, fault: Option<ThermocoupleError>) {
        match fault {
            Some(e) => warn!("sim: injecting thermocouple fault {}", e.name()),
            None => warn!("sim: thermocouple fault cleared"),
        }
        self.with(|p| p.fault = fault);
    }
}

impl Default for SimulatedOven {
    fn default() -> Self {
        Self::new(PlantParams::default())
    }
}

impl ThermocouplePort for SimulatedOven {
    fn read_temperature(&mut self) -> Result<f32, ThermocoupleError> {
        self.with(|p| {
            p.step();
            match p.fault {
                Some(e) => Err(e),
                None => Ok(p.temperature_c),
            }
        })
    }
}

impl HeaterPort for SimulatedOven {
    fn start(&mut self) -> Result<(), ActuatorError> {
        self.with(|p| p.running = true);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ActuatorError> {
        self.with(|p| {
            p.running = false;
            p.command = 0.0;
        });
        Ok(())
    }

    fn set_command(&mut self, command: f32) -> Result<(), ActuatorError> {
        self.with(|p| {
            p.command = if p.running && command.is_finite() {
                command.clamp(0.0, p.params.max_command)
            } else {
                0.0
            };
            debug!("sim: command {:.1} at {:.2} C", p.command, p.temperature_c);
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_oven_stays_at_ambient() {
        let mut oven = SimulatedOven::default();
        for _ in 0..10 {
            assert_eq!(oven.read_temperature(), Ok(25.0));
        }
        assert!((oven.elapsed_secs() - 5.0).abs() < 1e-4);
    }

    #[test]
    fn full_power_heats_and_stop_cools() {
        let mut oven = SimulatedOven::default();
        oven.start().unwrap();
        oven.set_command(4095.0).unwrap();
        let hot = oven.read_temperature().unwrap();
        assert!(hot > 120.0);

        oven.stop().unwrap();
        let cooler = oven.read_temperature().unwrap();
        assert!(cooler < hot);
        assert_eq!(oven.applied_command(), 0.0);
    }

    #[test]
    fn commands_ignored_while_stopped() {
        let mut oven = SimulatedOven::default();
        oven.set_command(4095.0).unwrap();
        assert_eq!(oven.read_temperature(), Ok(25.0));
    }

    #[test]
    fn injected_fault_fails_reads_until_cleared() {
        let mut oven = SimulatedOven::default();
        oven.inject_fault(Some(ThermocoupleError::OpenCircuit));
        assert_eq!(oven.read_temperature(), Err(ThermocoupleError::OpenCircuit));
        oven.inject_fault(None);
        assert!(oven.read_temperature().is_ok());
    }

    #[test]
    fn clones_share_the_plant() {
        let oven = SimulatedOven::default();
        let mut heater = oven.clone();
        heater.start().unwrap();
        assert!(oven.is_heating());
    }
}
