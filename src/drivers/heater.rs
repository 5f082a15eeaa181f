//! Heating-element driver (SSR on a PWM channel).
//!
//! The PID output is in timer counts, so a command maps one-to-one onto
//! the duty cycle and is clamped to `[0, max_duty_cycle]`.
//!
//! ## Safety contract
//!
//! While stopped the duty is held at zero: commands are recorded but not
//! applied.  Over-temperature and sensor faults are the safety
//! supervisor's job; this driver is a dumb actuator.

use embedded_hal::pwm::SetDutyCycle;
use log::{debug, info};

use crate::app::ports::HeaterPort;
use crate::error::ActuatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaterState {
    Stopped,
    Running { duty: u16 },
}

/// PWM heater over any `SetDutyCycle` channel.
pub struct PwmHeater<P> {
    pwm: P,
    running: bool,
    duty: u16,
}

impl<P: SetDutyCycle> PwmHeater<P> {
    /// Wrap a channel and force it off.
    pub fn new(mut pwm: P) -> Result<Self, ActuatorError> {
        pwm.set_duty_cycle_fully_off()
            .map_err(|_| ActuatorError::PwmWriteFailed)?;
        Ok(Self {
            pwm,
            running: false,
            duty: 0,
        })
    }

    pub fn max_duty(&self) -> u16 {
        self.pwm.max_duty_cycle()
    }

    pub fn state(&self) -> HeaterState {
        if self.running {
            HeaterState::Running { duty: self.duty }
        } else {
            HeaterState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Duty currently applied to the channel.
    pub fn current_duty(&self) -> u16 {
        self.duty
    }

    fn clamp(&self, command: f32) -> u16 {
        if command.is_nan() {
            return 0;
        }
        let max = f32::from(self.max_duty());
        command.clamp(0.0, max) as u16
    }

    fn write(&mut self, duty: u16) -> Result<(), ActuatorError> {
        self.pwm
            .set_duty_cycle(duty)
            .map_err(|_| ActuatorError::PwmWriteFailed)?;
        self.duty = duty;
        Ok(())
    }
}

impl<P> HeaterPort for PwmHeater<P>
where
    P: SetDutyCycle + Send,
{
    fn start(&mut self) -> Result<(), ActuatorError> {
        if !self.running {
            info!("heater: output enabled");
        }
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ActuatorError> {
        self.running = false;
        self.pwm
            .set_duty_cycle_fully_off()
            .map_err(|_| ActuatorError::PwmWriteFailed)?;
        self.duty = 0;
        info!("heater: output disabled");
        Ok(())
    }

    fn set_command(&mut self, command: f32) -> Result<(), ActuatorError> {
        let duty = if self.running { self.clamp(command) } else { 0 };
        debug!("heater: command {command:.1} -> duty {duty}");
        self.write(duty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::pwm::{ErrorKind, ErrorType};
    use std::sync::{Arc, Mutex};

    /// 12-bit channel recording every duty written.
    #[derive(Clone, Default)]
    struct RecordingPwm {
        writes: Arc<Mutex<Vec<u16>>>,
        broken: bool,
    }

    impl ErrorType for RecordingPwm {
        type Error = ErrorKind;
    }

    impl SetDutyCycle for RecordingPwm {
        fn max_duty_cycle(&self) -> u16 {
            4095
        }

        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), ErrorKind> {
            if self.broken {
                return Err(ErrorKind::Other);
            }
            self.writes.lock().unwrap().push(duty);
            Ok(())
        }
    }

    fn heater() -> (PwmHeater<RecordingPwm>, Arc<Mutex<Vec<u16>>>) {
        let pwm = RecordingPwm::default();
        let writes = pwm.writes.clone();
        (PwmHeater::new(pwm).unwrap(), writes)
    }

    #[test]
    fn new_forces_output_off() {
        let (h, writes) = heater();
        assert_eq!(*writes.lock().unwrap(), vec![0]);
        assert_eq!(h.state(), HeaterState::Stopped);
    }

    #[test]
    fn commands_are_clamped_to_timer_range() {
        let (mut h, _) = heater();
        h.start().unwrap();
        h.set_command(5000.0).unwrap();
        assert_eq!(h.current_duty(), 4095);
        h.set_command(-3.0).unwrap();
        assert_eq!(h.current_duty(), 0);
        h.set_command(1234.7).unwrap();
        assert_eq!(h.state(), HeaterState::Running { duty: 1234 });
        h.set_command(f32::NAN).unwrap();
        assert_eq!(h.current_duty(), 0);
    }

    #[test]
    fn held_at_zero_while_stopped() {
        let (mut h, writes) = heater();
        h.set_command(2000.0).unwrap();
        assert_eq!(h.current_duty(), 0);

        h.start().unwrap();
        h.set_command(2000.0).unwrap();
        h.stop().unwrap();
        h.set_command(2000.0).unwrap();
        assert_eq!(*writes.lock().unwrap(), vec![0, 0, 2000, 0, 0]);
    }

    #[test]
    fn write_failure_is_reported() {
        let pwm = RecordingPwm {
            broken: true,
            ..RecordingPwm::default()
        };
        assert!(matches!(
            PwmHeater::new(pwm),
            Err(ActuatorError::PwmWriteFailed)
        ));
    }
}
