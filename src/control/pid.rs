//! PID controller for the heater command.
//!
//! Discrete PID with:
//! - trapezoidal integration,
//! - a first-order low-pass on the derivative (time constant `tau`),
//! - derivative taken on the measurement so setpoint ramps do not kick,
//! - clamping anti-windup: the integral is frozen while the output sits at
//!   a limit and the error would push it further in.
//!
//! ```text
//!   P = Kp·e
//!   I += ½·Ki·Ts·(e + e_prev)
//!   D = −(2·Kd·(m − m_prev) + (2τ − Ts)·D) / (2τ + Ts)
//!   u = clamp(P + I + D, out_min, out_max)
//! ```

use serde::{Deserialize, Serialize};

/// Tunable gains.  Updatable at runtime without clearing controller memory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    /// Derivative low-pass filter time constant (s).
    pub tau: f32,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 10.0,
            ki: 0.0,
            kd: 0.0,
            tau: 1.0,
        }
    }
}

impl PidGains {
    /// Copy of `self` with one gain replaced.
    #[must_use]
    pub fn with(mut self, param: GainParam, value: f32) -> Self {
        match param {
            GainParam::Kp => self.kp = value,
            GainParam::Ki => self.ki = value,
            GainParam::Kd => self.kd = value,
            GainParam::Tau => self.tau = value,
        }
        self
    }
}

/// A single runtime-tunable gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GainParam {
    Kp,
    Ki,
    Kd,
    Tau,
}

impl GainParam {
    pub const ALL: [Self; 4] = [Self::Kp, Self::Ki, Self::Kd, Self::Tau];

    /// Case-insensitive lookup by name (`kp`, `KI`, `Tau`, ...).
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Kp => "Kp",
            Self::Ki => "Ki",
            Self::Kd => "Kd",
            Self::Tau => "Tau",
        }
    }
}

/// Full controller configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidConfig {
    pub gains: PidGains,
    /// Sample period (s).
    pub sample_period_secs: f32,
    pub out_min: f32,
    pub out_max: f32,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            gains: PidGains::default(),
            sample_period_secs: 0.5,
            out_min: 0.0,
            // Full scale of the 12-bit heater PWM.
            out_max: 4095.0,
        }
    }
}

/// PID controller
#[derive(Debug, Clone)]
pub struct PidController {
    gains: PidGains,
    ts: f32,
    out_min: f32,
    out_max: f32,

    // Memory
    integral: f32,
    derivative: f32,
    prev_error: f32,
    prev_measurement: Option<f32>,

    // Last computation, kept for telemetry
    proportional: f32,
    out: f32,
}

impl PidController {
    pub fn new(config: &PidConfig) -> Self {
        Self {
            gains: config.gains,
            ts: config.sample_period_secs,
            out_min: config.out_min,
            out_max: config.out_max,
            integral: 0.0,
            derivative: 0.0,
            prev_error: 0.0,
            prev_measurement: None,
            proportional: 0.0,
            out: 0.0,
        }
    }

    /// Compute the next command for `setpoint` given `measurement`.
    pub fn compute(&mut self, setpoint: f32, measurement: f32) -> f32 {
        let PidGains { kp, ki, kd, tau } = self.gains;
        let ts = self.ts;
        let error = setpoint - measurement;

        self.proportional = kp * error;

        let saturated = (self.out >= self.out_max && error > 0.0)
            || (self.out <= self.out_min && error < 0.0);
        if !saturated {
            self.integral += 0.5 * ki * ts * (error + self.prev_error);
        }

        // First sample after a reset has no history: no derivative kick.
        let prev_measurement = self.prev_measurement.unwrap_or(measurement);
        let denom = 2.0 * tau + ts;
        self.derivative = if denom > 0.0 {
            -(2.0 * kd * (measurement - prev_measurement) + (2.0 * tau - ts) * self.derivative)
                / denom
        } else {
            0.0
        };

        self.out = (self.proportional + self.integral + self.derivative)
            .clamp(self.out_min, self.out_max);

        self.prev_error = error;
        self.prev_measurement = Some(measurement);
        self.out
    }

    /// Clear controller memory.  Gains and limits are kept.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.derivative = 0.0;
        self.prev_error = 0.0;
        self.prev_measurement = None;
        self.proportional = 0.0;
        self.out = 0.0;
    }

    /// Replace the gains without touching controller memory.
    pub fn set_gains(&mut self, gains: PidGains) {
        self.gains = gains;
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    pub fn sample_period_secs(&self) -> f32 {
        self.ts
    }

    pub fn limits(&self) -> (f32, f32) {
        (self.out_min, self.out_max)
    }

    pub fn proportional(&self) -> f32 {
        self.proportional
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }

    pub fn derivative(&self) -> f32 {
        self.derivative
    }

    /// Last computed (clamped) output.
    pub fn output(&self) -> f32 {
        self.out
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn output_always_within_limits(
            kp in 0.0f32..100.0,
            ki in 0.0f32..10.0,
            kd in 0.0f32..10.0,
            samples in proptest::collection::vec((0.0f32..300.0, 0.0f32..300.0), 1..50),
        ) {
            let mut pid = PidController::new(&PidConfig {
                gains: PidGains { kp, ki, kd, tau: 1.0 },
                ..PidConfig::default()
            });
            for (sp, m) in samples {
                let out = pid.compute(sp, m);
                prop_assert!((0.0..=4095.0).contains(&out));
            }
        }
    }
}
