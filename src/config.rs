//! System configuration parameters
//!
//! All tunable parameters for the reflow oven.  Factory values come from
//! `Default`; the host binary can override them from a JSON file.  Nothing
//! is persisted.

use serde::{Deserialize, Serialize};

use crate::control::PidConfig;
use crate::error::{Error, Result};
use crate::profile::ReflowProfile;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Control ---
    /// PID gains, sample period and output limits.
    pub pid: PidConfig,

    // --- Profile ---
    pub profile: ReflowProfile,
    /// A reach phase is complete once the reading is within this many
    /// degrees of its target.
    pub reach_tolerance_c: f32,

    // --- Safety ---
    /// Maximum allowed oven temperature (Celsius) before the run is aborted.
    pub max_temperature_c: f32,

    // --- Timing ---
    /// Period of the phase clock (milliseconds).
    pub tick_period_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Control
            pid: PidConfig::default(),

            // Profile
            profile: ReflowProfile::default(),
            reach_tolerance_c: 2.0,

            // Safety
            max_temperature_c: 260.0,

            // Timing
            tick_period_ms: 1000, // 1 Hz
        }
    }
}

impl SystemConfig {
    /// Reject configurations the controller cannot run safely.
    pub fn validate(&self) -> Result<()> {
        let pid = &self.pid;
        if !(pid.sample_period_secs > 0.0 && pid.sample_period_secs.is_finite()) {
            return Err(Error::Config("sample period must be positive"));
        }
        if self.sample_period_ms() == 0 {
            return Err(Error::Config("sample period below one millisecond"));
        }
        if !(pid.out_min < pid.out_max) {
            return Err(Error::Config("output minimum must be below maximum"));
        }
        let g = &pid.gains;
        if [g.kp, g.ki, g.kd, g.tau].iter().any(|v| !(*v >= 0.0 && v.is_finite())) {
            return Err(Error::Config("gains must be non-negative"));
        }
        if !self.max_temperature_c.is_finite() {
            return Err(Error::Config("maximum temperature must be finite"));
        }
        if !(self.reach_tolerance_c > 0.0 && self.reach_tolerance_c.is_finite()) {
            return Err(Error::Config("reach tolerance must be positive"));
        }
        if self.tick_period_ms == 0 {
            return Err(Error::Config("tick period must be non-zero"));
        }
        self.profile.validate()?;
        if self
            .profile
            .iter()
            .any(|(_, phase)| phase.target_c() > self.max_temperature_c)
        {
            return Err(Error::Config("profile exceeds maximum temperature"));
        }
        Ok(())
    }

    /// Sample period as whole milliseconds, for the sample clock.
    pub fn sample_period_ms(&self) -> u64 {
        (f64::from(self.pid.sample_period_secs) * 1000.0).round() as u64
    }
}
