//! Reflow thermal profile.
//!
//! Five phases, one per non-Idle controller state, in a fixed order:
//!
//! ```text
//!  temp
//!   ▲            Peak ┌─┐
//!   │         RampUp /   \
//!   │   Soak ┌──────┘     \ Cooldown
//!   │ ┌──────┘             \
//!   │/ Preheat              \___
//!   └──────────────────────────────▶ time
//! ```
//!
//! Preheat, RampUp and Cooldown are *reach* phases: the controller drives
//! toward a target and moves on once the oven gets there.  Soak and Peak
//! are *hold* phases: the setpoint ramps to the target and the phase ends
//! when its duration elapses.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How a phase decides it is finished.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Done once the measured temperature reaches `target_c`.
    ReachTemperature { target_c: f32 },
    /// Done after `duration_secs`; setpoint ramps linearly to `target_c`.
    HoldDuration { target_c: f32, duration_secs: u32 },
}

impl Phase {
    pub const fn target_c(&self) -> f32 {
        match *self {
            Self::ReachTemperature { target_c } | Self::HoldDuration { target_c, .. } => target_c,
        }
    }

    pub const fn is_hold(&self) -> bool {
        matches!(self, Self::HoldDuration { .. })
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReachTemperature { target_c } => write!(f, "Reach temperature: {target_c:.1} C"),
            Self::HoldDuration {
                target_c,
                duration_secs,
            } => write!(f, "Hold temperature: {target_c:.1} C for {duration_secs} s"),
        }
    }
}

/// Position of a phase within the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhaseKind {
    Preheat,
    Soak,
    RampUp,
    Peak,
    Cooldown,
}

impl PhaseKind {
    pub const ALL: [Self; 5] = [
        Self::Preheat,
        Self::Soak,
        Self::RampUp,
        Self::Peak,
        Self::Cooldown,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Preheat => "Preheat",
            Self::Soak => "Soak",
            Self::RampUp => "RampUp",
            Self::Peak => "Peak",
            Self::Cooldown => "Cooldown",
        }
    }

    /// Whether this position must hold a [`Phase::HoldDuration`].
    pub const fn expects_hold(self) -> bool {
        matches!(self, Self::Soak | Self::Peak)
    }
}

/// The whole profile, indexed by [`PhaseKind`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReflowProfile {
    pub preheat: Phase,
    pub soak: Phase,
    pub ramp_up: Phase,
    pub peak: Phase,
    pub cooldown: Phase,
}

impl Default for ReflowProfile {
    fn default() -> Self {
        Self {
            preheat: Phase::ReachTemperature { target_c: 100.0 },
            soak: Phase::HoldDuration {
                target_c: 150.0,
                duration_secs: 120,
            },
            ramp_up: Phase::ReachTemperature { target_c: 215.0 },
            peak: Phase::HoldDuration {
                target_c: 215.0,
                duration_secs: 5,
            },
            cooldown: Phase::ReachTemperature { target_c: 35.0 },
        }
    }
}

impl ReflowProfile {
    pub const fn phase(&self, kind: PhaseKind) -> &Phase {
        match kind {
            PhaseKind::Preheat => &self.preheat,
            PhaseKind::Soak => &self.soak,
            PhaseKind::RampUp => &self.ramp_up,
            PhaseKind::Peak => &self.peak,
            PhaseKind::Cooldown => &self.cooldown,
        }
    }

    /// Target that the Idle state compares against before starting.
    pub const fn cooldown_target_c(&self) -> f32 {
        self.cooldown.target_c()
    }

    /// Phases in run order.
    pub fn iter(&self) -> impl Iterator<Item = (PhaseKind, &Phase)> {
        PhaseKind::ALL.into_iter().map(|k| (k, self.phase(k)))
    }

    /// Check phase kinds sit in their slots and hold phases have a duration.
    pub fn validate(&self) -> Result<()> {
        for (kind, phase) in self.iter() {
            if kind.expects_hold() != phase.is_hold() {
                return Err(Error::Config("profile phase kind out of order"));
            }
            if !phase.target_c().is_finite() {
                return Err(Error::Config("profile target is not finite"));
            }
            if let Phase::HoldDuration { duration_secs: 0, .. } = phase {
                return Err(Error::Config("hold phase has zero duration"));
            }
        }
        Ok(())
    }
}

impl fmt::Display for ReflowProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (kind, phase) in self.iter() {
            writeln!(f, "  {:<9} {}", kind.name(), phase)?;
        }
        Ok(())
    }
}
