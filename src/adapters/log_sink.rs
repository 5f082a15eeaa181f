//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing controller events to the `log`
//! facade.  Telemetry goes out as one whitespace-separated line per sample
//! in the column order the plotting script reads:
//!
//! ```text
//! <state> <setpoint> <measured> <P> <I> <D> <command>
//! ```

use log::{info, warn};

use crate::app::events::{AppEvent, StartRejection, TelemetryData};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

/// Render one telemetry sample as a plot line.
pub fn telemetry_line(t: &TelemetryData) -> String {
    format!(
        "{} {:.2} {:.2} {:.2} {:.2} {:.2} {:.2}",
        t.state,
        t.setpoint_c,
        t.temperature_c,
        t.proportional,
        t.integral,
        t.derivative,
        t.command
    )
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => info!("{}", telemetry_line(t)),
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {from} -> {to}");
            }
            AppEvent::StartRejected(reason) => match reason {
                StartRejection::SensorFault(e) => {
                    warn!("START | rejected, thermocouple read error: {}", e.name());
                }
                StartRejection::TooHot {
                    temperature_c,
                    limit_c,
                } => warn!(
                    "START | rejected, oven at {temperature_c:.2} C must cool below {limit_c:.0} C"
                ),
                StartRejection::FaultLatched(flags) => {
                    warn!("START | rejected, faults=0b{flags:08b}");
                }
            },
            AppEvent::FaultDetected(flags) => {
                warn!("FAULT | detected, flags=0b{flags:08b}");
            }
            AppEvent::RunAborted { state, faults } => {
                warn!("ABORT | run stopped in {state}, flags=0b{faults:08b}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::StateId;

    #[test]
    fn telemetry_columns_match_plot_format() {
        let line = telemetry_line(&TelemetryData {
            state: StateId::Soak,
            setpoint_c: 120.5,
            temperature_c: 119.876,
            proportional: 6.25,
            integral: 0.0,
            derivative: -1.5,
            command: 4.75,
        });
        assert_eq!(line, "Soak 120.50 119.88 6.25 0.00 -1.50 4.75");
        assert_eq!(line.split_whitespace().count(), 7);
    }
}
