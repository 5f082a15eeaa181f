//! Console: executes parsed commands against a running controller.
//!
//! `start`, `stop` and `set` become events posted to the controller's
//! mailbox; `status` reads the published snapshot and `help` is local.
//! Every call returns the text to show the user.

use std::fmt::Write as _;
use std::sync::Arc;

use log::{info, warn};

use crate::active::{ActiveRef, Event};
use crate::error::{Error, Result};
use crate::fsm::{ReflowPayload, SET_GAINS, START_REQUESTED, STOP_REQUESTED};
use crate::profile::ReflowProfile;

use super::commands::{self, CLIENT_NAME, Command};
use super::status::StatusBoard;

/// One line of help per command.
const HELP: &[(&str, &str)] = &[
    ("status", "Dump information about reflow oven controller."),
    ("start", "Start reflow process."),
    ("stop", "Stop reflow process."),
    (
        "set",
        "Set pid parameters (Kp, Ki, Kd, Tau)\nUsage: reflow set <param> <value> [<param2> <value2> ...]",
    ),
];

/// Front end for the reflow controller.
#[derive(Debug, Clone)]
pub struct Console {
    controller: ActiveRef<ReflowPayload>,
    status: Arc<StatusBoard>,
    profile: ReflowProfile,
}

impl Console {
    pub fn new(
        controller: ActiveRef<ReflowPayload>,
        status: Arc<StatusBoard>,
        profile: ReflowProfile,
    ) -> Self {
        Self {
            controller,
            status,
            profile,
        }
    }

    /// Parse and run one line.  Blank lines produce no output.
    pub fn execute_line(&self, line: &str) -> String {
        info!("console: command received: {}", line.trim());
        let outcome = commands::parse(line)
            .map_err(Error::from)
            .and_then(|cmd| self.execute(&cmd));
        match outcome {
            Ok(text) => text,
            Err(Error::Command(commands::CommandError::Empty)) => String::new(),
            Err(e) => {
                warn!("console: {e}");
                format!("Error: {e}\n")
            }
        }
    }

    pub fn execute(&self, command: &Command) -> Result<String> {
        match command {
            Command::Start => {
                self.post(Event::new(START_REQUESTED))?;
                Ok("Posted START signal to reflow active object.\n".into())
            }
            Command::Stop => {
                self.post(Event::new(STOP_REQUESTED))?;
                Ok("Posted STOP signal to reflow active object.\n".into())
            }
            Command::Set(updates) => {
                self.post(Event::with_payload(
                    SET_GAINS,
                    ReflowPayload::Gains(updates.clone()),
                ))?;
                let mut out = String::new();
                for (param, value) in updates {
                    let _ = writeln!(out, "Updated {} to {value:.2}", param.name());
                }
                Ok(out)
            }
            Command::Status => Ok(self.status_text()),
            Command::Help => Ok(help_text()),
        }
    }

    fn post(&self, event: Event<ReflowPayload>) -> Result<()> {
        self.controller.post(event).inspect_err(|_| {
            warn!("console: {} mailbox full, command dropped", self.controller.name());
        })
    }

    fn status_text(&self) -> String {
        let mut out = String::new();
        let _ = write!(out, "{}", self.status.snapshot());
        let _ = writeln!(out, "Profile:");
        let _ = write!(out, "{}", self.profile);
        out
    }
}

fn help_text() -> String {
    let mut out = String::new();
    for (name, help) in HELP {
        let _ = writeln!(out, "{CLIENT_NAME} {name}: {help}");
    }
    out
}
