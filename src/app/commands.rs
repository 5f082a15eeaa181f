//! Inbound console commands.
//!
//! A command line is split on whitespace into at most [`MAX_TOKENS`]
//! tokens.  The client name `reflow` may prefix any command; on its own it
//! asks for help.
//!
//! ```text
//!   [reflow] start
//!   [reflow] stop
//!   [reflow] status
//!   [reflow] help | ?
//!   [reflow] set <param> <value> [<param> <value> ...]   param ∈ Kp Ki Kd Tau
//! ```

use core::fmt;

use crate::control::GainParam;
use crate::fsm::GainUpdates;

/// Maximum number of whitespace-separated tokens on one line.
pub const MAX_TOKENS: usize = 10;

/// Optional first token naming the controller.
pub const CLIENT_NAME: &str = "reflow";

/// Commands the console can send to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Begin a reflow run.
    Start,
    /// Abort the current run.
    Stop,
    /// Print the controller status and profile.
    Status,
    /// List the available commands.
    Help,
    /// Update one or more PID gains.
    Set(GainUpdates),
}

/// Why a command line was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// Nothing but whitespace.
    Empty,
    /// More than [`MAX_TOKENS`] tokens.
    TooManyTokens,
    /// First token is not a known command.
    UnknownCommand,
    /// `set` needs a non-empty list of `<param> <value>` pairs.
    InvalidArgCount,
    /// `set` named something other than Kp, Ki, Kd or Tau.
    UnknownParam,
    /// A `set` value is not a finite, non-negative number.
    InvalidValue,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty command"),
            Self::TooManyTokens => write!(f, "too many tokens (max {MAX_TOKENS})"),
            Self::UnknownCommand => write!(f, "no such command"),
            Self::InvalidArgCount => write!(f, "invalid number of arguments"),
            Self::UnknownParam => write!(f, "unrecognizable PID parameter"),
            Self::InvalidValue => write!(f, "value is not a valid non-negative number"),
        }
    }
}

/// Split a line into tokens.
pub fn tokenize(line: &str) -> Result<heapless::Vec<&str, MAX_TOKENS>, CommandError> {
    let mut tokens = heapless::Vec::new();
    for token in line.split_whitespace() {
        tokens.push(token).map_err(|_| CommandError::TooManyTokens)?;
    }
    if tokens.is_empty() {
        return Err(CommandError::Empty);
    }
    Ok(tokens)
}

/// Parse one console line.
pub fn parse(line: &str) -> Result<Command, CommandError> {
    let tokens = tokenize(line)?;
    let mut rest = tokens.as_slice();
    if rest[0].eq_ignore_ascii_case(CLIENT_NAME) {
        rest = &rest[1..];
    }
    let Some((name, args)) = rest.split_first() else {
        // Bare client name.
        return Ok(Command::Help);
    };

    let name = name.to_ascii_lowercase();
    match name.as_str() {
        "start" => Ok(Command::Start),
        "stop" => Ok(Command::Stop),
        "status" => Ok(Command::Status),
        "help" | "?" => Ok(Command::Help),
        "set" => parse_set(args).map(Command::Set),
        _ => Err(CommandError::UnknownCommand),
    }
}

fn parse_set(args: &[&str]) -> Result<GainUpdates, CommandError> {
    if args.is_empty() || args.len() % 2 != 0 {
        return Err(CommandError::InvalidArgCount);
    }
    let mut updates = GainUpdates::new();
    for pair in args.chunks_exact(2) {
        let param = GainParam::parse(pair[0]).ok_or(CommandError::UnknownParam)?;
        let value: f32 = pair[1].parse().map_err(|_| CommandError::InvalidValue)?;
        if !(value.is_finite() && value >= 0.0) {
            return Err(CommandError::InvalidValue);
        }
        updates
            .push((param, value))
            .map_err(|_| CommandError::TooManyTokens)?;
    }
    Ok(updates)
}
