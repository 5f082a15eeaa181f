//! Function-pointer finite state machine engine.
//!
//! Classic embedded FSM pattern: a fixed table indexed by state, each row
//! holding one optional action per signal.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  StateTable                                                         │
//! │  ┌──────────┬──────┬───────┬───────┬──────┬─────────┬──────┬──────┐ │
//! │  │ StateId  │ INIT │ ENTRY │ START │ STOP │ ELAPSED │ REACH│ ...  │ │
//! │  ├──────────┼──────┼───────┼───────┼──────┼─────────┼──────┼──────┤ │
//! │  │ Idle     │ fn   │ fn    │ fn    │  -   │   -     │  -   │      │ │
//! │  │ Preheat  │  -   │ fn    │  -    │ fn   │   -     │  fn  │      │ │
//! │  │ Soak     │  -   │ fn    │  -    │ fn   │   fn    │  -   │      │ │
//! │  │ ...      │      │       │       │      │         │      │      │ │
//! │  └──────────┴──────┴───────┴───────┴──────┴─────────┴──────┴──────┘ │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! For each event the engine looks up `table[current][signal]`.  An empty
//! cell (or a signal outside the table) is [`Status::Ignored`], never a
//! default action.  When an action reports a transition, the engine
//! switches the current pointer and synchronously dispatches a fresh
//! `ENTRY` event to the new state before returning, so the entry action
//! never sees the triggering event's payload.  All actions receive
//! `&mut ReflowContext`, the controller's blackboard.

pub mod context;
pub mod states;

use core::fmt;

use context::ReflowContext;
use log::{info, warn};

use crate::active::{Event, Signal};
use crate::app::events::AppEvent;
use crate::control::GainParam;

// ---------------------------------------------------------------------------
// Signals and payload
// ---------------------------------------------------------------------------

/// `start` from the console.
pub const START_REQUESTED: Signal = Signal::user(0);
/// A hold phase's one-shot timer expired.
pub const TIME_ELAPSED: Signal = Signal::user(1);
/// The oven reached the active reach phase's target.
pub const TEMPERATURE_REACHED: Signal = Signal::user(2);
/// `stop` from the console, or a safety abort.
pub const STOP_REQUESTED: Signal = Signal::user(3);
/// Periodic control-loop sample.
pub const SAMPLE_TICK: Signal = Signal::user(4);
/// New PID gains (payload: [`ReflowPayload::Gains`]).
pub const SET_GAINS: Signal = Signal::user(5);

/// Width of one table row: reserved signals plus the six above.
pub const SIGNAL_COUNT: usize = Signal::USER_BASE as usize + 6;

/// Maximum gain updates in one `SetGains` event.
pub const MAX_GAIN_UPDATES: usize = 4;

/// Ordered list of `(param, value)` gain updates.
pub type GainUpdates = heapless::Vec<(GainParam, f32), MAX_GAIN_UPDATES>;

/// Payload carried by controller events.
#[derive(Debug, Clone, PartialEq)]
pub enum ReflowPayload {
    Gains(GainUpdates),
}

/// Event type accepted by the reflow controller.
pub type ReflowEvent = Event<ReflowPayload>;

/// Human-readable signal name for logs.
pub fn signal_name(signal: Signal) -> &'static str {
    match signal {
        Signal::INIT => "INIT",
        Signal::ENTRY => "ENTRY",
        START_REQUESTED => "START_REQUESTED",
        TIME_ELAPSED => "TIME_ELAPSED",
        TEMPERATURE_REACHED => "TEMPERATURE_REACHED",
        STOP_REQUESTED => "STOP_REQUESTED",
        SAMPLE_TICK => "SAMPLE_TICK",
        SET_GAINS => "SET_GAINS",
        _ => "UNKNOWN",
    }
}

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all controller states.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Idle = 0,
    Preheat = 1,
    Soak = 2,
    RampUp = 3,
    Peak = 4,
    Cooldown = 5,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 6;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Idle,
        Self::Preheat,
        Self::Soak,
        Self::RampUp,
        Self::Peak,
        Self::Cooldown,
    ];

    /// Convert an index back to `StateId`.  Panics on out-of-range in
    /// debug builds; returns `Idle` in release (safe fallback).
    pub fn from_index(idx: usize) -> Self {
        if let Some(id) = Self::ALL.get(idx) {
            *id
        } else {
            debug_assert!(false, "invalid state index: {idx}");
            Self::Idle
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Preheat => "Preheat",
            Self::Soak => "Soak",
            Self::RampUp => "RampUp",
            Self::Peak => "Peak",
            Self::Cooldown => "Cooldown",
        }
    }

    /// The state that follows this one in the profile.  Cooldown wraps
    /// back to Idle.
    pub const fn next(self) -> Self {
        match self {
            Self::Idle => Self::Preheat,
            Self::Preheat => Self::Soak,
            Self::Soak => Self::RampUp,
            Self::RampUp => Self::Peak,
            Self::Peak => Self::Cooldown,
            Self::Cooldown => Self::Idle,
        }
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Action results and function-pointer type aliases
// ---------------------------------------------------------------------------

/// Outcome of one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Moved to another state (its entry action has already run).
    Transitioned(StateId),
    /// Consumed without changing state.
    Handled,
    /// No table entry for this (state, signal).
    Ignored,
    /// Init picked the starting state.
    InitialTransition(StateId),
}

/// Signature of every table entry.
pub type ActionFn = fn(&mut ReflowContext, &ReflowEvent) -> Status;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
/// Stored in a fixed-size array: no heap, no `dyn`.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    /// Indexed by `Signal::raw()`.
    pub actions: [Option<ActionFn>; SIGNAL_COUNT],
}

impl StateDescriptor {
    pub const fn new(id: StateId) -> Self {
        Self {
            id,
            name: id.name(),
            actions: [None; SIGNAL_COUNT],
        }
    }

    /// Builder-style table entry.
    #[must_use]
    pub const fn on(mut self, signal: Signal, action: ActionFn) -> Self {
        self.actions[signal.raw() as usize] = Some(action);
        self
    }

    pub fn action(&self, signal: Signal) -> Option<ActionFn> {
        self.actions.get(signal.raw() as usize).copied().flatten()
    }
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// Upper bound on chained transitions out of entry actions.
const MAX_ENTRY_CHAIN: usize = StateId::COUNT;

/// The finite state machine engine.
///
/// Owns the state table and the current-state pointer.  The context is
/// threaded through every action call.
pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    /// Index of the currently active state.
    current: usize,
    /// Number of transitions taken since construction.
    transitions: u64,
}

impl Fsm {
    /// Construct a new FSM with the given state table, starting in `initial`.
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        debug_assert!(
            table.iter().enumerate().all(|(i, row)| row.id as usize == i),
            "state table rows out of order"
        );
        Self {
            table,
            current: initial as usize,
            transitions: 0,
        }
    }

    /// Dispatch one event through the table.
    ///
    /// A transition (including the initial one) runs the destination's
    /// entry action before this returns.
    pub fn dispatch(&mut self, ctx: &mut ReflowContext, event: &ReflowEvent) -> Status {
        let row = &self.table[self.current];
        let Some(action) = row.action(event.signal()) else {
            return Status::Ignored;
        };
        let status = action(ctx, event);
        match status {
            Status::Transitioned(next) | Status::InitialTransition(next) => {
                self.transition(next, ctx);
            }
            Status::Handled | Status::Ignored => {}
        }
        status
    }

    /// Force an immediate transition regardless of the table.
    pub fn force_transition(&mut self, next: StateId, ctx: &mut ReflowContext) {
        self.transition(next, ctx);
    }

    /// The current state's identity.
    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: StateId, ctx: &mut ReflowContext) {
        let mut next = next_id;
        for _ in 0..MAX_ENTRY_CHAIN {
            let from = self.current_state();
            info!(
                "FSM transition: {} -> {}",
                self.table[self.current].name, self.table[next as usize].name
            );
            self.current = next as usize;
            self.transitions += 1;
            ctx.state = next;
            ctx.emit(&AppEvent::StateChanged { from, to: next });

            let Some(entry) = self.table[self.current].action(Signal::ENTRY) else {
                return;
            };
            match entry(ctx, &Event::new(Signal::ENTRY)) {
                Status::Transitioned(n) | Status::InitialTransition(n) => next = n,
                Status::Handled | Status::Ignored => return,
            }
        }
        warn!("FSM: entry transition chain exceeded {MAX_ENTRY_CHAIN}, stopping");
    }
}
