//! Signals and events.
//!
//! A [`Signal`] is a small integer tag.  The first two values are reserved
//! for lifecycle signals every active object understands; each module
//! numbers its own signals from [`Signal::user`] onwards.
//!
//! An [`Event`] is a signal plus an optional, module-specific payload.
//! Events are moved into a mailbox by value and only ever handed to the
//! handler by shared reference, so they are immutable once posted.
//!
//! ## Payload-free constants
//!
//! Modules keep their payload-free events as `const` items (e.g. a single
//! "stop" event reused by the console and the control loop).  A `const`
//! is instantiated afresh at every use site, so nothing is shared between
//! posts.  Events that carry a payload are always built at the post site
//! and owned by the mailbox; never keep one in a `static` and hand it out
//! from several producers.

use core::fmt;

/// Integer tag identifying an event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signal(u16);

impl Signal {
    /// Dispatched once to every active object before its event loop starts.
    pub const INIT: Self = Self(0);
    /// Triggers the entry action of the state just entered.
    pub const ENTRY: Self = Self(1);
    /// First raw value available to modules.
    pub const USER_BASE: u16 = 2;

    /// The `offset`-th module-defined signal.
    pub const fn user(offset: u16) -> Self {
        Self(Self::USER_BASE + offset)
    }

    /// Raw integer value.
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// True for the lifecycle signals shared by all active objects.
    pub const fn is_reserved(self) -> bool {
        self.0 < Self::USER_BASE
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::INIT => write!(f, "INIT"),
            Self::ENTRY => write!(f, "ENTRY"),
            Self(raw) => write!(f, "USER+{}", raw - Self::USER_BASE),
        }
    }
}

/// A signal with an optional payload of module type `P`.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<P = ()> {
    signal: Signal,
    payload: Option<P>,
}

impl<P> Event<P> {
    /// Payload-free event.
    pub const fn new(signal: Signal) -> Self {
        Self {
            signal,
            payload: None,
        }
    }

    /// Event carrying `payload`.
    pub fn with_payload(signal: Signal, payload: P) -> Self {
        Self {
            signal,
            payload: Some(payload),
        }
    }

    /// The synthetic event dispatched before the event loop starts.
    pub const fn init() -> Self {
        Self::new(Signal::INIT)
    }

    pub const fn signal(&self) -> Signal {
        self.signal
    }

    pub fn payload(&self) -> Option<&P> {
        self.payload.as_ref()
    }
}
