//! Active-object runtime.
//!
//! Every subsystem that owns mutable state runs as an active object: one
//! thread, one bounded mailbox, one handler.  Producers anywhere in the
//! system (other threads, timer callbacks, interrupt shims) post events
//! without blocking; the object's thread takes them out one at a time and
//! runs the handler to completion before looking at the next one.
//!
//! ```text
//!  console ───┐
//!  timers ────┼──▶ post() ──▶ ┌─────────────┐     ┌──────────────────┐
//!  handler ───┘   (non-block) │ Mailbox (N) │ ──▶ │ dispatch loop    │
//!                             └─────────────┘     │ Init, then FIFO  │
//!                                                 │ handler.dispatch │
//!                                                 └──────────────────┘
//! ```
//!
//! The handler must never block or sleep.  That single rule is what lets
//! handler state live without locks: only the object's own thread ever
//! touches it, and it never yields in the middle of an event.

pub mod event;

use std::sync::Arc;
use std::thread;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{debug, error, info};

use crate::error::{Error, Result};
pub use event::{Event, Signal};

// ---------------------------------------------------------------------------
// Handler contract
// ---------------------------------------------------------------------------

/// The single polymorphic dispatch function of an active object.
pub trait EventHandler: Send + 'static {
    /// Module-specific payload carried by this object's events.
    type Payload: Send + 'static;

    /// Handle one event to completion.  Must not block.
    fn dispatch(&mut self, event: &Event<Self::Payload>);
}

// ---------------------------------------------------------------------------
// Mailbox
// ---------------------------------------------------------------------------

/// Bounded FIFO of pending events.  Capacity `N` is fixed at compile time.
pub struct Mailbox<E, const N: usize> {
    channel: Channel<CriticalSectionRawMutex, E, N>,
}

impl<E: Send, const N: usize> Mailbox<E, N> {
    pub fn new() -> Self {
        const { assert!(N > 0, "mailbox capacity must be non-zero") };
        Self {
            channel: Channel::new(),
        }
    }

    /// Non-blocking enqueue.  `Err(TimedOut)` if the mailbox is full.
    pub fn try_post(&self, event: E) -> Result<()> {
        self.channel.try_send(event).map_err(|_| Error::TimedOut)
    }

    /// Block the calling thread until an event is available.
    pub fn take(&self) -> E {
        futures_lite::future::block_on(self.channel.receive())
    }

    /// Take the oldest pending event, if any.
    pub fn try_take(&self) -> Option<E> {
        self.channel.try_receive().ok()
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<E: Send, const N: usize> Default for Mailbox<E, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased posting side of a mailbox.
trait Post<E>: Send + Sync {
    fn post(&self, event: E) -> Result<()>;
}

impl<E: Send, const N: usize> Post<E> for Mailbox<E, N> {
    fn post(&self, event: E) -> Result<()> {
        self.try_post(event)
    }
}

// ---------------------------------------------------------------------------
// ActiveRef: posting handle
// ---------------------------------------------------------------------------

/// Cloneable handle used to post events to an active object.
///
/// Safe to use from any thread.  Posting never blocks: a full mailbox is
/// reported as [`Error::TimedOut`] and the caller chooses whether to drop,
/// count or escalate.
pub struct ActiveRef<P> {
    name: &'static str,
    queue: Arc<dyn Post<Event<P>>>,
}

impl<P: Send + 'static> ActiveRef<P> {
    /// Handle posting into a free-standing mailbox.  Useful when the
    /// consumer is driven by hand rather than by an [`Active`] object.
    pub fn new<const N: usize>(name: &'static str, mailbox: Arc<Mailbox<Event<P>, N>>) -> Self {
        Self {
            name,
            queue: mailbox,
        }
    }

    pub fn post(&self, event: Event<P>) -> Result<()> {
        self.queue.post(event)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<P> Clone for ActiveRef<P> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            queue: Arc::clone(&self.queue),
        }
    }
}

impl<P> core::fmt::Debug for ActiveRef<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ActiveRef").field("name", &self.name).finish()
    }
}

// ---------------------------------------------------------------------------
// Thread configuration
// ---------------------------------------------------------------------------

/// Attributes of the thread an active object runs on.
#[derive(Debug, Clone, Copy)]
pub struct ThreadConfig {
    pub name: &'static str,
    /// Stack size in bytes; `None` uses the platform default.
    pub stack_size: Option<usize>,
}

impl ThreadConfig {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            stack_size: None,
        }
    }

    pub const fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

/// Two-step constructor: the mailbox (and therefore the posting handle)
/// exists before the handler, so time events and the handler itself can be
/// wired to the object during startup.
pub struct ActiveBuilder<H: EventHandler, const N: usize> {
    name: &'static str,
    mailbox: Arc<Mailbox<Event<H::Payload>, N>>,
    handler: Option<H>,
}

impl<H: EventHandler, const N: usize> ActiveBuilder<H, N> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            mailbox: Arc::new(Mailbox::new()),
            handler: None,
        }
    }

    /// Posting handle, valid before the object is built or started.
    pub fn handle(&self) -> ActiveRef<H::Payload> {
        ActiveRef::new(self.name, self.mailbox.clone())
    }

    /// Bind the event handler.
    #[must_use]
    pub fn handler(mut self, handler: H) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Fails with [`Error::Argument`] if no handler was bound.
    pub fn build(self) -> Result<Active<H, N>> {
        let handler = self
            .handler
            .ok_or(Error::Argument("active object has no event handler"))?;
        info!("{}: constructed (mailbox capacity {})", self.name, N);
        Ok(Active {
            name: self.name,
            handler,
            mailbox: self.mailbox,
            initialised: false,
        })
    }
}

// ---------------------------------------------------------------------------
// Active object
// ---------------------------------------------------------------------------

/// An execution unit with a private mailbox and a serialized handler.
pub struct Active<H: EventHandler, const N: usize> {
    name: &'static str,
    handler: H,
    mailbox: Arc<Mailbox<Event<H::Payload>, N>>,
    initialised: bool,
}

impl<H: EventHandler, const N: usize> Active<H, N> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn handle(&self) -> ActiveRef<H::Payload> {
        ActiveRef::new(self.name, self.mailbox.clone())
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Number of events waiting in the mailbox.
    pub fn pending(&self) -> usize {
        self.mailbox.len()
    }

    /// Dispatch the synthetic Init event.  Runs at most once.
    pub fn init(&mut self) {
        if !self.initialised {
            self.initialised = true;
            self.handler.dispatch(&Event::init());
        }
    }

    /// Drive the object on the caller's thread: run Init if it has not run
    /// yet, then dispatch every pending event (including ones the handler
    /// posts to itself) in FIFO order.  Returns the number dispatched.
    pub fn dispatch_pending(&mut self) -> usize {
        self.init();
        let mut dispatched = 0;
        while let Some(event) = self.mailbox.try_take() {
            self.handler.dispatch(&event);
            dispatched += 1;
        }
        dispatched
    }

    /// Move the object onto its own thread and start the event loop.
    ///
    /// Failing to create the thread is [`Error::ResourceExhausted`]; the
    /// boot sequence treats it as fatal.
    pub fn start(self, config: ThreadConfig) -> Result<ActiveRef<H::Payload>> {
        let handle = self.handle();
        let mut builder = thread::Builder::new().name(config.name.into());
        if let Some(bytes) = config.stack_size {
            builder = builder.stack_size(bytes);
        }
        let name = self.name;
        builder.spawn(move || event_loop(self)).map_err(|e| {
            error!("{name}: thread spawn failed: {e}");
            Error::ResourceExhausted("active object thread")
        })?;
        info!("{name}: started on thread '{}'", config.name);
        Ok(handle)
    }
}

/// Common event loop for every active object.
fn event_loop<H: EventHandler, const N: usize>(mut active: Active<H, N>) {
    active.init();
    loop {
        let event = active.mailbox.take();
        debug!("{}: dispatching {}", active.name, event.signal());
        active.handler.dispatch(&event);
    }
}
