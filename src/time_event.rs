//! Time-event service.
//!
//! A fixed table of software timers driven by one periodic tick source.
//! Each registered time event belongs to an active object and carries the
//! event that is posted to it when the countdown expires.
//!
//! ```text
//!  TickSource (own thread / HW timer)
//!        │ every tick
//!        ▼
//!  ┌─────────────────────────────────────────────┐
//!  │ slot 0 │ slot 1 │ ...           │ slot N-1  │  countdown / reload
//!  └────┬────────┬───────────────────────────────┘  (critical section)
//!       │        │  countdown hits zero
//!       ▼        ▼
//!  owner.post(event)  ──▶  owner mailbox
//! ```
//!
//! * `countdown == 0` means disarmed.
//! * `reload == 0` makes the timer one-shot; otherwise it re-arms with
//!   `reload` ticks every time it fires.
//! * Registration happens during single-threaded startup (it takes
//!   `&mut self`), so the table itself is never locked.  Only the
//!   countdown/reload pair of each slot is shared between the owner
//!   thread (arm/disarm) and the tick context, and both sides touch it
//!   inside the same critical section.
//! * Disarming does not retract an event already posted.  Owners must
//!   tolerate one stray timeout after cancelling.

use core::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use critical_section::Mutex;
use log::{error, info, warn};

use crate::active::{ActiveRef, Event};
use crate::error::{Error, Result, halt};

/// Maximum number of registered time events across one service.
pub const MAX_TIME_EVENTS: usize = 10;

// ═══════════════════════════════════════════════════════════════
//  Tick source
// ═══════════════════════════════════════════════════════════════

/// Callback invoked once per tick.
pub type TickFn = Box<dyn Fn() + Send + 'static>;

/// Something that can call a function periodically.
///
/// Implementations run `on_tick` from their own execution context
/// (a thread, a hardware timer task); it must not be called re-entrantly.
pub trait TickSource: Send + Sync {
    fn start(&self, period: Duration, on_tick: TickFn) -> Result<()>;
}

/// Tick source that never ticks on its own.
///
/// Tests and single-threaded simulations drive the service by calling
/// [`TimeEventService::tick`] directly.  The number of `start` calls is
/// recorded so lazy start-up can be observed.
#[derive(Debug, Default)]
pub struct ManualTickSource {
    starts: AtomicU32,
}

impl ManualTickSource {
    pub const fn new() -> Self {
        Self {
            starts: AtomicU32::new(0),
        }
    }

    pub fn start_count(&self) -> u32 {
        self.starts.load(Ordering::Acquire)
    }
}

impl TickSource for ManualTickSource {
    fn start(&self, _period: Duration, _on_tick: TickFn) -> Result<()> {
        self.starts.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

impl<T: TickSource> TickSource for Arc<T> {
    fn start(&self, period: Duration, on_tick: TickFn) -> Result<()> {
        (**self).start(period, on_tick)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Registry
// ═══════════════════════════════════════════════════════════════

/// Handle to a registered time event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeEventId(usize);

#[derive(Debug, Clone, Copy, Default)]
struct Counter {
    countdown: u32,
    reload: u32,
}

type PostFn = Box<dyn Fn() -> Result<()> + Send + Sync>;

struct Slot {
    owner: &'static str,
    post: PostFn,
    counter: Mutex<Cell<Counter>>,
}

/// Registry of software timers sharing one tick source.
pub struct TimeEventService {
    name: &'static str,
    tick_period: Duration,
    slots: heapless::Vec<Slot, MAX_TIME_EVENTS>,
    ticker: Box<dyn TickSource>,
    started: AtomicBool,
}

impl TimeEventService {
    pub fn new(name: &'static str, tick_period: Duration, ticker: Box<dyn TickSource>) -> Self {
        Self {
            name,
            tick_period,
            slots: heapless::Vec::new(),
            ticker,
            started: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn tick_period(&self) -> Duration {
        self.tick_period
    }

    /// Number of registered time events.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether the tick source has been started.
    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Register a time event that posts `event` to `owner`.  Startup only.
    ///
    /// The event is cloned on every expiry, so payload-carrying events are
    /// never shared between posts.
    pub fn register<P>(&mut self, owner: ActiveRef<P>, event: Event<P>) -> Result<TimeEventId>
    where
        P: Clone + Send + Sync + 'static,
    {
        let index = self.slots.len();
        let owner_name = owner.name();
        let slot = Slot {
            owner: owner_name,
            post: Box::new(move || owner.post(event.clone())),
            counter: Mutex::new(Cell::new(Counter::default())),
        };
        self.slots
            .push(slot)
            .map_err(|_| Error::ResourceExhausted("time event table"))?;
        info!(
            "{}: registered time event {} for '{}' ({}/{})",
            self.name,
            index,
            owner_name,
            index + 1,
            MAX_TIME_EVENTS
        );
        Ok(TimeEventId(index))
    }

    /// Arm `id` to fire after `countdown` ticks, then every `reload` ticks
    /// (`reload == 0` is one-shot).  The first arm on this service starts
    /// its tick source; a source that cannot start halts.
    pub fn arm(self: &Arc<Self>, id: TimeEventId, countdown: u32, reload: u32) {
        if let Err(e) = self.try_arm(id, countdown, reload) {
            halt(&format!("{}: tick source failed to start: {e}", self.name));
        }
    }

    /// Like [`arm`](Self::arm), but a tick source that fails to start is
    /// reported instead of halting.  On failure `id` is left disarmed and
    /// the next arm retries the start.
    pub fn try_arm(self: &Arc<Self>, id: TimeEventId, countdown: u32, reload: u32) -> Result<()> {
        let Some(slot) = self.slots.get(id.0) else {
            warn!("{}: arm of unknown time event {}", self.name, id.0);
            return Ok(());
        };
        critical_section::with(|cs| {
            slot.counter.borrow(cs).set(Counter { countdown, reload });
        });
        if let Err(e) = self.ensure_started() {
            critical_section::with(|cs| slot.counter.borrow(cs).set(Counter::default()));
            error!("{}: time event {} not armed: {e}", self.name, id.0);
            return Err(e);
        }
        info!(
            "{}: armed time event {} for '{}' (countdown={}, reload={})",
            self.name, id.0, slot.owner, countdown, reload
        );
        Ok(())
    }

    /// Stop `id` from firing.  An event already posted is not retracted.
    pub fn disarm(&self, id: TimeEventId) {
        let Some(slot) = self.slots.get(id.0) else {
            return;
        };
        let was_armed = critical_section::with(|cs| {
            let cell = slot.counter.borrow(cs);
            let mut c = cell.get();
            let was_armed = c.countdown != 0;
            c.countdown = 0;
            cell.set(c);
            was_armed
        });
        if was_armed {
            info!("{}: disarmed time event {} for '{}'", self.name, id.0, slot.owner);
        }
    }

    pub fn is_armed(&self, id: TimeEventId) -> bool {
        self.slots.get(id.0).is_some_and(|slot| {
            critical_section::with(|cs| slot.counter.borrow(cs).get().countdown != 0)
        })
    }

    /// Advance every armed time event by one tick and post the ones that
    /// expire.  Called from the tick source's context.
    pub fn tick(&self) {
        let mut due: heapless::Vec<usize, MAX_TIME_EVENTS> = heapless::Vec::new();

        critical_section::with(|cs| {
            for (index, slot) in self.slots.iter().enumerate() {
                let cell = slot.counter.borrow(cs);
                let mut c = cell.get();
                if c.countdown == 0 {
                    continue;
                }
                c.countdown -= 1;
                if c.countdown == 0 {
                    c.countdown = c.reload;
                    // Capacity matches the slot table, so this cannot fail.
                    let _ = due.push(index);
                }
                cell.set(c);
            }
        });

        // Post outside the critical section: mailboxes take their own.
        for index in due {
            let slot = &self.slots[index];
            if let Err(e) = (slot.post)() {
                warn!(
                    "{}: time event {} for '{}' dropped: {}",
                    self.name, index, slot.owner, e
                );
            }
        }
    }

    fn ensure_started(self: &Arc<Self>) -> Result<()> {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }
        let weak: Weak<Self> = Arc::downgrade(self);
        let on_tick: TickFn = Box::new(move || {
            if let Some(service) = weak.upgrade() {
                service.tick();
            }
        });
        if let Err(e) = self.ticker.start(self.tick_period, on_tick) {
            self.started.store(false, Ordering::Release);
            return Err(e);
        }
        info!("{}: tick source started ({:?} period)", self.name, self.tick_period);
        Ok(())
    }
}

impl core::fmt::Debug for TimeEventService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TimeEventService")
            .field("name", &self.name)
            .field("tick_period", &self.tick_period)
            .field("registered", &self.slots.len())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
