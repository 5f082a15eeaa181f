//! Periodic tick source.
//!
//! On the target this would be a hardware timer whose callback runs in the
//! timer task.  On the host a dedicated thread sleeps until the next
//! deadline and invokes the callback, so ticks keep a fixed cadence even
//! when a callback runs long (missed deadlines are skipped, not bunched).

use std::thread;
use std::time::{Duration, Instant};

use log::{error, info, warn};

use crate::error::{Error, Result};
use crate::time_event::{TickFn, TickSource};

/// Thread-backed periodic ticker.
#[derive(Debug, Clone, Copy)]
pub struct ThreadTicker {
    name: &'static str,
}

impl ThreadTicker {
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl TickSource for ThreadTicker {
    fn start(&self, period: Duration, on_tick: TickFn) -> Result<()> {
        if period.is_zero() {
            return Err(Error::Argument("tick period must be non-zero"));
        }
        let name = self.name;
        thread::Builder::new()
            .name(name.into())
            .spawn(move || run(name, period, &on_tick))
            .map_err(|e| {
                error!("hw_timer: '{name}' thread spawn failed: {e}");
                Error::ResourceExhausted("tick thread")
            })?;
        info!("hw_timer: '{name}' ticking every {period:?}");
        Ok(())
    }
}

fn run(name: &str, period: Duration, on_tick: &TickFn) {
    let mut next = Instant::now() + period;
    loop {
        let now = Instant::now();
        if next > now {
            thread::sleep(next - now);
        }
        on_tick();
        next += period;

        let now = Instant::now();
        if next < now {
            let behind = now - next;
            let skipped = (behind.as_nanos() / period.as_nanos()) as u32 + 1;
            warn!("hw_timer: '{name}' overran, skipping {skipped} tick(s)");
            next += period * skipped;
        }
    }
}
