//! Reflow controller service: the hexagonal core wired into an active
//! object.
//!
//! [`ReflowController`] owns the FSM and its context and is the event
//! handler of the `reflow` active object.  [`build`] assembles the whole
//! system from configuration and injected ports; nothing in here touches
//! hardware directly.
//!
//! ```text
//!  ThermocouplePort ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                       │     ReflowController      │
//!       HeaterPort ◀────│  FSM · Safety · PID       │ ──▶ StatusBoard
//!                       └──────────────────────────┘
//!                          ▲ mailbox (5 events)
//!         Console ─────────┤
//!   phase / sample clocks ─┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use log::info;

use crate::active::{Active, ActiveBuilder, ActiveRef, EventHandler, ThreadConfig};
use crate::config::SystemConfig;
use crate::error::Result;
use crate::fsm::context::{Clocks, ReflowContext};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, ReflowEvent, ReflowPayload, StateId};
use crate::profile::ReflowProfile;
use crate::time_event::{TickSource, TimeEventService};

use super::console::Console;
use super::ports::{EventSink, HeaterPort, ThermocouplePort};
use super::status::{ReflowStatus, StatusBoard};

/// Depth of the controller's mailbox.
pub const MAILBOX_CAPACITY: usize = 5;

/// Name of the controller's active object and thread.
pub const CONTROLLER_NAME: &str = "reflow";

// ───────────────────────────────────────────────────────────────
// ReflowController
// ───────────────────────────────────────────────────────────────

/// Event handler of the reflow active object.
pub struct ReflowController {
    fsm: Fsm,
    ctx: ReflowContext,
    status: Arc<StatusBoard>,
}

impl ReflowController {
    pub fn new(ctx: ReflowContext, status: Arc<StatusBoard>) -> Self {
        Self {
            fsm: Fsm::new(build_state_table(), StateId::Idle),
            ctx,
            status,
        }
    }

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn context(&self) -> &ReflowContext {
        &self.ctx
    }

    pub fn transitions(&self) -> u64 {
        self.fsm.transitions()
    }
}

impl EventHandler for ReflowController {
    type Payload = ReflowPayload;

    fn dispatch(&mut self, event: &ReflowEvent) {
        self.fsm.dispatch(&mut self.ctx, event);
        self.status.publish(ReflowStatus::capture(&self.ctx));
    }
}

/// The reflow active object.
pub type ReflowActive = Active<ReflowController, MAILBOX_CAPACITY>;

// ───────────────────────────────────────────────────────────────
// Assembly
// ───────────────────────────────────────────────────────────────

/// Adapters injected into the controller.
pub struct ReflowParts {
    pub thermocouple: Box<dyn ThermocouplePort>,
    pub heater: Box<dyn HeaterPort>,
    pub sink: Box<dyn EventSink>,
    /// Drives the phase clock at `tick_period_ms`.
    pub phase_ticks: Box<dyn TickSource>,
    /// Drives the sample clock at the PID sample period.
    pub sample_ticks: Box<dyn TickSource>,
}

/// A built, not yet started, reflow controller.
pub struct ReflowSystem {
    pub active: ReflowActive,
    pub status: Arc<StatusBoard>,
    pub clocks: Clocks,
    profile: ReflowProfile,
}

/// Validate `config` and wire the controller, its clocks and its status
/// board.  Nothing runs until [`ReflowSystem::spawn`] or
/// [`Active::dispatch_pending`].
pub fn build(config: SystemConfig, parts: ReflowParts) -> Result<ReflowSystem> {
    config.validate()?;

    let builder = ActiveBuilder::<ReflowController, MAILBOX_CAPACITY>::new(CONTROLLER_NAME);
    let me = builder.handle();

    let phase = TimeEventService::new(
        "phase-clock",
        Duration::from_millis(u64::from(config.tick_period_ms)),
        parts.phase_ticks,
    );
    let sample = TimeEventService::new(
        "sample-clock",
        Duration::from_millis(config.sample_period_ms()),
        parts.sample_ticks,
    );
    let clocks = Clocks::register(phase, sample, &me)?;

    let status = Arc::new(StatusBoard::new(ReflowStatus::initial(&config)));
    let profile = config.profile;
    info!(
        "reflow: building controller (Ts={} ms, tick={} ms, max {:.1} C)",
        config.sample_period_ms(),
        config.tick_period_ms,
        config.max_temperature_c
    );

    let ctx = ReflowContext::new(
        config,
        parts.thermocouple,
        parts.heater,
        parts.sink,
        clocks.clone(),
        me,
    );
    let active = builder
        .handler(ReflowController::new(ctx, status.clone()))
        .build()?;

    Ok(ReflowSystem {
        active,
        status,
        clocks,
        profile,
    })
}

impl ReflowSystem {
    /// Console bound to this controller.
    pub fn console(&self) -> Console {
        Console::new(self.active.handle(), self.status.clone(), self.profile)
    }

    pub fn handle(&self) -> ActiveRef<ReflowPayload> {
        self.active.handle()
    }

    /// Start the controller on its own thread and return its console.
    pub fn spawn(self, thread: ThreadConfig) -> Result<Console> {
        let console = self.console();
        self.active.start(thread)?;
        Ok(console)
    }
}
