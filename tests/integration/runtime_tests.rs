//! Threaded runtime tests: active objects on their own threads, time
//! events driven by real periodic tickers.
//!
//! Timings are loose on purpose; every wait polls with a deadline.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use reflow::active::{ActiveBuilder, Event, EventHandler, Signal, ThreadConfig};
use reflow::adapters::{PlantParams, SimulatedOven};
use reflow::app::service::{self, ReflowParts};
use reflow::config::SystemConfig;
use reflow::drivers::ThreadTicker;
use reflow::fsm::StateId;
use reflow::profile::Phase;
use reflow::time_event::TimeEventService;

use crate::mock_hw::RecordingSink;

const DEADLINE: Duration = Duration::from_secs(10);

fn wait_for(cond: impl Fn() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < DEADLINE {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

const PING: Signal = Signal::user(0);

struct Counter {
    pings: Arc<AtomicUsize>,
}

impl EventHandler for Counter {
    type Payload = ();

    fn dispatch(&mut self, event: &Event<()>) {
        if event.signal() == PING {
            self.pings.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[test]
fn periodic_time_event_reaches_threaded_active_object() {
    let pings = Arc::new(AtomicUsize::new(0));
    let active = ActiveBuilder::<Counter, 4>::new("counter")
        .handler(Counter {
            pings: pings.clone(),
        })
        .build()
        .unwrap();
    let handle = active.start(ThreadConfig::new("counter")).unwrap();

    let mut clock = TimeEventService::new(
        "test-clock",
        Duration::from_millis(2),
        Box::new(ThreadTicker::new("test-tick")),
    );
    let id = clock.register(handle, Event::new(PING)).unwrap();
    let clock = Arc::new(clock);
    clock.arm(id, 1, 1);
    assert!(clock.is_running());

    assert!(wait_for(|| pings.load(Ordering::SeqCst) >= 5));

    clock.disarm(id);
    thread::sleep(Duration::from_millis(20));
    let settled = pings.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(pings.load(Ordering::SeqCst), settled);
}

/// Fast clocks and a short profile so a run finishes in wall-clock
/// milliseconds.
fn fast_config() -> SystemConfig {
    let mut config = SystemConfig::default();
    config.tick_period_ms = 5;
    config.pid.sample_period_secs = 0.005;
    config.profile.soak = Phase::HoldDuration {
        target_c: 150.0,
        duration_secs: 1,
    };
    config.profile.peak = Phase::HoldDuration {
        target_c: 215.0,
        duration_secs: 1,
    };
    config
}

#[test]
fn controller_runs_on_its_own_thread() {
    let config = fast_config();
    let oven = SimulatedOven::new(PlantParams {
        step_secs: 0.5,
        ..PlantParams::default()
    });
    let sink = RecordingSink::new();
    let system = service::build(
        config,
        ReflowParts {
            thermocouple: Box::new(oven.clone()),
            heater: Box::new(oven.clone()),
            sink: Box::new(sink.clone()),
            phase_ticks: Box::new(ThreadTicker::new("phase-tick")),
            sample_ticks: Box::new(ThreadTicker::new("sample-tick")),
        },
    )
    .unwrap();
    let status = system.status.clone();
    let console = system
        .spawn(ThreadConfig::new("reflow").with_stack_size(256 * 1024))
        .unwrap();

    console.execute_line("reflow start");
    assert!(wait_for(|| status.snapshot().state == StateId::Soak));
    assert!(oven.is_heating());

    console.execute_line("reflow stop");
    assert!(wait_for(|| status.snapshot().state == StateId::Idle));
    assert!(wait_for(|| !oven.is_heating()));
    assert_eq!(oven.applied_command(), 0.0);
    assert!(sink.states_entered().contains(&StateId::Preheat));
}
