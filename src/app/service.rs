//! Elevator core service — the hexagonal core.
//!
//! [`ElevatorCore`] owns the debouncer, encoder poller, planner and safety
//! monitor together with the state they share.  All I/O flows through port
//! traits passed in at call sites, so the whole core runs against mocks.
//!
//! ```text
//!  RawInputPort ──▶ ┌───────────────────────────────┐ ──▶ EventSink
//!                   │          ElevatorCore          │
//!       CarPort ◀── │ Debouncer · Tracker · Planner  │
//! MotorObserver ──▶ │ SafetyMonitor                  │
//!                   └───────────────────────────────┘
//! ```
//!
//! Two ways to run it:
//!
//! - **Deterministic**: the caller invokes [`ElevatorCore::poll_inputs`],
//!   [`poll_encoder`](ElevatorCore::poll_encoder),
//!   [`run_planner`](ElevatorCore::run_planner) and
//!   [`run_safety`](ElevatorCore::run_safety) on its own clock.
//! - **Threaded**: [`ElevatorCore::spawn`] starts one periodic thread per
//!   component.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use log::{error, info};

use crate::config::SystemConfig;
use crate::drivers::debounce::{InputDebouncer, InputHealth};
use crate::error::{Error, Requirement, Result};
use crate::events::EventChannel;
use crate::planner::queue::{Floor, FloorRequestQueue, SharedFloorQueue};
use crate::planner::{Planner, PlannerState, PlannerTarget};
use crate::safety::{EmergencyLatch, MonitorStatus, SafetyMonitor, SafetySampler};
use crate::scheduler::{
    DEBOUNCER_PRIORITY, PLANNER_PRIORITY, SAFETY_PRIORITY, TRACKER_PRIORITY, TaskSpec, spawn_task,
};
use crate::sensors::position::{EncoderPoller, PositionTracker};

use super::events::AppEvent;
use super::ports::{CarPort, EventSink, MotorObserverPort, RawInputPort};

/// Run one debouncer poll and forward the confirmed events.
fn debounce_into<I: RawInputPort + ?Sized>(
    debouncer: &mut InputDebouncer,
    inputs: &I,
    channel: &EventChannel,
    send_timeout: Duration,
) -> usize {
    let mut sent = 0;
    for event in debouncer.poll(inputs) {
        match channel.send_timeout(event, send_timeout) {
            Ok(()) => sent += 1,
            Err(e) => error!("event {:?} dropped: {}", event, Error::from(e)),
        }
    }
    sent
}

// ───────────────────────────────────────────────────────────────
// Shared state views
// ───────────────────────────────────────────────────────────────

/// Read-only handles onto the state shared between the core tasks.
#[derive(Clone)]
pub struct CoreView {
    tracker: Arc<PositionTracker>,
    queue: Arc<SharedFloorQueue>,
    latch: Arc<EmergencyLatch>,
    health: Arc<InputHealth>,
    target: Arc<PlannerTarget>,
}

impl CoreView {
    pub fn position(&self) -> i32 {
        self.tracker.get_position()
    }

    pub fn queue(&self) -> FloorRequestQueue {
        self.queue.snapshot()
    }

    pub fn planner_target(&self) -> i32 {
        self.target.get()
    }

    pub fn emergency_stopped(&self) -> bool {
        self.latch.is_set()
    }

    /// Requirement that halted the car, if any.
    pub fn violation(&self) -> Option<Requirement> {
        self.latch.violation()
    }

    pub fn inputs_stable(&self) -> bool {
        self.health.all_stable()
    }
}

// ───────────────────────────────────────────────────────────────
// ElevatorCore
// ───────────────────────────────────────────────────────────────

pub struct ElevatorCore {
    config: SystemConfig,
    channel: Arc<EventChannel>,
    view: CoreView,
    debouncer: InputDebouncer,
    encoder: EncoderPoller,
    planner: Planner,
    monitor: SafetyMonitor,
    sampler: SafetySampler,
}

impl ElevatorCore {
    /// Build the core from a validated configuration.  The tracker starts at
    /// floor 1.
    pub fn new(config: SystemConfig) -> Result<Self> {
        config.validate()?;

        let tracker = Arc::new(PositionTracker::new(config.floor_position(Floor::Floor1)));
        let queue = Arc::new(SharedFloorQueue::new());
        let latch = Arc::new(EmergencyLatch::new());
        let health = Arc::new(InputHealth::new());
        let target = Arc::new(PlannerTarget::new(config.floor_position(Floor::Floor1)));

        let planner = Planner::new(
            &config,
            queue.clone(),
            target.clone(),
            latch.clone(),
        );
        let monitor = SafetyMonitor::new(&config, latch.clone());
        let sampler = SafetySampler::new(tracker.clone(), health.clone(), target.clone());

        Ok(Self {
            debouncer: InputDebouncer::new(health.clone()),
            encoder: EncoderPoller::new(),
            planner,
            monitor,
            sampler,
            channel: Arc::new(EventChannel::new()),
            view: CoreView {
                tracker,
                queue,
                latch,
                health,
                target,
            },
            config,
        })
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// The tracker the motor side must keep informed of its direction.
    pub fn tracker(&self) -> Arc<PositionTracker> {
        self.view.tracker.clone()
    }

    pub fn view(&self) -> CoreView {
        self.view.clone()
    }

    pub fn channel(&self) -> &EventChannel {
        &self.channel
    }

    pub fn planner_state(&self) -> PlannerState {
        self.planner.state()
    }

    pub fn monitor(&self) -> &SafetyMonitor {
        &self.monitor
    }

    pub fn start<S: EventSink + ?Sized>(&self, sink: &mut S) {
        let floor = self.planner.state().current_floor;
        sink.emit(&AppEvent::Started { floor });
        info!("ElevatorCore started at {}", floor);
    }

    // ── Per-period steps ──────────────────────────────────────

    /// One debouncer period.  Returns the number of events forwarded.
    pub fn poll_inputs<I: RawInputPort + ?Sized>(&mut self, inputs: &I) -> usize {
        let timeout = Duration::from_millis(self.config.event_send_timeout_ms as u64);
        debounce_into(&mut self.debouncer, inputs, &self.channel, timeout)
    }

    /// One tracker period.  Returns `true` if a pulse was counted.
    pub fn poll_encoder<I: RawInputPort + ?Sized>(&mut self, inputs: &I) -> bool {
        self.encoder.poll(inputs, &self.view.tracker)
    }

    /// One planner cycle.
    pub fn run_planner<C, S>(&mut self, car: &C, sink: &mut S)
    where
        C: CarPort + ?Sized,
        S: EventSink + ?Sized,
    {
        self.planner.run_cycle(&self.channel, car, sink);
    }

    /// One safety monitor tick.
    pub fn run_safety<H, S>(&mut self, hw: &H, sink: &mut S) -> MonitorStatus
    where
        H: RawInputPort + CarPort + MotorObserverPort + ?Sized,
        S: EventSink + ?Sized,
    {
        let obs = self.sampler.observe(hw, hw);
        self.monitor.tick(&obs, hw, sink)
    }

    // ── Threaded runtime ──────────────────────────────────────

    /// Start the four periodic tasks.
    ///
    /// Each task receives its own clone of `sink`.
    pub fn spawn<H, S>(self, hw: Arc<H>, sink: S) -> Result<RunningCore>
    where
        H: RawInputPort + CarPort + MotorObserverPort + Send + Sync + 'static,
        S: EventSink + Clone + Send + 'static,
    {
        let Self {
            config,
            channel,
            view,
            mut debouncer,
            mut encoder,
            mut planner,
            mut monitor,
            sampler,
        } = self;

        let shutdown = Arc::new(AtomicBool::new(false));
        let mut running = RunningCore {
            shutdown: shutdown.clone(),
            handles: Vec::with_capacity(4),
            view: view.clone(),
        };

        let spawn = |task: TaskSpec, body: Box<dyn FnMut() + Send>| {
            spawn_task(task, shutdown.clone(), body).map_err(|e| {
                error!("cannot spawn '{}': {}", task.name, e);
                Error::Init("task spawn failed")
            })
        };

        {
            let hw = hw.clone();
            let mut sink = sink.clone();
            running.push(spawn(
                TaskSpec::new("safety", config.safety_period_ms, SAFETY_PRIORITY),
                Box::new(move || {
                    let obs = sampler.observe(&*hw, &*hw);
                    monitor.tick(&obs, &*hw, &mut sink);
                }),
            ))?;
        }
        {
            let hw = hw.clone();
            let tracker = view.tracker.clone();
            running.push(spawn(
                TaskSpec::new("tracker", config.tracker_poll_ms, TRACKER_PRIORITY),
                Box::new(move || {
                    encoder.poll(&*hw, &tracker);
                }),
            ))?;
        }
        {
            let hw = hw.clone();
            let channel = channel.clone();
            let timeout = Duration::from_millis(config.event_send_timeout_ms as u64);
            running.push(spawn(
                TaskSpec::new("debouncer", config.debounce_poll_ms, DEBOUNCER_PRIORITY),
                Box::new(move || {
                    debounce_into(&mut debouncer, &*hw, &channel, timeout);
                }),
            ))?;
        }
        {
            let mut sink = sink;
            running.push(spawn(
                TaskSpec::new("planner", config.planner_period_ms, PLANNER_PRIORITY),
                Box::new(move || {
                    planner.run_cycle(&channel, &*hw, &mut sink);
                }),
            ))?;
        }

        info!("ElevatorCore running ({} tasks)", running.handles.len());
        Ok(running)
    }
}

// ───────────────────────────────────────────────────────────────
// RunningCore
// ───────────────────────────────────────────────────────────────

/// Handle to the spawned core tasks.
pub struct RunningCore {
    shutdown: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
    view: CoreView,
}

impl RunningCore {
    fn push(&mut self, handle: Result<JoinHandle<()>>) -> Result<()> {
        match handle {
            Ok(h) => {
                self.handles.push(h);
                Ok(())
            }
            Err(e) => {
                self.shutdown.store(true, Ordering::Release);
                Err(e)
            }
        }
    }

    pub fn view(&self) -> &CoreView {
        &self.view
    }

    /// Signal every task to stop and wait for them.
    ///
    /// Returns [`Error::Safety`] when the monitor halted the car while the
    /// tasks were running.
    pub fn stop(self) -> Result<()> {
        self.shutdown.store(true, Ordering::Release);
        let mut failed = false;
        for handle in self.handles {
            failed |= handle.join().is_err();
        }
        if failed {
            return Err(Error::Init("a core task panicked"));
        }
        info!("ElevatorCore stopped");
        match self.view.violation() {
            Some(requirement) => Err(requirement.into()),
            None => Ok(()),
        }
    }
}
