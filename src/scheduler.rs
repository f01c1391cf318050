//! Periodic task scheduling.
//!
//! Every component of the core runs as its own fixed-period activity:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  task        period   priority                               │
//! │  ─────────   ──────   ────────                               │
//! │  safety      10 ms    5   ── CarObservation ─▶ SafetyMonitor │
//! │  tracker      3 ms    4   ── encoder line  ─▶ PositionTracker│
//! │  debouncer   10 ms    3   ── raw lines     ─▶ EventChannel   │
//! │  planner     10 ms    2   ── EventChannel  ─▶ CarPort        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each task sleeps until the next monotonic deadline, so a slow iteration
//! does not shift later ones.  Priorities are nominal on the host: they are
//! logged and handed to the platform where a priority-aware scheduler
//! exists.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{info, warn};

/// Static description of one periodic task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSpec {
    pub name: &'static str,
    pub period: Duration,
    /// Higher runs first.
    pub priority: u8,
}

impl TaskSpec {
    pub const fn new(name: &'static str, period_ms: u32, priority: u8) -> Self {
        Self {
            name,
            period: Duration::from_millis(period_ms as u64),
            priority,
        }
    }
}

/// Nominal priorities of the four core tasks.
pub const SAFETY_PRIORITY: u8 = 5;
pub const TRACKER_PRIORITY: u8 = 4;
pub const DEBOUNCER_PRIORITY: u8 = 3;
pub const PLANNER_PRIORITY: u8 = 2;

/// Fixed-period timer with a monotonic deadline.
#[derive(Debug)]
pub struct PeriodicTimer {
    period: Duration,
    next: Instant,
    overruns: u32,
}

impl PeriodicTimer {
    pub fn new(period: Duration) -> Self {
        Self::starting_at(Instant::now(), period)
    }

    pub fn starting_at(start: Instant, period: Duration) -> Self {
        Self {
            period,
            next: start + period,
            overruns: 0,
        }
    }

    /// Next deadline.
    pub fn deadline(&self) -> Instant {
        self.next
    }

    /// Number of deadlines missed so far.
    pub fn overruns(&self) -> u32 {
        self.overruns
    }

    /// Advance to the next deadline as seen from `now`.
    ///
    /// Returns how long to sleep.  When one or more deadlines were missed
    /// they are skipped and counted instead of being run back to back.
    pub fn advance(&mut self, now: Instant) -> Duration {
        if now >= self.next {
            let late = now - self.next;
            let missed = (late.as_nanos() / self.period.as_nanos().max(1)) as u32;
            if missed > 0 {
                self.overruns = self.overruns.saturating_add(missed);
            }
            self.next += self.period * (missed + 1);
        }
        let wait = self.next.saturating_duration_since(now);
        self.next += self.period;
        wait
    }

    /// Sleep until the next deadline.
    pub fn wait(&mut self) {
        let before = self.overruns;
        let wait = self.advance(Instant::now());
        if self.overruns > before {
            warn!(
                "deadline overrun: {} period(s) of {:?} skipped",
                self.overruns - before,
                self.period
            );
        }
        if !wait.is_zero() {
            thread::sleep(wait);
        }
    }
}

/// Spawn `body` as a named periodic thread.
///
/// `body` runs once per period until `shutdown` is raised.
pub fn spawn_task(
    task: TaskSpec,
    shutdown: Arc<AtomicBool>,
    mut body: impl FnMut() + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    info!(
        "Spawning '{}' (period={:?}, pri={})",
        task.name, task.period, task.priority
    );
    thread::Builder::new().name(task.name.into()).spawn(move || {
        let mut timer = PeriodicTimer::new(task.period);
        while !shutdown.load(Ordering::Acquire) {
            body();
            timer.wait();
        }
        info!("'{}' stopped", task.name);
    })
}
