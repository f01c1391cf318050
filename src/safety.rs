//! Runtime safety monitor.
//!
//! The monitor runs **every tick independently of the planner** and checks
//! a fixed, ordered list of environment assumptions and system requirements
//! against a [`CarObservation`].  Evaluation stops at the first failure.
//!
//! ## Failure lifecycle
//!
//! 1. A requirement evaluates false.
//! 2. The monitor logs `SAFETY REQUIREMENT <id> VIOLATED: STOPPING ELEVATOR`,
//!    trips the [`EmergencyLatch`] (which stops the motor) and emits
//!    [`AppEvent::SafetyViolation`].
//! 3. Every later tick the motor stop is re-issued.  No check runs again and
//!    nothing clears the latch.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use heapless::Vec;
use log::{error, info};

use crate::app::events::AppEvent;
use crate::app::ports::{CarPort, EventSink, MotorDrive, MotorObserverPort, RawInputPort};
use crate::config::SystemConfig;
use crate::drivers::debounce::InputHealth;
use crate::error::Requirement;
use crate::pins::InputLine;
use crate::planner::PlannerTarget;
use crate::sensors::position::PositionTracker;

/// One-way emergency stop shared by the monitor and the planner.
///
/// Tripping the latch and releasing the stop button both drive the motor
/// under the same lock, so a release can never land after a trip.
#[derive(Debug, Default)]
pub struct EmergencyLatch {
    tripped: Mutex<Option<Requirement>>,
}

impl EmergencyLatch {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Requirement>> {
        self.tripped.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Latch `requirement` and stop the motor.  Irrevocable; a later trip
    /// keeps the first cause.
    pub fn trip<C: CarPort + ?Sized>(&self, requirement: Requirement, car: &C) {
        let mut tripped = self.lock();
        tripped.get_or_insert(requirement);
        car.set_car_motor_stopped(true);
    }

    /// Release the motor stop unless the latch has tripped.  Returns
    /// `false` when the release was refused.
    pub fn release_stop<C: CarPort + ?Sized>(&self, car: &C) -> bool {
        let tripped = self.lock();
        if tripped.is_some() {
            return false;
        }
        car.set_car_motor_stopped(false);
        true
    }

    pub fn is_set(&self) -> bool {
        self.lock().is_some()
    }

    /// The requirement that tripped the latch.
    pub fn violation(&self) -> Option<Requirement> {
        *self.lock()
    }
}

/// Everything the monitor looks at in one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CarObservation {
    /// Tracked position (cm).
    pub position: i32,
    pub motor: MotorDrive,
    /// Raw door contact.
    pub doors_closed: bool,
    /// Raw stop button.
    pub stop_pressed: bool,
    /// Raw at-floor sensor.
    pub at_floor: bool,
    /// No debounced input is `Unstable`.
    pub inputs_stable: bool,
    /// Target last accepted by the motor controller (cm).
    pub commanded_target: i32,
    /// Target last published by the planner (cm).
    pub planner_target: i32,
}

impl CarObservation {
    fn stopped(&self) -> bool {
        !self.motor.is_moving()
    }
}

/// Outcome of one requirement in the last evaluated tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafetyCheckResult {
    pub requirement: Requirement,
    pub passed: bool,
}

/// Monitor status after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorStatus {
    Running,
    /// Terminal.  Carries the first violated requirement.
    Halted(Requirement),
}

// ── Temporal checks ───────────────────────────────────────────

/// env2: distance travelled per sampling window.
#[derive(Debug)]
struct SpeedWindow {
    baseline: Option<i32>,
    ticks: u32,
    window_ticks: u32,
    max_travel: i32,
}

impl SpeedWindow {
    fn sample(&mut self, position: i32) -> bool {
        let Some(baseline) = self.baseline else {
            self.baseline = Some(position);
            return true;
        };
        self.ticks += 1;
        if self.ticks < self.window_ticks {
            return true;
        }
        self.ticks = 0;
        self.baseline = Some(position);
        (position - baseline).abs() <= self.max_travel
    }
}

/// req1: ticks the stop button has been held.
#[derive(Debug)]
struct StopDeadline {
    held: Option<u32>,
    deadline_ticks: u32,
}

impl StopDeadline {
    fn sample(&mut self, stop_pressed: bool, moving: bool) -> bool {
        if !stop_pressed {
            self.held = None;
            return true;
        }
        let held = self
            .held
            .map_or(0, |t| t.saturating_add(1))
            .min(self.deadline_ticks);
        self.held = Some(held);
        // The motor must be stopped by the tick that completes the bound.
        !(held >= self.deadline_ticks.saturating_sub(1) && moving)
    }
}

/// req4: why a moving car stopped.
#[derive(Debug)]
struct HaltCause {
    prev_stopped: bool,
    /// Stop button seen since the motor last started moving.
    stop_seen: bool,
}

impl HaltCause {
    fn sample(&mut self, stopped: bool, at_floor: bool, stop_pressed: bool) -> bool {
        if !stopped && self.prev_stopped {
            self.stop_seen = false;
        }
        self.stop_seen |= stop_pressed;
        let ok = self.prev_stopped || !stopped || at_floor || self.stop_seen;
        self.prev_stopped = stopped;
        ok
    }
}

/// req5: ticks spent stopped at the current floor.
#[derive(Debug)]
struct Dwell {
    ticks: u32,
    at_rest: bool,
    min_ticks: u32,
}

impl Dwell {
    fn sample(&mut self, stopped: bool, at_floor: bool) -> bool {
        let ok = self.ticks > self.min_ticks || stopped;
        if stopped && at_floor {
            if !self.at_rest {
                self.ticks = 0;
                self.at_rest = true;
            }
            if self.ticks <= self.min_ticks {
                self.ticks += 1;
            }
        } else {
            self.at_rest = false;
        }
        ok
    }
}

/// req8: consecutive ticks the motor and planner disagree on the target.
#[derive(Debug, Default)]
struct TargetAgreement {
    mismatched: u32,
}

impl TargetAgreement {
    /// The planner publishes its target and commands the motor in two
    /// steps, so one disagreeing tick is tolerated.
    const GRACE_TICKS: u32 = 1;

    fn sample(&mut self, moving: bool, commanded: i32, planned: i32) -> bool {
        if !moving || commanded == planned {
            self.mismatched = 0;
            return true;
        }
        self.mismatched = self.mismatched.saturating_add(1);
        self.mismatched <= Self::GRACE_TICKS
    }
}

// ── Monitor ───────────────────────────────────────────────────

const REQUIREMENT_COUNT: usize = Requirement::ALL.len();

/// Safety monitor.
pub struct SafetyMonitor {
    floor_positions_cm: [i32; 3],
    at_floor_tolerance_cm: i32,
    travel_min_cm: i32,
    travel_max_cm: i32,

    speed: SpeedWindow,
    stop_deadline: StopDeadline,
    halt_cause: HaltCause,
    dwell: Dwell,
    target_agreement: TargetAgreement,

    latch: Arc<EmergencyLatch>,
    status: MonitorStatus,
    results: Vec<SafetyCheckResult, REQUIREMENT_COUNT>,
}

impl SafetyMonitor {
    pub fn new(config: &SystemConfig, latch: Arc<EmergencyLatch>) -> Self {
        let dwell_ticks = config.dwell_ticks();
        Self {
            floor_positions_cm: config.floor_positions_cm,
            at_floor_tolerance_cm: config.at_floor_tolerance_cm,
            travel_min_cm: config.travel_min_cm,
            travel_max_cm: config.travel_max_cm,
            speed: SpeedWindow {
                baseline: None,
                ticks: 0,
                window_ticks: config.speed_window_ticks(),
                max_travel: config.max_window_travel_cm,
            },
            stop_deadline: StopDeadline {
                held: None,
                deadline_ticks: config.stop_deadline_ticks(),
            },
            halt_cause: HaltCause {
                prev_stopped: true,
                stop_seen: false,
            },
            // A car at rest at boot may leave immediately.
            dwell: Dwell {
                ticks: dwell_ticks + 1,
                at_rest: true,
                min_ticks: dwell_ticks,
            },
            target_agreement: TargetAgreement::default(),
            latch,
            status: MonitorStatus::Running,
            results: Vec::new(),
        }
    }

    pub fn status(&self) -> MonitorStatus {
        self.status
    }

    /// First violated requirement, once halted.
    pub fn violation(&self) -> Option<Requirement> {
        match self.status {
            MonitorStatus::Running => None,
            MonitorStatus::Halted(r) => Some(r),
        }
    }

    /// Per-requirement outcomes of the last evaluated tick, in evaluation
    /// order.  Requirements after a failure are absent.
    pub fn results(&self) -> &[SafetyCheckResult] {
        &self.results
    }

    /// Run one monitor tick.
    pub fn tick<C, S>(&mut self, obs: &CarObservation, car: &C, sink: &mut S) -> MonitorStatus
    where
        C: CarPort + ?Sized,
        S: EventSink + ?Sized,
    {
        if let MonitorStatus::Halted(_) = self.status {
            car.set_car_motor_stopped(true);
            return self.status;
        }
        if let Err(requirement) = self.evaluate(obs) {
            error!(
                "SAFETY REQUIREMENT {} VIOLATED: STOPPING ELEVATOR",
                requirement.id()
            );
            self.latch.trip(requirement, car);
            self.status = MonitorStatus::Halted(requirement);
            sink.emit(&AppEvent::SafetyViolation(requirement));
            info!("safety monitor halted: {}", requirement);
        }
        self.status
    }

    /// Evaluate every requirement in order, stopping at the first failure.
    /// Updates the temporal counters; performs no side effects.
    pub fn evaluate(&mut self, obs: &CarObservation) -> Result<(), Requirement> {
        self.results.clear();
        for requirement in Requirement::ALL {
            let passed = self.check(requirement, obs);
            let _ = self.results.push(SafetyCheckResult {
                requirement,
                passed,
            });
            if !passed {
                return Err(requirement);
            }
        }
        Ok(())
    }

    fn check(&mut self, requirement: Requirement, obs: &CarObservation) -> bool {
        let stopped = obs.stopped();
        match requirement {
            Requirement::Env1 => obs.doors_closed || (obs.at_floor && stopped),
            Requirement::Env2 => self.speed.sample(obs.position),
            Requirement::Env3 => !obs.at_floor || self.near_floor(obs.position),
            Requirement::Env4 => obs.inputs_stable,
            Requirement::Req1 => self.stop_deadline.sample(obs.stop_pressed, !stopped),
            Requirement::Req2 => !(obs.motor.up && obs.motor.down),
            Requirement::Req3 => (self.travel_min_cm..=self.travel_max_cm).contains(&obs.position),
            Requirement::Req4 => self.halt_cause.sample(stopped, obs.at_floor, obs.stop_pressed),
            Requirement::Req5 => self.dwell.sample(stopped, obs.at_floor),
            Requirement::Req8 => {
                self.target_agreement
                    .sample(!stopped, obs.commanded_target, obs.planner_target)
            }
        }
    }

    fn near_floor(&self, position: i32) -> bool {
        self.floor_positions_cm
            .iter()
            .any(|f| (position - f).abs() <= self.at_floor_tolerance_cm)
    }
}

/// Gathers a [`CarObservation`] from the ports and the shared core state.
#[derive(Clone)]
pub struct SafetySampler {
    tracker: Arc<PositionTracker>,
    health: Arc<InputHealth>,
    planner_target: Arc<PlannerTarget>,
}

impl SafetySampler {
    pub fn new(
        tracker: Arc<PositionTracker>,
        health: Arc<InputHealth>,
        planner_target: Arc<PlannerTarget>,
    ) -> Self {
        Self {
            tracker,
            health,
            planner_target,
        }
    }

    pub fn observe<I, M>(&self, inputs: &I, motor: &M) -> CarObservation
    where
        I: RawInputPort + ?Sized,
        M: MotorObserverPort + ?Sized,
    {
        CarObservation {
            position: self.tracker.get_position(),
            motor: motor.motor_drive(),
            doors_closed: inputs.read_raw_line(InputLine::DoorsClosed),
            stop_pressed: inputs.read_raw_line(InputLine::StopButton),
            at_floor: inputs.read_raw_line(InputLine::AtFloor),
            inputs_stable: self.health.all_stable(),
            commanded_target: motor.commanded_target(),
            planner_target: self.planner_target.get(),
        }
    }
}
