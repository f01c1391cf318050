//! Floor request planner.
//!
//! Runs once per `planner_period_ms` and performs three phases in order:
//!
//! 1. **Drain** every event pending in the [`EventChannel`] at cycle start.
//! 2. **Select** the queue head as the new target, only while the doors are
//!    closed, and command the motor to that floor's absolute position.
//! 3. **Commit** the head as the current floor once the car has reached a
//!    floor and the doors have started to open.
//!
//! Car position and direction are read through the [`CarPort`] before the
//! request queue is locked, never while holding it.

pub mod queue;

use core::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{CarPort, EventSink};
use crate::config::SystemConfig;
use crate::events::{EventChannel, PinEvent};
use crate::safety::EmergencyLatch;
use crate::sensors::position::{Direction, TrackerSnapshot};
use queue::{Floor, Insertion, SharedFloorQueue};

/// Target position last selected by the planner, readable without locks.
#[derive(Debug, Default)]
pub struct PlannerTarget(AtomicI32);

impl PlannerTarget {
    pub fn new(position_cm: i32) -> Self {
        Self(AtomicI32::new(position_cm))
    }

    pub fn get(&self) -> i32 {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self, position_cm: i32) {
        self.0.store(position_cm, Ordering::Release);
    }
}

/// Planner bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerState {
    pub target_floor: Floor,
    pub current_floor: Floor,
    pub doors_closed: bool,
    pub floor_reached: bool,
    pub stop_latched: bool,
}

impl Default for PlannerState {
    fn default() -> Self {
        Self {
            target_floor: Floor::Floor1,
            current_floor: Floor::Floor1,
            doors_closed: false,
            floor_reached: false,
            stop_latched: false,
        }
    }
}

/// En-route test for the middle floor: the car can still stop there
/// without overshooting.
pub fn middle_floor_en_route(snapshot: TrackerSnapshot, middle_cm: i32, safe_stop_cm: i32) -> bool {
    match snapshot.direction {
        Direction::Up => snapshot.position + safe_stop_cm <= middle_cm,
        Direction::Down => snapshot.position - safe_stop_cm >= middle_cm,
        Direction::Unknown => false,
    }
}

pub struct Planner {
    state: PlannerState,
    /// Floor the motor was last commanded to.
    commanded: Option<Floor>,
    floor_positions_cm: [i32; 3],
    safe_stop_cm: i32,
    queue: Arc<SharedFloorQueue>,
    target: Arc<PlannerTarget>,
    latch: Arc<EmergencyLatch>,
}

impl Planner {
    pub fn new(
        config: &SystemConfig,
        queue: Arc<SharedFloorQueue>,
        target: Arc<PlannerTarget>,
        latch: Arc<EmergencyLatch>,
    ) -> Self {
        Self {
            state: PlannerState::default(),
            commanded: None,
            floor_positions_cm: config.floor_positions_cm,
            safe_stop_cm: config.safe_stop_distance_cm,
            queue,
            target,
            latch,
        }
    }

    pub fn state(&self) -> PlannerState {
        self.state
    }

    /// Run one planner cycle.
    pub fn run_cycle<C, S>(&mut self, channel: &EventChannel, car: &C, sink: &mut S)
    where
        C: CarPort + ?Sized,
        S: EventSink + ?Sized,
    {
        channel.drain(|event| self.handle_event(event, car, sink));
        self.select_target(car, sink);
        self.commit(sink);
    }

    /// Apply one drained event.
    pub fn handle_event<C, S>(&mut self, event: PinEvent, car: &C, sink: &mut S)
    where
        C: CarPort + ?Sized,
        S: EventSink + ?Sized,
    {
        debug!("planner event {:?}", event);
        match event {
            PinEvent::ToFloor1 => self.request(Floor::Floor1, car, sink),
            PinEvent::ToFloor2 => self.request(Floor::Floor2, car, sink),
            PinEvent::ToFloor3 => self.request(Floor::Floor3, car, sink),
            PinEvent::ArrivedAtFloor => self.state.floor_reached = true,
            PinEvent::LeftFloor => self.state.floor_reached = false,
            PinEvent::DoorsClosed => self.state.doors_closed = true,
            PinEvent::DoorsOpening => self.state.doors_closed = false,
            PinEvent::StopPressed => {
                self.state.stop_latched = true;
                car.set_car_motor_stopped(true);
                info!("stop button pressed: motor stopped");
                sink.emit(&AppEvent::StopLatched(true));
            }
            PinEvent::StopReleased => {
                self.state.stop_latched = false;
                if self.latch.release_stop(car) {
                    info!("stop button released");
                } else {
                    warn!("stop released while emergency latch is set: motor stays stopped");
                }
                sink.emit(&AppEvent::StopLatched(false));
            }
        }
    }

    fn request<C, S>(&mut self, floor: Floor, car: &C, sink: &mut S)
    where
        C: CarPort + ?Sized,
        S: EventSink + ?Sized,
    {
        if floor == self.state.target_floor {
            return;
        }
        let at = self.push_request(floor, car);
        if at != Insertion::Duplicate {
            info!("request {} queued at {:?}", floor, at);
            sink.emit(&AppEvent::RequestQueued { floor, at });
        }
    }

    /// Insert `floor` into the request queue.
    pub fn push_request<C: CarPort + ?Sized>(&self, floor: Floor, car: &C) -> Insertion {
        let snapshot = TrackerSnapshot {
            position: car.get_car_position(),
            direction: car.get_car_direction(),
        };
        let en_route = floor == Floor::MIDDLE
            && middle_floor_en_route(
                snapshot,
                self.floor_positions_cm[Floor::MIDDLE.index()],
                self.safe_stop_cm,
            );

        let mut queue = self.queue.lock();
        if en_route {
            queue.push_front(floor)
        } else {
            queue.push_back(floor)
        }
    }

    fn select_target<C, S>(&mut self, car: &C, sink: &mut S)
    where
        C: CarPort + ?Sized,
        S: EventSink + ?Sized,
    {
        if !self.state.doors_closed {
            return;
        }
        let Some(head) = self.queue.lock().peek() else {
            return;
        };
        self.state.target_floor = head;
        if self.commanded == Some(head) {
            return;
        }
        let position_cm = self.floor_positions_cm[head.index()];
        self.target.set(position_cm);
        car.set_car_target_position(position_cm);
        self.commanded = Some(head);
        info!("target {} ({} cm)", head, position_cm);
        sink.emit(&AppEvent::TargetChanged {
            floor: head,
            position_cm,
        });
    }

    fn commit<S: EventSink + ?Sized>(&mut self, sink: &mut S) {
        let s = self.state;
        if !(s.floor_reached && !s.doors_closed && s.target_floor != s.current_floor) {
            return;
        }
        let Some(serviced) = self.queue.lock().pop() else {
            return;
        };
        self.state.current_floor = serviced;
        self.commanded = None;
        info!("serviced {}", serviced);
        sink.emit(&AppEvent::FloorServiced { floor: serviced });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Requirement;
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct Motor {
        position: Cell<i32>,
        direction: Cell<Direction>,
        target: Cell<Option<i32>>,
        stopped: Cell<bool>,
    }

    impl Motor {
        fn driving(direction: Direction, position: i32) -> Self {
            let motor = Self::default();
            motor.direction.set(direction);
            motor.position.set(position);
            motor
        }
    }

    impl CarPort for Motor {
        fn get_car_position(&self) -> i32 {
            self.position.get()
        }
        fn set_car_target_position(&self, position_cm: i32) {
            self.target.set(Some(position_cm));
        }
        fn set_car_motor_stopped(&self, stopped: bool) {
            self.stopped.set(stopped);
        }
        fn get_car_direction(&self) -> Direction {
            self.direction.get()
        }
    }

    #[derive(Default)]
    struct Recorder(RefCell<std::vec::Vec<AppEvent>>);

    impl EventSink for Recorder {
        fn emit(&mut self, event: &AppEvent) {
            self.0.borrow_mut().push(*event);
        }
    }

    struct Fixture {
        planner: Planner,
        queue: Arc<SharedFloorQueue>,
        latch: Arc<EmergencyLatch>,
        target: Arc<PlannerTarget>,
    }

    fn fixture() -> Fixture {
        let config = SystemConfig::default();
        let queue = Arc::new(SharedFloorQueue::new());
        let target = Arc::new(PlannerTarget::new(0));
        let latch = Arc::new(EmergencyLatch::new());
        let planner = Planner::new(
            &config,
            queue.clone(),
            target.clone(),
            latch.clone(),
        );
        Fixture {
            planner,
            queue,
            latch,
            target,
        }
    }

    #[test]
    fn initial_state() {
        let f = fixture();
        assert_eq!(f.planner.state(), PlannerState::default());
        assert!(!f.planner.state().doors_closed);
    }

    #[test]
    fn target_only_selected_with_doors_closed() {
        let mut f = fixture();
        let motor = Motor::default();
        let mut sink = Recorder::default();
        let ch = EventChannel::new();

        ch.try_send(PinEvent::ToFloor3);
        f.planner.run_cycle(&ch, &motor, &mut sink);
        assert_eq!(f.planner.state().target_floor, Floor::Floor1);
        assert_eq!(motor.target.get(), None);

        ch.try_send(PinEvent::DoorsClosed);
        f.planner.run_cycle(&ch, &motor, &mut sink);
        assert_eq!(f.planner.state().target_floor, Floor::Floor3);
        assert_eq!(motor.target.get(), Some(800));
        assert_eq!(f.target.get(), 800);
    }

    #[test]
    fn request_for_current_target_is_ignored() {
        let mut f = fixture();
        let motor = Motor::default();
        let mut sink = Recorder::default();
        let ch = EventChannel::new();
        ch.try_send(PinEvent::ToFloor1);
        ch.try_send(PinEvent::ToFloor1);
        f.planner.run_cycle(&ch, &motor, &mut sink);
        assert!(f.queue.snapshot().is_empty());
        assert!(sink.0.borrow().is_empty());
    }

    #[test]
    fn middle_floor_jumps_queue_when_reachable() {
        let f = fixture();
        let motor = Motor::driving(Direction::Up, 0);
        assert_eq!(f.planner.push_request(Floor::Floor3, &motor), Insertion::Tail);
        assert_eq!(f.planner.push_request(Floor::Floor2, &motor), Insertion::Head);
        assert_eq!(f.queue.snapshot().as_slice(), [Floor::Floor2, Floor::Floor3]);
    }

    #[test]
    fn middle_floor_appended_when_too_close() {
        let f = fixture();
        let motor = Motor::driving(Direction::Up, 390);
        f.planner.push_request(Floor::Floor3, &motor);
        assert_eq!(f.planner.push_request(Floor::Floor2, &motor), Insertion::Tail);
        assert_eq!(f.queue.snapshot().as_slice(), [Floor::Floor3, Floor::Floor2]);
    }

    #[test]
    fn en_route_boundaries() {
        let up = |position| TrackerSnapshot { position, direction: Direction::Up };
        let down = |position| TrackerSnapshot { position, direction: Direction::Down };
        assert!(middle_floor_en_route(up(380), 400, 20));
        assert!(!middle_floor_en_route(up(381), 400, 20));
        assert!(middle_floor_en_route(down(420), 400, 20));
        assert!(!middle_floor_en_route(down(419), 400, 20));
        let idle = TrackerSnapshot { position: 0, direction: Direction::Unknown };
        assert!(!middle_floor_en_route(idle, 400, 20));
    }

    #[test]
    fn commit_pops_head_when_doors_open_at_floor() {
        let mut f = fixture();
        let motor = Motor::default();
        let mut sink = Recorder::default();
        let ch = EventChannel::new();
        for ev in [PinEvent::DoorsClosed, PinEvent::ToFloor2] {
            ch.try_send(ev);
        }
        f.planner.run_cycle(&ch, &motor, &mut sink);
        assert_eq!(f.planner.state().target_floor, Floor::Floor2);

        for ev in [PinEvent::ArrivedAtFloor, PinEvent::DoorsOpening] {
            ch.try_send(ev);
        }
        f.planner.run_cycle(&ch, &motor, &mut sink);
        assert_eq!(f.planner.state().current_floor, Floor::Floor2);
        assert!(f.queue.snapshot().is_empty());
        assert!(sink.0.borrow().contains(&AppEvent::FloorServiced { floor: Floor::Floor2 }));
    }

    #[test]
    fn stop_button_is_applied_synchronously() {
        let mut f = fixture();
        let motor = Motor::default();
        let mut sink = Recorder::default();
        f.planner.handle_event(PinEvent::StopPressed, &motor, &mut sink);
        assert!(motor.stopped.get());
        assert!(f.planner.state().stop_latched);
        f.planner.handle_event(PinEvent::StopReleased, &motor, &mut sink);
        assert!(!motor.stopped.get());
        assert!(!f.planner.state().stop_latched);
    }

    #[test]
    fn emergency_latch_blocks_stop_release() {
        let mut f = fixture();
        let motor = Motor::default();
        let mut sink = Recorder::default();
        f.planner.handle_event(PinEvent::StopPressed, &motor, &mut sink);
        motor.stopped.set(false);
        f.latch.trip(Requirement::Env1, &motor);
        assert!(motor.stopped.get());
        f.planner.handle_event(PinEvent::StopReleased, &motor, &mut sink);
        assert!(motor.stopped.get());
        assert!(!f.planner.state().stop_latched);
    }

    #[test]
    fn idle_car_appends_middle_floor() {
        let f = fixture();
        let motor = Motor::driving(Direction::Unknown, 0);
        f.planner.push_request(Floor::Floor3, &motor);
        assert_eq!(f.planner.push_request(Floor::Floor2, &motor), Insertion::Tail);
    }
}
