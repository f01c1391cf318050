//! Mock hardware adapter for integration tests.
//!
//! Raw line levels and motor drive are set directly by the test.  Every
//! motor command is recorded so tests can assert on the full history.

use std::sync::Mutex;

use liftcore::app::events::AppEvent;
use liftcore::app::ports::{CarPort, EventSink, MotorDrive, MotorObserverPort, RawInputPort};
use liftcore::pins::InputLine;
use liftcore::sensors::position::Direction;

pub const UP: MotorDrive = MotorDrive {
    up: true,
    down: false,
};

// ── Motor call record ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorCall {
    SetTarget(i32),
    SetStopped(bool),
}

#[derive(Debug, Default)]
struct MockState {
    lines: [bool; InputLine::COUNT],
    drive: MotorDrive,
    target: i32,
    calls: Vec<MotorCall>,
    /// A faulty controller keeps driving after a stop command.
    ignore_stop: bool,
}

// ── MockCar ───────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MockCar {
    state: Mutex<MockState>,
}

#[allow(dead_code)]
impl MockCar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Car resting at a floor with the doors closed.
    pub fn parked() -> Self {
        let car = Self::new();
        car.set_line(InputLine::AtFloor, true);
        car.set_line(InputLine::DoorsClosed, true);
        car
    }

    pub fn set_line(&self, line: InputLine, level: bool) {
        self.state.lock().unwrap().lines[line.index()] = level;
    }

    pub fn set_drive(&self, drive: MotorDrive) {
        self.state.lock().unwrap().drive = drive;
    }

    pub fn set_ignore_stop(&self, ignore: bool) {
        self.state.lock().unwrap().ignore_stop = ignore;
    }

    pub fn calls(&self) -> Vec<MotorCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn targets(&self) -> Vec<i32> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MotorCall::SetTarget(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    pub fn stop_calls(&self) -> Vec<bool> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MotorCall::SetStopped(s) => Some(s),
                _ => None,
            })
            .collect()
    }
}

impl RawInputPort for MockCar {
    fn read_raw_line(&self, line: InputLine) -> bool {
        self.state.lock().unwrap().lines[line.index()]
    }
}

impl CarPort for MockCar {
    fn get_car_position(&self) -> i32 {
        0
    }

    fn set_car_target_position(&self, position_cm: i32) {
        let mut s = self.state.lock().unwrap();
        s.target = position_cm;
        s.calls.push(MotorCall::SetTarget(position_cm));
    }

    fn set_car_motor_stopped(&self, stopped: bool) {
        let mut s = self.state.lock().unwrap();
        if stopped && !s.ignore_stop {
            s.drive = MotorDrive::STOPPED;
        }
        s.calls.push(MotorCall::SetStopped(stopped));
    }

    fn get_car_direction(&self) -> Direction {
        let drive = self.state.lock().unwrap().drive;
        match (drive.up, drive.down) {
            (true, false) => Direction::Up,
            (false, true) => Direction::Down,
            _ => Direction::Unknown,
        }
    }
}

impl MotorObserverPort for MockCar {
    fn motor_drive(&self) -> MotorDrive {
        self.state.lock().unwrap().drive
    }

    fn commanded_target(&self) -> i32 {
        self.state.lock().unwrap().target
    }
}

// ── RecordingSink ─────────────────────────────────────────────

/// Collects every emitted [`AppEvent`] for later assertion.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(*event);
    }
}
