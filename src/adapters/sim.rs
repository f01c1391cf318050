//! Simulated car adapter.
//!
//! A minimal plant standing in for the shaft, motor controller and door
//! operator.  It implements every hardware-facing port, so the host binary
//! and the tests can run the full core without a board.
//!
//! ## Model
//!
//! - The motor moves the car 1 cm per `step_period_ms` toward the commanded
//!   target.  Each centimetre raises the encoder line for the first half of
//!   the step.
//! - The motor informs the [`PositionTracker`] of its direction before the
//!   pulse it causes.
//! - The at-floor line reads high within `at_floor_band_cm` of a floor.
//! - After the car comes to rest at a floor the doors open for
//!   `door_open_ms`.  The motor never moves while the doors are open.
//! - Buttons are raw levels set by [`SimulatedCar::press`].
//!
//! [`SimulatedCar::step`] advances the plant by half a step period.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::debug;

use crate::app::ports::{CarPort, MotorDrive, MotorObserverPort, RawInputPort};
use crate::config::SystemConfig;
use crate::pins::InputLine;
use crate::sensors::position::{Direction, PositionTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Doors {
    Closed,
    Open { remaining_ms: u32 },
}

/// Observable plant state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlantSnapshot {
    /// True car position (cm).
    pub position: i32,
    pub target: i32,
    pub drive: MotorDrive,
    pub stop_engaged: bool,
    pub doors_closed: bool,
    pub elapsed_ms: u64,
}

#[derive(Debug)]
struct Plant {
    position: i32,
    target: i32,
    drive: MotorDrive,
    stop_engaged: bool,
    doors: Doors,
    pulse_high: bool,
    /// Second half of the current step.
    second_half: bool,
    /// Car came to rest at a floor this half-step; doors open on the next.
    arrived: bool,
    moved_since_arrival: bool,
    buttons: [bool; 4],
    elapsed_ms: u64,
}

#[derive(Debug, Clone, Copy)]
struct PlantParams {
    half_step_ms: u32,
    door_open_ms: u32,
    at_floor_band_cm: i32,
    floor_positions_cm: [i32; 3],
}

/// Shared handle to the simulated car.
#[derive(Clone)]
pub struct SimulatedCar {
    plant: Arc<Mutex<Plant>>,
    tracker: Arc<PositionTracker>,
    params: PlantParams,
}

impl SimulatedCar {
    /// Car at rest at floor 1 with the doors closed.
    pub fn new(config: &SystemConfig, tracker: Arc<PositionTracker>) -> Self {
        let floor1 = config.floor_positions_cm[0];
        Self {
            plant: Arc::new(Mutex::new(Plant {
                position: floor1,
                target: floor1,
                drive: MotorDrive::STOPPED,
                stop_engaged: false,
                doors: Doors::Closed,
                pulse_high: false,
                second_half: false,
                arrived: false,
                moved_since_arrival: false,
                buttons: [false; 4],
                elapsed_ms: 0,
            })),
            tracker,
            params: PlantParams {
                half_step_ms: (config.sim.step_period_ms / 2).max(1),
                door_open_ms: config.sim.door_open_ms,
                at_floor_band_cm: config.sim.at_floor_band_cm,
                floor_positions_cm: config.floor_positions_cm,
            },
        }
    }

    fn lock(&self) -> MutexGuard<'_, Plant> {
        self.plant.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Period at which [`step`](Self::step) must be called.
    pub fn half_step_period(&self) -> Duration {
        Duration::from_millis(self.params.half_step_ms as u64)
    }

    /// Set the raw level of a call or stop button.  Other lines are driven
    /// by the plant and are ignored.
    pub fn press(&self, line: InputLine, level: bool) {
        let slot = match line {
            InputLine::CallFloor1 => 0,
            InputLine::CallFloor2 => 1,
            InputLine::CallFloor3 => 2,
            InputLine::StopButton => 3,
            _ => return,
        };
        self.lock().buttons[slot] = level;
    }

    pub fn snapshot(&self) -> PlantSnapshot {
        let p = self.lock();
        PlantSnapshot {
            position: p.position,
            target: p.target,
            drive: p.drive,
            stop_engaged: p.stop_engaged,
            doors_closed: p.doors == Doors::Closed,
            elapsed_ms: p.elapsed_ms,
        }
    }

    /// Advance the plant by half a step period.
    pub fn step(&self) {
        let mut p = self.lock();
        let params = self.params;
        p.elapsed_ms += params.half_step_ms as u64;

        if let Doors::Open { remaining_ms } = p.doors {
            let left = remaining_ms.saturating_sub(params.half_step_ms);
            p.doors = if left == 0 {
                debug!("sim: doors closed at {} cm", p.position);
                Doors::Closed
            } else {
                Doors::Open { remaining_ms: left }
            };
        }

        if p.arrived {
            p.arrived = false;
            p.doors = Doors::Open {
                remaining_ms: params.door_open_ms,
            };
            debug!("sim: doors open at {} cm", p.position);
        }

        if p.second_half {
            p.second_half = false;
            p.pulse_high = false;
            return;
        }
        p.second_half = true;

        let doors_closed = p.doors == Doors::Closed;
        let direction = if p.stop_engaged || !doors_closed || p.position == p.target {
            Direction::Unknown
        } else if p.target > p.position {
            Direction::Up
        } else {
            Direction::Down
        };
        p.drive = MotorDrive {
            up: direction == Direction::Up,
            down: direction == Direction::Down,
        };
        self.tracker.set_direction(direction);

        if direction == Direction::Unknown {
            if p.position == p.target
                && p.moved_since_arrival
                && !p.stop_engaged
                && near_floor(&params, p.position)
            {
                p.moved_since_arrival = false;
                p.arrived = true;
            }
            return;
        }

        p.position += direction.step();
        p.pulse_high = true;
        p.moved_since_arrival = true;
    }
}

fn near_floor(params: &PlantParams, position: i32) -> bool {
    params
        .floor_positions_cm
        .iter()
        .any(|f| (position - f).abs() <= params.at_floor_band_cm)
}

impl RawInputPort for SimulatedCar {
    fn read_raw_line(&self, line: InputLine) -> bool {
        let p = self.lock();
        match line {
            InputLine::CallFloor1 => p.buttons[0],
            InputLine::CallFloor2 => p.buttons[1],
            InputLine::CallFloor3 => p.buttons[2],
            InputLine::StopButton => p.buttons[3],
            InputLine::AtFloor => near_floor(&self.params, p.position),
            InputLine::DoorsClosed => p.doors == Doors::Closed,
            InputLine::EncoderPulse => p.pulse_high,
        }
    }
}

impl CarPort for SimulatedCar {
    fn get_car_position(&self) -> i32 {
        self.lock().position
    }

    fn set_car_target_position(&self, position_cm: i32) {
        self.lock().target = position_cm;
    }

    fn set_car_motor_stopped(&self, stopped: bool) {
        let mut p = self.lock();
        p.stop_engaged = stopped;
        if stopped {
            p.drive = MotorDrive::STOPPED;
        }
    }

    fn get_car_direction(&self) -> Direction {
        let drive = self.lock().drive;
        match (drive.up, drive.down) {
            (true, false) => Direction::Up,
            (false, true) => Direction::Down,
            _ => Direction::Unknown,
        }
    }
}

impl MotorObserverPort for SimulatedCar {
    fn motor_drive(&self) -> MotorDrive {
        self.lock().drive
    }

    fn commanded_target(&self) -> i32 {
        self.lock().target
    }
}
