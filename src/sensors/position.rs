//! Incremental position tracker.
//!
//! The shaft encoder outputs one pulse per centimetre of travel.  The
//! tracker polls the encoder line, confirms each low→high transition, and
//! integrates it against the current direction of travel:
//!
//! | direction | per pulse |
//! |-----------|-----------|
//! | Up        | +1 cm     |
//! | Down      | −1 cm     |
//! | Unknown   | no change |
//!
//! Position and direction share one mutex so a reader always sees a
//! consistent pair.  Direction changes never correct pulses that were
//! already applied.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::app::ports::RawInputPort;
use crate::pins::InputLine;

/// Direction of car travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Up,
    Down,
    #[default]
    Unknown,
}

impl Direction {
    /// Signed position change per pulse.
    pub const fn step(self) -> i32 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
            Self::Unknown => 0,
        }
    }
}

/// Consistent copy of the tracker record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackerSnapshot {
    pub position: i32,
    pub direction: Direction,
}

/// Shared position/direction record.
#[derive(Debug, Default)]
pub struct PositionTracker {
    state: Mutex<TrackerSnapshot>,
}

impl PositionTracker {
    pub fn new(position: i32) -> Self {
        Self {
            state: Mutex::new(TrackerSnapshot {
                position,
                direction: Direction::Unknown,
            }),
        }
    }

    // The guarded data is two plain values; a panicking holder cannot
    // leave it half-written.
    fn lock(&self) -> MutexGuard<'_, TrackerSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get_position(&self) -> i32 {
        self.lock().position
    }

    pub fn get_direction(&self) -> Direction {
        self.lock().direction
    }

    pub fn set_direction(&self, direction: Direction) {
        self.lock().direction = direction;
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        *self.lock()
    }

    /// Apply one confirmed pulse.  Returns the new position.
    pub fn on_pulse(&self) -> i32 {
        let mut state = self.lock();
        state.position += state.direction.step();
        state.position
    }
}

/// Confirms low→high transitions of a sampled pulse line.
#[derive(Debug, Clone, Copy, Default)]
pub struct PulseDetector {
    last_level: bool,
}

impl PulseDetector {
    pub const fn new() -> Self {
        Self { last_level: false }
    }

    /// `true` exactly once per rising transition.
    pub fn sample(&mut self, level: bool) -> bool {
        let rising = level && !self.last_level;
        self.last_level = level;
        rising
    }
}

/// Polls the encoder line and feeds confirmed pulses into a tracker.
#[derive(Debug, Default)]
pub struct EncoderPoller {
    detector: PulseDetector,
    pulses: u32,
}

impl EncoderPoller {
    pub const fn new() -> Self {
        Self {
            detector: PulseDetector::new(),
            pulses: 0,
        }
    }

    /// Returns `true` if a pulse was counted.
    pub fn poll<I: RawInputPort + ?Sized>(&mut self, inputs: &I, tracker: &PositionTracker) -> bool {
        if !self.detector.sample(inputs.read_raw_line(InputLine::EncoderPulse)) {
            return false;
        }
        tracker.on_pulse();
        self.pulses = self.pulses.wrapping_add(1);
        true
    }

    /// Total pulses counted since start.
    pub fn pulse_count(&self) -> u32 {
        self.pulses
    }
}
