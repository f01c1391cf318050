//! Polled input debouncer for the call buttons, stop button and shaft sensors.
//!
//! ## Hardware
//!
//! Six active-high digital lines, sampled every `debounce_poll_ms` (10 ms)
//! through [`RawInputPort`].  Each line runs its own state machine; a
//! level is accepted after three consecutive matching samples (20 ms
//! debounce window).
//!
//! ## Transition table
//!
//! | state          | sample 0                | sample 1              |
//! |----------------|-------------------------|-----------------------|
//! | Released       | Released                | PressBounce1          |
//! | PressBounce1   | Released                | PressBounce2          |
//! | PressBounce2   | Unstable                | Pressed (rising)      |
//! | Pressed        | ReleaseBounce1          | Pressed               |
//! | ReleaseBounce1 | ReleaseBounce2          | Pressed               |
//! | ReleaseBounce2 | Released (falling)      | Unstable              |
//! | Unstable       | Unstable                | Unstable              |
//!
//! `Unstable` is terminal.  It is published through [`InputHealth`] and
//! picked up by the safety monitor.

use core::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use heapless::Vec;
use log::error;

use crate::app::ports::RawInputPort;
use crate::events::PinEvent;
use crate::pins::{InputLine, LineBinding, LOGICAL_BINDINGS};

/// Number of debounced lines.
pub const LOGICAL_COUNT: usize = InputLine::LOGICAL.len();

/// Per-line debounce state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DebounceState {
    #[default]
    Released = 0,
    PressBounce1 = 1,
    PressBounce2 = 2,
    Pressed = 3,
    ReleaseBounce1 = 4,
    ReleaseBounce2 = 5,
    Unstable = 6,
}

/// A confirmed level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

impl DebounceState {
    /// Advance by one sample.  Depends only on `(self, sample)`.
    pub const fn next(self, sample: bool) -> (Self, Option<Edge>) {
        match (self, sample) {
            (Self::Released, false) => (Self::Released, None),
            (Self::Released, true) => (Self::PressBounce1, None),

            (Self::PressBounce1, false) => (Self::Released, None),
            (Self::PressBounce1, true) => (Self::PressBounce2, None),

            (Self::PressBounce2, false) => (Self::Unstable, None),
            (Self::PressBounce2, true) => (Self::Pressed, Some(Edge::Rising)),

            (Self::Pressed, false) => (Self::ReleaseBounce1, None),
            (Self::Pressed, true) => (Self::Pressed, None),

            (Self::ReleaseBounce1, false) => (Self::ReleaseBounce2, None),
            (Self::ReleaseBounce1, true) => (Self::Pressed, None),

            (Self::ReleaseBounce2, false) => (Self::Released, Some(Edge::Falling)),
            (Self::ReleaseBounce2, true) => (Self::Unstable, None),

            (Self::Unstable, _) => (Self::Unstable, None),
        }
    }

    pub const fn is_unstable(self) -> bool {
        matches!(self, Self::Unstable)
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Released,
            1 => Self::PressBounce1,
            2 => Self::PressBounce2,
            3 => Self::Pressed,
            4 => Self::ReleaseBounce1,
            5 => Self::ReleaseBounce2,
            _ => Self::Unstable,
        }
    }
}

// ── Logical signal ────────────────────────────────────────────

/// One debounced input line and its edge bindings.
#[derive(Debug, Clone)]
pub struct LogicalSignal {
    binding: LineBinding,
    last_sample: bool,
    state: DebounceState,
}

impl LogicalSignal {
    pub const fn new(binding: LineBinding) -> Self {
        Self {
            binding,
            last_sample: false,
            state: DebounceState::Released,
        }
    }

    pub fn line(&self) -> InputLine {
        self.binding.line
    }

    pub fn state(&self) -> DebounceState {
        self.state
    }

    pub fn last_sample(&self) -> bool {
        self.last_sample
    }

    /// Feed one raw sample.  Returns the event bound to a confirmed edge.
    pub fn poll(&mut self, sample: bool) -> Option<PinEvent> {
        self.last_sample = sample;
        let (next, edge) = self.state.next(sample);
        self.state = next;
        match edge? {
            Edge::Rising => Some(self.binding.rising),
            Edge::Falling => self.binding.falling,
        }
    }
}

// ── Shared health view ────────────────────────────────────────

/// Lock-free copy of every line's debounce state.
///
/// Written by the debouncer after each poll, read by the safety monitor.
#[derive(Debug, Default)]
pub struct InputHealth {
    states: [AtomicU8; LOGICAL_COUNT],
}

impl InputHealth {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, slot: usize, state: DebounceState) {
        self.states[slot].store(state as u8, Ordering::Release);
    }

    /// Latest published state of a debounced line.  The encoder line is
    /// not debounced and always reads `Released`.
    pub fn state(&self, line: InputLine) -> DebounceState {
        match InputLine::LOGICAL.iter().position(|l| *l == line) {
            Some(slot) => DebounceState::from_u8(self.states[slot].load(Ordering::Acquire)),
            None => DebounceState::Released,
        }
    }

    /// First line found in `Unstable`, if any.
    pub fn first_unstable(&self) -> Option<InputLine> {
        InputLine::LOGICAL
            .into_iter()
            .find(|line| self.state(*line).is_unstable())
    }

    pub fn all_stable(&self) -> bool {
        self.first_unstable().is_none()
    }
}

// ── Debouncer ─────────────────────────────────────────────────

/// Runs one [`LogicalSignal`] per debounced line.
pub struct InputDebouncer {
    signals: [LogicalSignal; LOGICAL_COUNT],
    health: Arc<InputHealth>,
    unstable_reported: [bool; LOGICAL_COUNT],
}

impl InputDebouncer {
    pub fn new(health: Arc<InputHealth>) -> Self {
        Self {
            signals: LOGICAL_BINDINGS.map(LogicalSignal::new),
            health,
            unstable_reported: [false; LOGICAL_COUNT],
        }
    }

    /// Sample every line once.  Returns the confirmed events in line order.
    pub fn poll<I: RawInputPort + ?Sized>(&mut self, inputs: &I) -> Vec<PinEvent, LOGICAL_COUNT> {
        let mut events = Vec::new();
        for (slot, signal) in self.signals.iter_mut().enumerate() {
            let sample = inputs.read_raw_line(signal.line());
            if let Some(event) = signal.poll(sample) {
                // One event per signal per poll: capacity cannot be exceeded.
                let _ = events.push(event);
            }
            let state = signal.state();
            if state.is_unstable() && !self.unstable_reported[slot] {
                error!("input {} unstable: did not settle", signal.line().name());
                self.unstable_reported[slot] = true;
            }
            self.health.record(slot, state);
        }
        events
    }

    pub fn state(&self, line: InputLine) -> Option<DebounceState> {
        self.signals
            .iter()
            .find(|s| s.line() == line)
            .map(LogicalSignal::state)
    }

    pub fn health(&self) -> &Arc<InputHealth> {
        &self.health
    }
}
