//! Outbound application events.
//!
//! The control core emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, record in a test, etc.

use crate::error::Requirement;
use crate::planner::queue::{Floor, Insertion};

/// Structured events emitted by the control core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// The core has started (configured floor count and initial floor).
    Started { floor: Floor },

    /// A floor request was accepted into the queue.
    RequestQueued { floor: Floor, at: Insertion },

    /// The planner selected a new target and commanded the motor.
    TargetChanged { floor: Floor, position_cm: i32 },

    /// The head request was serviced and the car is now at `floor`.
    FloorServiced { floor: Floor },

    /// The stop button latch changed.
    StopLatched(bool),

    /// A safety requirement failed.  The car is halted for good.
    SafetyViolation(Requirement),
}
