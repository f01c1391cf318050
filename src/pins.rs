//! Input line assignments for the elevator controller board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding line numbers or event mappings.

use crate::events::PinEvent;

// ---------------------------------------------------------------------------
// Port C inputs
// ---------------------------------------------------------------------------

/// Call button, floor 1.  HIGH = pressed.
pub const CALL_FLOOR1_GPIO: u8 = 0;
/// Call button, floor 2.
pub const CALL_FLOOR2_GPIO: u8 = 1;
/// Call button, floor 3.
pub const CALL_FLOOR3_GPIO: u8 = 2;
/// Emergency stop button.  HIGH = held.
pub const STOP_BUTTON_GPIO: u8 = 3;
/// Shaft sensor, HIGH while the car is level with any floor.
pub const AT_FLOOR_GPIO: u8 = 7;
/// Door contact, HIGH while the doors are fully closed.
pub const DOORS_CLOSED_GPIO: u8 = 8;
/// Incremental encoder, one pulse per centimetre of travel.
pub const ENCODER_PULSE_GPIO: u8 = 9;

/// Every raw digital line the core reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InputLine {
    CallFloor1 = 0,
    CallFloor2 = 1,
    CallFloor3 = 2,
    StopButton = 3,
    AtFloor = 4,
    DoorsClosed = 5,
    /// Consumed by the position tracker only, never debounced.
    EncoderPulse = 6,
}

impl InputLine {
    /// Number of raw lines.
    pub const COUNT: usize = 7;

    /// The debounced lines, in polling order.
    pub const LOGICAL: [Self; 6] = [
        Self::CallFloor1,
        Self::CallFloor2,
        Self::CallFloor3,
        Self::StopButton,
        Self::AtFloor,
        Self::DoorsClosed,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// GPIO number on port C.
    pub const fn gpio(self) -> u8 {
        match self {
            Self::CallFloor1 => CALL_FLOOR1_GPIO,
            Self::CallFloor2 => CALL_FLOOR2_GPIO,
            Self::CallFloor3 => CALL_FLOOR3_GPIO,
            Self::StopButton => STOP_BUTTON_GPIO,
            Self::AtFloor => AT_FLOOR_GPIO,
            Self::DoorsClosed => DOORS_CLOSED_GPIO,
            Self::EncoderPulse => ENCODER_PULSE_GPIO,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::CallFloor1 => "call1",
            Self::CallFloor2 => "call2",
            Self::CallFloor3 => "call3",
            Self::StopButton => "stop",
            Self::AtFloor => "at_floor",
            Self::DoorsClosed => "doors_closed",
            Self::EncoderPulse => "encoder",
        }
    }
}

// ---------------------------------------------------------------------------
// Event bindings
// ---------------------------------------------------------------------------

/// Events a debounced line emits on its confirmed edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineBinding {
    pub line: InputLine,
    pub rising: PinEvent,
    /// Call buttons have no release event.
    pub falling: Option<PinEvent>,
}

/// One binding per entry of [`InputLine::LOGICAL`], same order.
pub const LOGICAL_BINDINGS: [LineBinding; 6] = [
    LineBinding {
        line: InputLine::CallFloor1,
        rising: PinEvent::ToFloor1,
        falling: None,
    },
    LineBinding {
        line: InputLine::CallFloor2,
        rising: PinEvent::ToFloor2,
        falling: None,
    },
    LineBinding {
        line: InputLine::CallFloor3,
        rising: PinEvent::ToFloor3,
        falling: None,
    },
    LineBinding {
        line: InputLine::StopButton,
        rising: PinEvent::StopPressed,
        falling: Some(PinEvent::StopReleased),
    },
    LineBinding {
        line: InputLine::AtFloor,
        rising: PinEvent::ArrivedAtFloor,
        falling: Some(PinEvent::LeftFloor),
    },
    LineBinding {
        line: InputLine::DoorsClosed,
        rising: PinEvent::DoorsClosed,
        falling: Some(PinEvent::DoorsOpening),
    },
];
