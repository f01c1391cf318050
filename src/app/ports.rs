//! Port traits — the hexagonal boundary between the control core and the car.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ElevatorCore (domain)
//! ```
//!
//! Driven adapters (GPIO lines, motor controller, event sinks, config
//! storage) implement these traits.  The
//! [`ElevatorCore`](super::service::ElevatorCore) consumes them via
//! generics, so the control logic never touches registers directly.
//!
//! All methods take `&self`: the adapters are shared between the periodic
//! tasks and keep their own interior synchronisation.

use crate::config::SystemConfig;
use crate::pins::InputLine;
use crate::sensors::position::Direction;

// ───────────────────────────────────────────────────────────────
// Raw input port (driven adapter: GPIO → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the current raw level of one digital input line.
pub trait RawInputPort {
    /// `true` when the line reads high.  No debouncing is applied.
    fn read_raw_line(&self, line: InputLine) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Car port (driven adapter: domain → motor controller)
// ───────────────────────────────────────────────────────────────

/// Write-side port of the motor controller.
pub trait CarPort {
    /// Position as reported by the controller (cm).
    fn get_car_position(&self) -> i32;

    /// Command the motor to drive the car to an absolute position (cm).
    fn set_car_target_position(&self, position_cm: i32);

    /// Engage (`true`) or release (`false`) the motor stop.
    fn set_car_motor_stopped(&self, stopped: bool);

    /// Direction the motor is currently driving.
    fn get_car_direction(&self) -> Direction;
}

// ───────────────────────────────────────────────────────────────
// Motor observer port (driven adapter: motor outputs → monitor)
// ───────────────────────────────────────────────────────────────

/// Levels of the two motor drive lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotorDrive {
    pub up: bool,
    pub down: bool,
}

impl MotorDrive {
    pub const STOPPED: Self = Self { up: false, down: false };

    /// Either drive line is asserted.
    pub fn is_moving(self) -> bool {
        self.up || self.down
    }
}

/// Read-only view of what the motor is actually doing.
pub trait MotorObserverPort {
    fn motor_drive(&self) -> MotorDrive;

    /// Last target position accepted by the motor controller (cm).
    fn commanded_target(&self) -> i32;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The core emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ config storage)
// ───────────────────────────────────────────────────────────────

/// Loads system configuration.
///
/// Implementations MUST run [`SystemConfig::validate`] and reject invalid
/// ranges with [`ConfigError::ValidationFailed`] rather than clamping.
pub trait ConfigPort {
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage.
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::error::Error for ConfigError {}
