//! Unified error types for the elevator control core.
//!
//! A single `Error` enum that every component can convert into, keeping the
//! task loops' error handling uniform.  All variants are `Copy` so they can
//! be passed through the safety monitor and logged without allocation.

use core::fmt;

use crate::app::ports::ConfigError;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the core funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// The event channel refused an event.
    Channel(ChannelError),
    /// A safety requirement was violated.
    Safety(Requirement),
    /// A task or peripheral could not be started.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Channel(e) => write!(f, "channel: {e}"),
            Self::Safety(r) => write!(f, "safety: {r}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Channel errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// The channel stayed full for the whole send timeout.
    SendTimeout,
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SendTimeout => write!(f, "event channel full, send timed out"),
        }
    }
}

impl From<ChannelError> for Error {
    fn from(e: ChannelError) -> Self {
        Self::Channel(e)
    }
}

// ---------------------------------------------------------------------------
// Safety requirements
// ---------------------------------------------------------------------------

/// The closed list of environment assumptions (`env*`) and system
/// requirements (`req*`) checked by the safety monitor.
///
/// Identifiers are stable: they appear verbatim in the violation log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Requirement {
    /// Doors open only while at a floor with the motor stopped.
    Env1 = 0,
    /// Position delta over a sampling window stays under the speed bound.
    Env2 = 1,
    /// At-floor implies the position is within tolerance of a floor.
    Env3 = 2,
    /// Every debounced input settles; none is left unstable.
    Env4 = 3,
    /// A held stop button stops the motor within the time bound.
    Req1 = 4,
    /// Up and down drive are never asserted together.
    Req2 = 5,
    /// Position stays inside the physical travel range.
    Req3 = 6,
    /// A moving car halts only for the stop button or at a floor.
    Req4 = 7,
    /// A car stopped at a floor dwells before moving on.
    Req5 = 8,
    /// The motor only moves toward the planner's selected target.
    Req8 = 9,
}

impl Requirement {
    /// Evaluation order used by the monitor every tick.
    pub const ALL: [Self; 10] = [
        Self::Env1,
        Self::Env2,
        Self::Env3,
        Self::Env4,
        Self::Req1,
        Self::Req2,
        Self::Req3,
        Self::Req4,
        Self::Req5,
        Self::Req8,
    ];

    /// Stable reporting identifier.
    pub const fn id(self) -> &'static str {
        match self {
            Self::Env1 => "env1",
            Self::Env2 => "env2",
            Self::Env3 => "env3",
            Self::Env4 => "env4",
            Self::Req1 => "req1",
            Self::Req2 => "req2",
            Self::Req3 => "req3",
            Self::Req4 => "req4",
            Self::Req5 => "req5",
            Self::Req8 => "req8",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Env1 => "doors open only at a floor with the motor stopped",
            Self::Env2 => "car speed within bound",
            Self::Env3 => "at-floor sensor agrees with tracked position",
            Self::Env4 => "inputs stabilise within the debounce window",
            Self::Req1 => "stop button stops the motor within the deadline",
            Self::Req2 => "up and down drive never active together",
            Self::Req3 => "car stays within the travel range",
            Self::Req4 => "car halts only at a floor or for the stop button",
            Self::Req5 => "car dwells at a floor before leaving",
            Self::Req8 => "motor moves only toward the requested floor",
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id(), self.description())
    }
}

impl From<Requirement> for Error {
    fn from(r: Requirement) -> Self {
        Self::Safety(r)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
