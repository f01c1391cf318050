//! System configuration parameters
//!
//! All tunable parameters for the elevator control core: task periods,
//! shaft geometry, and the bounds used by the safety monitor.  Values can
//! be overridden from a JSON file through [`ConfigPort`](crate::app::ports::ConfigPort).

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::planner::queue::Floor;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Task periods ---
    /// Input debouncer polling period (milliseconds)
    pub debounce_poll_ms: u32,
    /// Encoder polling period of the position tracker (milliseconds)
    pub tracker_poll_ms: u32,
    /// Planner cycle period (milliseconds)
    pub planner_period_ms: u32,
    /// Safety monitor sampling period (milliseconds)
    pub safety_period_ms: u32,
    /// How long the debouncer waits on a full event channel (milliseconds)
    pub event_send_timeout_ms: u32,

    // --- Shaft geometry ---
    /// Absolute position of floors 1..3 (cm)
    pub floor_positions_cm: [i32; 3],
    /// Distance the car needs to stop safely from travel speed (cm)
    pub safe_stop_distance_cm: i32,
    /// Lowest reachable car position (cm)
    pub travel_min_cm: i32,
    /// Highest reachable car position (cm)
    pub travel_max_cm: i32,

    // --- Safety monitor ---
    /// Max distance between tracked position and a floor while at-floor (cm)
    pub at_floor_tolerance_cm: i32,
    /// Speed sampling window (milliseconds)
    pub speed_window_ms: u32,
    /// Max travel within one speed window (cm)
    pub max_window_travel_cm: i32,
    /// Max time from stop press to motor stopped (milliseconds)
    pub stop_deadline_ms: u32,
    /// Min time the car stays stopped at a floor (milliseconds)
    pub min_dwell_ms: u32,

    // --- Simulation plant ---
    pub sim: SimConfig,
}

/// Parameters of the simulated car used by the host binary and tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Time the motor needs to travel one centimetre (milliseconds)
    pub step_period_ms: u32,
    /// Half-width of the band in which the at-floor line reads high (cm)
    pub at_floor_band_cm: i32,
    /// How long the doors stay open after an arrival (milliseconds)
    pub door_open_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Task periods
            debounce_poll_ms: 10,
            tracker_poll_ms: 3,
            planner_period_ms: 10,
            safety_period_ms: 10,
            event_send_timeout_ms: 1000,

            // Geometry
            floor_positions_cm: [0, 400, 800],
            safe_stop_distance_cm: 20,
            travel_min_cm: 0,
            travel_max_cm: 800,

            // Safety monitor
            at_floor_tolerance_cm: 2,
            speed_window_ms: 60, // 50 cm/s -> 3 cm per window
            max_window_travel_cm: 4,
            stop_deadline_ms: 1000,
            min_dwell_ms: 1000,

            sim: SimConfig::default(),
        }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            step_period_ms: 20, // 50 cm/s
            at_floor_band_cm: 1,
            door_open_ms: 1500,
        }
    }
}

impl SystemConfig {
    /// Absolute position of `floor` (cm).
    pub fn floor_position(&self, floor: Floor) -> i32 {
        self.floor_positions_cm[floor.index()]
    }

    /// Number of safety ticks in one speed window.
    pub fn speed_window_ticks(&self) -> u32 {
        ticks(self.speed_window_ms, self.safety_period_ms)
    }

    /// Number of safety ticks a held stop button may leave the motor running.
    pub fn stop_deadline_ticks(&self) -> u32 {
        ticks(self.stop_deadline_ms, self.safety_period_ms)
    }

    /// Number of safety ticks the car must stay stopped at a floor.
    pub fn dwell_ticks(&self) -> u32 {
        ticks(self.min_dwell_ms, self.safety_period_ms)
    }

    /// Reject inconsistent parameter sets.  Values are never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debounce_poll_ms == 0
            || self.tracker_poll_ms == 0
            || self.planner_period_ms == 0
            || self.safety_period_ms == 0
        {
            return Err(ConfigError::ValidationFailed("task periods must be non-zero"));
        }
        let [f1, f2, f3] = self.floor_positions_cm;
        if !(f1 < f2 && f2 < f3) {
            return Err(ConfigError::ValidationFailed(
                "floor positions must be strictly increasing",
            ));
        }
        if self.travel_min_cm > f1 || self.travel_max_cm < f3 {
            return Err(ConfigError::ValidationFailed(
                "travel range must contain every floor",
            ));
        }
        if self.safe_stop_distance_cm < 0 {
            return Err(ConfigError::ValidationFailed("safe stop distance must be >= 0"));
        }
        let min_spacing = (f2 - f1).min(f3 - f2);
        if self.at_floor_tolerance_cm < 0 || self.at_floor_tolerance_cm * 2 >= min_spacing {
            return Err(ConfigError::ValidationFailed(
                "at-floor tolerance must be below half the floor spacing",
            ));
        }
        if self.speed_window_ticks() == 0 || self.max_window_travel_cm <= 0 {
            return Err(ConfigError::ValidationFailed(
                "speed window must span at least one safety tick",
            ));
        }
        if self.stop_deadline_ticks() == 0 {
            return Err(ConfigError::ValidationFailed(
                "stop deadline must span at least one safety tick",
            ));
        }
        self.sim.validate(self)
    }
}

impl SimConfig {
    fn validate(&self, system: &SystemConfig) -> Result<(), ConfigError> {
        if self.step_period_ms < 2 {
            return Err(ConfigError::ValidationFailed("sim step period must be >= 2 ms"));
        }
        // The tracker may lag the plant by one pulse.
        if self.at_floor_band_cm < 0 || self.at_floor_band_cm >= system.at_floor_tolerance_cm {
            return Err(ConfigError::ValidationFailed(
                "sim at-floor band must be narrower than the at-floor tolerance",
            ));
        }
        if self.door_open_ms <= system.min_dwell_ms {
            return Err(ConfigError::ValidationFailed(
                "sim door hold time must exceed the minimum dwell",
            ));
        }
        let per_window = system.speed_window_ms.div_ceil(self.step_period_ms) as i32;
        if per_window + 1 > system.max_window_travel_cm {
            return Err(ConfigError::ValidationFailed(
                "sim speed exceeds the monitored speed bound",
            ));
        }
        Ok(())
    }
}

fn ticks(duration_ms: u32, period_ms: u32) -> u32 {
    if period_ms == 0 {
        return 0;
    }
    duration_ms / period_ms
}
