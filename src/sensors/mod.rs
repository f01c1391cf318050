//! Sensor subsystem: shaft encoder and position tracking.

pub mod position;
