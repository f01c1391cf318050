//! Application core — control logic orchestration, zero I/O.
//!
//! Wires the debouncer, position tracker, planner and safety monitor into
//! one [`service::ElevatorCore`].  All interaction with hardware happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod events;
pub mod ports;
pub mod service;
