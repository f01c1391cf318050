//! liftcore — control core for a single-car, three-floor elevator.
//!
//! Exposes the pure-logic modules for integration testing and for the
//! simulator binary.  Hardware reaches the core only through the port
//! traits in [`app::ports`].

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod pins;
pub mod planner;
pub mod safety;
pub mod scheduler;

pub mod adapters;
pub mod drivers;
pub mod sensors;
