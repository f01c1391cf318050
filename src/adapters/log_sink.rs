//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade.  A telemetry or recording adapter would implement the
//! same trait.

use log::{error, info};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { floor } => {
                info!("START | at {}", floor);
            }
            AppEvent::RequestQueued { floor, at } => {
                info!("QUEUE | {} at {:?}", floor, at);
            }
            AppEvent::TargetChanged { floor, position_cm } => {
                info!("TARGET | {} ({} cm)", floor, position_cm);
            }
            AppEvent::FloorServiced { floor } => {
                info!("SERVICED | {}", floor);
            }
            AppEvent::StopLatched(held) => {
                info!("STOP | {}", if *held { "pressed" } else { "released" });
            }
            AppEvent::SafetyViolation(requirement) => {
                error!("HALT | {}", requirement);
            }
        }
    }
}
