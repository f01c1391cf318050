//! Ordered pin event channel between the debouncer and the planner.
//!
//! Events are produced by the input debouncer, one per confirmed edge, and
//! consumed by the planner at the start of every cycle.
//!
//! ```text
//! ┌─────────────┐  PinEvent   ┌──────────────┐     ┌──────────────┐
//! │ Debouncer   │────────────▶│ EventChannel │────▶│   Planner    │
//! │ (10 ms)     │  send_timeout│ (bounded)    │drain│   (10 ms)    │
//! └─────────────┘             └──────────────┘     └──────────────┘
//! ```
//!
//! The backing store is an `embassy-sync` bounded MPMC channel.  Producer
//! blocking is bounded by a timeout; the consumer never blocks.

use std::thread;
use std::time::{Duration, Instant};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};

use crate::error::ChannelError;

/// Maximum number of pending events.
pub const EVENT_QUEUE_CAP: usize = 16;

/// How often a blocked sender retries.
const SEND_RETRY_INTERVAL: Duration = Duration::from_millis(1);

/// Closed set of events recognised by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PinEvent {
    // ── Floor calls ───────────────────────────────────────
    ToFloor1 = 0,
    ToFloor2 = 1,
    ToFloor3 = 2,

    // ── Shaft / door sensors ──────────────────────────────
    ArrivedAtFloor = 10,
    LeftFloor = 11,
    DoorsClosed = 12,
    DoorsOpening = 13,

    // ── Stop button ───────────────────────────────────────
    StopPressed = 20,
    StopReleased = 21,
}

/// Bounded, ordered event channel.
pub struct EventChannel {
    inner: Channel<CriticalSectionRawMutex, PinEvent, EVENT_QUEUE_CAP>,
}

impl EventChannel {
    pub const fn new() -> Self {
        Self {
            inner: Channel::new(),
        }
    }

    /// Push without waiting.  Returns `false` if the channel is full.
    pub fn try_send(&self, event: PinEvent) -> bool {
        self.inner.try_send(event).is_ok()
    }

    /// Push, retrying while the channel is full for at most `timeout`.
    pub fn send_timeout(&self, event: PinEvent, timeout: Duration) -> Result<(), ChannelError> {
        let deadline = Instant::now() + timeout;
        let mut pending = event;
        loop {
            match self.inner.try_send(pending) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Full(back)) => {
                    if Instant::now() >= deadline {
                        return Err(ChannelError::SendTimeout);
                    }
                    pending = back;
                    thread::sleep(SEND_RETRY_INTERVAL);
                }
            }
        }
    }

    /// Pop one event.  Never blocks.
    pub fn try_recv(&self) -> Option<PinEvent> {
        self.inner.try_receive().ok()
    }

    /// Hand exactly the events pending at call time to `handler`, in FIFO
    /// order.  Events sent while draining wait for the next call.
    /// Returns the number of events handled.
    pub fn drain(&self, mut handler: impl FnMut(PinEvent)) -> usize {
        let pending = self.inner.len();
        let mut handled = 0;
        while handled < pending {
            let Some(event) = self.try_recv() else {
                break;
            };
            handler(event);
            handled += 1;
        }
        handled
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let ch = EventChannel::new();
        assert!(ch.try_send(PinEvent::ToFloor2));
        assert!(ch.try_send(PinEvent::DoorsClosed));
        assert_eq!(ch.try_recv(), Some(PinEvent::ToFloor2));
        assert_eq!(ch.try_recv(), Some(PinEvent::DoorsClosed));
        assert_eq!(ch.try_recv(), None);
    }

    #[test]
    fn full_channel_rejects_try_send() {
        let ch = EventChannel::new();
        for _ in 0..EVENT_QUEUE_CAP {
            assert!(ch.try_send(PinEvent::ToFloor1));
        }
        assert!(!ch.try_send(PinEvent::ToFloor3));
        assert_eq!(ch.len(), EVENT_QUEUE_CAP);
    }

    #[test]
    fn send_timeout_expires_on_full_channel() {
        let ch = EventChannel::new();
        for _ in 0..EVENT_QUEUE_CAP {
            assert!(ch.try_send(PinEvent::ToFloor1));
        }
        let started = Instant::now();
        let res = ch.send_timeout(PinEvent::StopPressed, Duration::from_millis(20));
        assert_eq!(res, Err(ChannelError::SendTimeout));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn drain_is_bounded_by_pending_count() {
        let ch = EventChannel::new();
        ch.try_send(PinEvent::ToFloor1);
        ch.try_send(PinEvent::ToFloor2);
        let mut seen = Vec::new();
        let n = ch.drain(|ev| {
            seen.push(ev);
            // Events produced during the drain are left for the next cycle.
            ch.try_send(PinEvent::ToFloor3);
        });
        assert_eq!(n, 2);
        assert_eq!(seen, [PinEvent::ToFloor1, PinEvent::ToFloor2]);
        assert_eq!(ch.len(), 2);
    }
}
