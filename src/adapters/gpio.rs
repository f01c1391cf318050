//! GPIO input adapter.
//!
//! Implements [`RawInputPort`] over seven `embedded-hal` input pins, one
//! per [`InputLine`].  The HAL's pins are expected to be degraded to a
//! single pin type.  Pins are read by several tasks, so each sits behind
//! its own mutex.

use std::sync::{Mutex, PoisonError};

use embedded_hal::digital::InputPin;
use log::warn;

use crate::app::ports::RawInputPort;
use crate::pins::InputLine;

pub struct GpioInputs<P> {
    pins: [Mutex<P>; InputLine::COUNT],
}

impl<P: InputPin> GpioInputs<P> {
    /// `pins` is indexed by [`InputLine::index`].
    pub fn new(pins: [P; InputLine::COUNT]) -> Self {
        Self {
            pins: pins.map(Mutex::new),
        }
    }
}

impl<P: InputPin> RawInputPort for GpioInputs<P> {
    fn read_raw_line(&self, line: InputLine) -> bool {
        let mut pin = self.pins[line.index()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match pin.is_high() {
            Ok(level) => level,
            Err(e) => {
                // A failed read counts as low; the debouncer absorbs it.
                warn!("GPIO {} ({}) read failed: {:?}", line.gpio(), line.name(), e);
                false
            }
        }
    }
}
