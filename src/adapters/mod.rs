//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements                             | Connects to           |
//! |---------------|----------------------------------------|-----------------------|
//! | `gpio`        | RawInputPort                           | `embedded-hal` pins   |
//! | `log_sink`    | EventSink                              | `log` facade          |
//! | `config_file` | ConfigPort                             | JSON file on disk     |
//! | `sim`         | RawInputPort, CarPort, MotorObserverPort | Simulated shaft/motor |

pub mod config_file;
pub mod gpio;
pub mod log_sink;
pub mod sim;
