//! Input drivers.

pub mod debounce;
