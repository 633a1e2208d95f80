//! Hardware Abstraction Layer for GeigerTelemetry.
//!
//! Thin wrappers around ESP-IDF peripherals. Business logic stays in the
//! core modules; everything here is I/O plumbing and interrupt binding.

pub mod debug_uart;
pub mod gpio;
pub mod timer;

pub use gpio::{PinAssignment, SerialOut, TogglePin};
pub use timer::EspBitTimer;
