//! # GeigerTelemetry
//!
//! Radiation-pulse counter with software-UART telemetry.
//!
//! ## Architecture
//!
//! Three interrupt-driven components sharing a handful of atomic counters:
//! - [`PulseCounter`]: one increment per qualifying input edge
//! - [`RateSampler`]: closes a 60 s window every 1875 sampling ticks
//! - [`TxEngine`]: clocks framed bytes out of a GPIO line on timer
//!   compare-matches, one bit period apart
//!
//! Everything timing-critical is pure logic behind the [`TxLine`] and
//! [`BitTimer`] seams and runs on the host; hardware lives in `hal` and
//! `main`, behind the `esp32` feature.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod logging;
pub mod pulse;
pub mod rate;
pub mod softuart;
pub mod state;

#[cfg(feature = "esp32")]
pub mod hal;

pub use config::Count;
pub use pulse::PulseCounter;
pub use rate::{RateSampler, TickOutcome};
pub use softuart::{BitTimer, Transmitter, TxEngine, TxLine};
pub use state::TelemetryState;
