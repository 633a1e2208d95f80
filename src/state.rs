//! Module: state
//!
//! Purpose: The shared device state read by the foreground report loop and
//! written by the two interrupt contexts. Replaces the original firmware's
//! loose globals with one structure carrying an explicit access
//! discipline.
//!
//! Write discipline:
//! - `pulses` is written only by the input-edge handler,
//! - `rate` is written only by the periodic-tick handler,
//! - the foreground loop reads both, lock-free (single atomic words).
//!
//! The baseline snapshot and the tick accumulator are *not* here: they
//! belong to exactly one context (the tick handler) and live inside
//! [`crate::rate::RateSampler`].
//!
//! Safety: Safe. No unsafe blocks.

use core::sync::atomic::{AtomicU16, Ordering};

use crate::config::Count;
use crate::pulse::PulseCounter;

/// Counters shared between interrupt handlers and the report loop.
pub struct TelemetryState {
    /// Monotonic pulse count. Edge-handler writes only.
    pub pulses: PulseCounter,

    /// Events counted in the last closed sampling window.
    /// Tick-handler writes only.
    rate: AtomicU16,
}

impl TelemetryState {
    pub const fn new() -> Self {
        Self::starting_at(0)
    }

    /// State with a preset pulse count (wraparound tests, bench rigs).
    pub const fn starting_at(pulses: Count) -> Self {
        Self {
            pulses: PulseCounter::starting_at(pulses),
            rate: AtomicU16::new(0),
        }
    }

    /// Rate of the last closed window.
    #[inline]
    pub fn rate(&self) -> Count {
        self.rate.load(Ordering::Relaxed)
    }

    /// Publish a freshly computed window rate. Tick handler only.
    #[inline]
    pub(crate) fn set_rate(&self, rate: Count) {
        self.rate.store(rate, Ordering::Relaxed);
    }

    /// One coherent `(counter, rate)` pair for a report cycle.
    ///
    /// Coherent per field, not across fields: a pulse arriving between the
    /// two loads shows up in the counter but not in the rate until the
    /// next window closes. That matches the wire contract.
    #[inline]
    pub fn snapshot(&self) -> (Count, Count) {
        (self.pulses.read(), self.rate())
    }
}

impl Default for TelemetryState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_both_fields() {
        let state = TelemetryState::new();

        state.pulses.on_edge();
        state.pulses.on_edge();
        state.set_rate(2);

        assert_eq!(state.snapshot(), (2, 2));
    }

    #[test]
    fn test_preset_start_value() {
        let state = TelemetryState::starting_at(Count::MAX - 20);
        assert_eq!(state.pulses.read(), Count::MAX - 20);
        assert_eq!(state.rate(), 0);
    }
}
