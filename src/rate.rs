//! Module: rate
//!
//! Purpose: Periodic rate sampling. Runs once per low-power sampling tick
//! (32 ms) and closes a reporting window every [`WINDOW_TICKS`] ticks,
//! publishing the number of pulses counted inside that window.
//!
//! The same raw tick also drives a reference square wave on the marker
//! output through a second, independent threshold. One tick source feeds
//! both; no second timer is involved.
//!
//! Access discipline: a `RateSampler` is owned by the periodic-tick
//! handler alone; its fields (baseline snapshot, tick accumulators) are
//! never shared. Only the published rate crosses contexts, through
//! [`TelemetryState`].
//!
//! Safety: Safe. No unsafe blocks.

use crate::config::{Count, MARKER_TICKS, WINDOW_TICKS};
use crate::state::TelemetryState;

/// Side effects requested by one sampling tick.
///
/// The tick glue performs these; the sampler itself touches no hardware.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// A reporting window just closed and a new rate was published.
    pub window_closed: bool,

    /// The marker output should toggle (reference square wave edge).
    pub toggle_marker: bool,
}

/// Tick-driven window accounting.
///
/// The delta is computed with wrapping subtraction over the counter width,
/// so the published rate is the true event count of the window even if the
/// pulse counter wrapped past its maximum, provided it wrapped at most
/// once per window. The single-wraparound limit is a documented precision
/// bound of the counter width.
pub struct RateSampler {
    /// Pulse count at the end of the previous window.
    baseline: Count,

    /// Ticks elapsed in the current window.
    window_ticks: u32,

    /// Ticks elapsed since the last marker toggle.
    marker_ticks: u32,
}

impl RateSampler {
    /// Sampler whose first window starts at the given counter value.
    ///
    /// Pass the counter's bring-up value so the first window does not
    /// report pre-existing counts as fresh events.
    pub const fn new(baseline: Count) -> Self {
        Self {
            baseline,
            window_ticks: 0,
            marker_ticks: 0,
        }
    }

    /// Advance by one sampling tick.
    ///
    /// On window close the rate is the wrapping difference between the
    /// current count and the baseline. Baseline and accumulator reset
    /// inside this same invocation, so no later tick can observe one
    /// updated without the other.
    pub fn on_tick(&mut self, state: &TelemetryState) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        self.marker_ticks += 1;
        if self.marker_ticks >= MARKER_TICKS {
            self.marker_ticks = 0;
            outcome.toggle_marker = true;
        }

        self.window_ticks += 1;
        if self.window_ticks >= WINDOW_TICKS {
            let now = state.pulses.read();
            state.set_rate(now.wrapping_sub(self.baseline));
            self.baseline = now;
            self.window_ticks = 0;
            outcome.window_closed = true;
        }

        outcome
    }

    /// Counter value the current window started from.
    #[inline]
    pub fn baseline(&self) -> Count {
        self.baseline
    }

    /// Ticks accumulated in the current window.
    #[inline]
    pub fn window_ticks(&self) -> u32 {
        self.window_ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_ticks(sampler: &mut RateSampler, state: &TelemetryState, n: u32) -> TickOutcome {
        let mut last = TickOutcome::default();
        for _ in 0..n {
            last = sampler.on_tick(state);
        }
        last
    }

    #[test]
    fn test_window_closes_after_configured_ticks() {
        let state = TelemetryState::new();
        let mut sampler = RateSampler::new(0);

        let outcome = run_ticks(&mut sampler, &state, WINDOW_TICKS - 1);
        assert!(!outcome.window_closed);

        let outcome = sampler.on_tick(&state);
        assert!(outcome.window_closed);
        assert_eq!(sampler.window_ticks(), 0);
    }

    #[test]
    fn test_rate_is_window_delta() {
        let state = TelemetryState::new();
        let mut sampler = RateSampler::new(0);

        for _ in 0..37 {
            state.pulses.on_edge();
        }
        run_ticks(&mut sampler, &state, WINDOW_TICKS);
        assert_eq!(state.rate(), 37);

        // Empty follow-up window: rate drops to zero, counter unchanged.
        run_ticks(&mut sampler, &state, WINDOW_TICKS);
        assert_eq!(state.rate(), 0);
        assert_eq!(state.pulses.read(), 37);
    }

    #[test]
    fn test_rate_across_counter_wraparound() {
        // baseline = 65530, now = 5: the true delta is 11.
        let state = TelemetryState::starting_at(65_530);
        let mut sampler = RateSampler::new(65_530);

        for _ in 0..11 {
            state.pulses.on_edge();
        }
        assert_eq!(state.pulses.read(), 5);

        run_ticks(&mut sampler, &state, WINDOW_TICKS);
        assert_eq!(state.rate(), 11);
        assert_eq!(sampler.baseline(), 5);
    }

    #[test]
    fn test_baseline_and_accumulator_reset_together() {
        let state = TelemetryState::new();
        let mut sampler = RateSampler::new(0);

        for _ in 0..5 {
            state.pulses.on_edge();
        }
        run_ticks(&mut sampler, &state, WINDOW_TICKS);

        assert_eq!(sampler.baseline(), 5);
        assert_eq!(sampler.window_ticks(), 0);
    }

    #[test]
    fn test_marker_threshold_independent_of_window() {
        let state = TelemetryState::new();
        let mut sampler = RateSampler::new(0);

        let mut toggles = 0u32;
        let mut closes = 0u32;
        for _ in 0..WINDOW_TICKS {
            let outcome = sampler.on_tick(&state);
            if outcome.toggle_marker {
                toggles += 1;
            }
            if outcome.window_closed {
                closes += 1;
            }
        }

        assert_eq!(closes, 1);
        assert_eq!(toggles, WINDOW_TICKS / MARKER_TICKS);
    }
}
