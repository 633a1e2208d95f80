//! Module: pulse
//!
//! Purpose: The monotonic event counter fed by the tube input. One
//! qualifying edge equals exactly one increment; there is no debouncing
//! and no rejection. The signal source is the limiting factor, not this
//! handler.
//!
//! Access discipline: `on_edge` is called from the input-edge interrupt
//! only. Reads happen from the tick handler and the foreground report
//! loop. The counter is a single atomic word, so no reader needs a
//! critical section.
//!
//! Safety: Safe. No unsafe blocks.

use core::sync::atomic::{AtomicU16, Ordering};

use crate::config::Count;

/// Monotonic pulse counter.
///
/// Wraps silently on overflow; wraparound is expected and corrected by the
/// rate sampler, never here. This operation cannot fail.
pub struct PulseCounter {
    count: AtomicU16,
}

impl PulseCounter {
    /// Counter starting at zero.
    pub const fn new() -> Self {
        Self::starting_at(0)
    }

    /// Counter starting at an arbitrary value.
    ///
    /// Useful for exercising wraparound without waiting for 65536 pulses.
    pub const fn starting_at(start: Count) -> Self {
        Self {
            count: AtomicU16::new(start),
        }
    }

    /// Record one qualifying edge.
    ///
    /// Increments by exactly one per invocation, even if several physical
    /// edges collapsed into a single interrupt service. Clearing the
    /// hardware interrupt flag is the edge glue's responsibility.
    #[inline]
    pub fn on_edge(&self) {
        // fetch_add on an atomic word wraps, matching the counter contract.
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Current counter value.
    #[inline]
    pub fn read(&self) -> Count {
        self.count.load(Ordering::Relaxed)
    }
}

impl Default for PulseCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_increment_per_edge() {
        let counter = PulseCounter::new();

        for expected in 1..=37 {
            counter.on_edge();
            assert_eq!(counter.read(), expected);
        }
    }

    #[test]
    fn test_wraps_silently() {
        let counter = PulseCounter::starting_at(Count::MAX);

        counter.on_edge();
        assert_eq!(counter.read(), 0);

        counter.on_edge();
        assert_eq!(counter.read(), 1);
    }

    #[test]
    fn test_concurrent_edges_all_counted() {
        use std::sync::Arc;
        use std::thread;

        let counter = Arc::new(PulseCounter::new());
        let mut handles = vec![];

        for _ in 0..4 {
            let counter = Arc::clone(&counter);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    counter.on_edge();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.read(), 4000);
    }
}
