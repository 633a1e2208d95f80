//! Module: config
//!
//! Purpose: Fixed timing and wire-format constants for the pulse counter.
//! Nothing here is runtime-configurable; this is a single dedicated device
//! with one clock, one baud rate and one sampling window. Changing the
//! timer clock means recomputing [`BIT_PERIOD_TICKS`], which is why the
//! derivation stays visible in the source.
//!
//! Timing-contract violations are compile-time failures (the `const`
//! assertions at the bottom), never runtime error paths.

/// Counter width used for the pulse counter, the baseline snapshot and the
/// derived rate.
///
/// Deliberately constrained to 16 bits: that is an atomic access width on
/// every supported target, so the foreground report loop can read counters
/// written by interrupt handlers without a critical section. Rate
/// computation is modular over this width and stays correct across at most
/// one counter wraparound per sampling window.
pub type Count = u16;

/// Largest power of ten representable in [`Count`].
///
/// First divisor for decimal rendering (5 digits for u16).
pub const DECIMAL_TOP: Count = 10_000;

/// Clock feeding the bit-transmit compare timer, in Hz.
pub const TIMER_CLOCK_HZ: u32 = 1_000_000;

/// Telemetry line baud rate. 8 data bits, no parity, 1 stop bit, idle high.
pub const BAUD_RATE: u32 = 9_600;

/// One serial bit period in compare-timer ticks.
///
/// 1 MHz / 9600 = 104 ticks. The compare target is advanced by exactly
/// this amount per bit, always relative to the previous target.
pub const BIT_PERIOD_TICKS: u16 = (TIMER_CLOCK_HZ / BAUD_RATE) as u16;

/// Bits per transmitted frame: 1 start + 8 data + 1 stop.
pub const FRAME_BITS: u8 = 10;

/// Period of the low-power sampling tick, in milliseconds.
pub const TICK_PERIOD_MS: u32 = 32;

/// Sampling ticks per reporting window. 1875 ticks of 32 ms = 60 s.
///
/// The tick accumulator multiplies the short tick into the long window; a
/// dedicated 60 s timer is deliberately not used.
pub const WINDOW_TICKS: u32 = 1_875;

/// Sampling ticks per half-period of the reference square wave on the
/// marker output. Independent threshold against the same tick source as
/// [`WINDOW_TICKS`], not a second timer. 16 ticks = 512 ms half-period.
pub const MARKER_TICKS: u32 = 16;

/// Reporting cadence of the foreground scheduler, in milliseconds.
pub const REPORT_PERIOD_MS: u32 = 1_000;

// One bit period must fit the 16-bit compare arithmetic with room for a
// whole frame of additive extensions.
const _: () = assert!(TIMER_CLOCK_HZ / BAUD_RATE <= u16::MAX as u32);
const _: () = assert!(BIT_PERIOD_TICKS as u32 * FRAME_BITS as u32 <= u16::MAX as u32);

// The documented window is exactly 60 seconds of ticks.
const _: () = assert!(WINDOW_TICKS * TICK_PERIOD_MS == 60_000);

// A full 10-bit frame must clock out well inside one sampling tick, so a
// blocking byte transmission can never overlap a pending sampling deadline
// by more than one bit period of slack.
const _: () = assert!(
    FRAME_BITS as u32 * BIT_PERIOD_TICKS as u32 * 1_000 < TICK_PERIOD_MS * TIMER_CLOCK_HZ
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_period_for_9600_baud() {
        // SMCLK at 1 MHz gives the classic 104-tick bit period.
        assert_eq!(BIT_PERIOD_TICKS, 104);
    }

    #[test]
    fn test_window_is_one_minute() {
        assert_eq!(WINDOW_TICKS as u64 * TICK_PERIOD_MS as u64, 60_000);
    }

    #[test]
    fn test_decimal_top_fits_count() {
        // 10_000 is the largest power of ten below u16::MAX.
        assert!(DECIMAL_TOP as u32 * 10 > Count::MAX as u32);
    }
}
