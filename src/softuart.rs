//! Module: softuart
//!
//! Purpose: Software asynchronous serial transmitter. Shifts one framed
//! byte out of a GPIO line, bit by bit, paced by a hardware timer's
//! compare-match interrupt. 9600-8-N-1, idle high, LSB first, no flow
//! control, no buffering.
//!
//! The engine is pure state-machine logic. Hardware enters only through
//! two seams: [`TxLine`] (the output pin) and [`BitTimer`] (the compare
//! unit). Both are implemented by ESP-IDF wrappers on target and by
//! recording fakes in tests, so the bit-exact behavior is host-testable.
//!
//! Timing rule: every compare-match moves the next deadline by exactly one
//! bit period *relative to the previous deadline*, never relative to
//! "now". Interrupt dispatch latency therefore jitters individual edges
//! but can never accumulate drift across a frame.
//!
//! Safety: Safe. No unsafe blocks; foreground/ISR handoff via atomics.

use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU8, Ordering};

use crate::config::{Count, BIT_PERIOD_TICKS, DECIMAL_TOP, FRAME_BITS};

/// Serial output line. Idle level is high (mark).
pub trait TxLine {
    fn set_high(&self);
    fn set_low(&self);
}

/// Compare-match timer pacing bit emission.
///
/// The transmitter owns the compare unit exclusively while a frame is in
/// flight and releases it through `disarm` so other duties of the timer
/// block are not starved.
pub trait BitTimer {
    /// Start the timer and schedule the first compare-match `ticks` from
    /// now, with the match interrupt enabled.
    fn arm(&self, ticks: u16);

    /// Move the compare target exactly `ticks` past the *previous* target.
    ///
    /// Implementations must add to the last programmed target, not to the
    /// current count; this is the no-drift contract the whole transmitter
    /// rests on.
    fn extend(&self, ticks: u16);

    /// Disable the compare-match interrupt and idle the timer.
    fn disarm(&self);
}

/// One in-flight transmit frame: 10-bit shift register plus bit counter.
///
/// Exactly one frame is active at a time; `load` while busy is a caller
/// error excluded by the blocking calling convention of [`Transmitter`].
pub struct TxEngine {
    /// Remaining pattern, low bit transmitted next.
    frame: AtomicU16,

    /// Bits not yet clocked out.
    bits_left: AtomicU8,

    /// Set by `load`, cleared by the compare handler after the stop bit.
    busy: AtomicBool,
}

impl TxEngine {
    pub const fn new() -> Self {
        Self {
            frame: AtomicU16::new(0),
            bits_left: AtomicU8::new(0),
            busy: AtomicBool::new(false),
        }
    }

    /// Stage one byte for transmission.
    ///
    /// Builds the frame pattern: stop bit (logic 1) above the data bits,
    /// then a left shift pulls the start bit (logic 0) into the lowest
    /// position.
    #[inline]
    pub fn load(&self, byte: u8) {
        let pattern = ((byte as u16) | 0x100) << 1;
        self.frame.store(pattern, Ordering::Relaxed);
        self.bits_left.store(FRAME_BITS, Ordering::Relaxed);
        self.busy.store(true, Ordering::Release);
    }

    /// Frame still clocking out?
    #[inline]
    pub fn busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Compare-match handler. Call once per timer match interrupt.
    ///
    /// Deadline bookkeeping comes first so the next edge lands one bit
    /// period after the previous target regardless of how late this
    /// handler ran. With all bits already out, the extra match after the
    /// stop bit releases the timer; the stop bit is thereby held for a
    /// full period before the line is considered free.
    pub fn on_compare_match<L: TxLine, T: BitTimer>(&self, line: &L, timer: &T) {
        timer.extend(BIT_PERIOD_TICKS);

        let left = self.bits_left.load(Ordering::Relaxed);
        if left == 0 {
            timer.disarm();
            self.busy.store(false, Ordering::Release);
        } else {
            let pattern = self.frame.load(Ordering::Relaxed);
            if pattern & 0x1 != 0 {
                line.set_high();
            } else {
                line.set_low();
            }
            self.frame.store(pattern >> 1, Ordering::Relaxed);
            self.bits_left.store(left - 1, Ordering::Relaxed);
        }
    }

    #[cfg(test)]
    fn frame_bits(&self) -> (u16, u8) {
        (
            self.frame.load(Ordering::Relaxed),
            self.bits_left.load(Ordering::Relaxed),
        )
    }
}

impl Default for TxEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Decimal ASCII digits of a value, most significant first, leading zeros
/// suppressed. Zero yields the single byte `'0'`, never nothing.
///
/// Repeated division by descending powers of ten, starting from the
/// largest power fitting the counter type. A digit is emitted once a
/// non-zero digit has been seen or the units position is reached.
pub fn decimal_digits(value: Count) -> DecimalDigits {
    DecimalDigits {
        remainder: value,
        divisor: DECIMAL_TOP,
        leading: true,
    }
}

pub struct DecimalDigits {
    remainder: Count,
    divisor: Count,
    leading: bool,
}

impl Iterator for DecimalDigits {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        while self.divisor > 0 {
            let digit = (self.remainder / self.divisor) as u8;
            let emit = digit != 0 || !self.leading || self.divisor == 1;

            if emit {
                self.leading = false;
                self.remainder -= digit as Count * self.divisor;
            }
            self.divisor /= 10;

            if emit {
                return Some(b'0' + digit);
            }
        }
        None
    }
}

/// Blocking byte/number transmitter over the bit engine.
///
/// Synchronous semantics on top of the asynchronous compare-match
/// mechanism: each call busy-waits until the engine released the timer.
/// The wait is a plain spin on the completion flag, not a suspension
/// point, and has no timeout: if the compare interrupt never fires the
/// call never returns. Acceptable for a dedicated device with a
/// known-good clock.
pub struct Transmitter<'a, L: TxLine, T: BitTimer> {
    engine: &'a TxEngine,
    line: &'a L,
    timer: &'a T,
}

impl<'a, L: TxLine, T: BitTimer> Transmitter<'a, L, T> {
    pub fn new(engine: &'a TxEngine, line: &'a L, timer: &'a T) -> Self {
        Self {
            engine,
            line,
            timer,
        }
    }

    /// Send one byte, framed 8-N-1. Returns after the stop bit clocked out.
    pub fn transmit_byte(&self, byte: u8) {
        self.line.set_high(); // idle as mark until the start bit
        self.engine.load(byte);
        self.timer.arm(BIT_PERIOD_TICKS); // first bit one period out

        while self.engine.busy() {
            core::hint::spin_loop();
        }
    }

    /// Send an unsigned value as decimal ASCII, no leading zeros.
    pub fn transmit_number(&self, value: Count) {
        for byte in decimal_digits(value) {
            self.transmit_byte(byte);
        }
    }

    /// Send one full report line: `<counter><space><rate><LF><CR>`.
    pub fn transmit_report(&self, counter: Count, rate: Count) {
        self.transmit_number(counter);
        self.transmit_byte(b' ');
        self.transmit_number(rate);
        self.transmit_byte(b'\n');
        self.transmit_byte(b'\r');
    }
}
