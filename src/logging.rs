//! Module: logging
//!
//! Purpose: Interrupt-safe diagnostics. Handlers must never block on the
//! debug console, so they push fixed-size entries into a lock-free ring;
//! the foreground loop drains the ring to the hardware debug UART at its
//! leisure. Entries are dropped (and counted) when the ring is full.
//!
//! The telemetry soft-UART is *not* a log sink; it carries the counter
//! report line and nothing else.
//!
//! Safety: One `unsafe impl Sync` and two slot accesses, both guarded by
//! the atomic index protocol (producers reserve distinct slots via
//! compare-exchange and publish them through per-slot stamps; the single
//! consumer only touches committed slots).

use core::cell::UnsafeCell;
use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

/// Longest trace message, in bytes. Longer messages are truncated.
pub const MAX_TRACE_LEN: usize = 64;

/// Default ring capacity. Must be a power of two.
pub const TRACE_RING_SIZE: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TraceLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl TraceLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            TraceLevel::Error => "ERROR",
            TraceLevel::Warn => "WARN",
            TraceLevel::Info => "INFO",
            TraceLevel::Debug => "DEBUG",
        }
    }
}

/// One fixed-size trace record.
#[derive(Clone, Copy)]
pub struct TraceEntry {
    pub timestamp_us: i64,
    pub level: TraceLevel,
    pub len: u8,
    pub text: [u8; MAX_TRACE_LEN],
}

impl TraceEntry {
    const EMPTY: Self = Self {
        timestamp_us: 0,
        level: TraceLevel::Info,
        len: 0,
        text: [0; MAX_TRACE_LEN],
    };

    pub fn text(&self) -> &[u8] {
        &self.text[..self.len as usize]
    }
}

/// Lock-free trace ring: interrupt producers, one foreground consumer.
///
/// A slot's stamp holds `index + 1` of the entry committed to it, so the
/// consumer can tell a reserved-but-unwritten slot from a committed one.
pub struct TraceRing<const N: usize = TRACE_RING_SIZE> {
    slots: [UnsafeCell<TraceEntry>; N],
    stamps: [AtomicU32; N],
    write_idx: AtomicU32,
    read_idx: AtomicU32,
    dropped: AtomicU32,
}

// SAFETY: producers reserve distinct slots through compare-exchange on
// write_idx and publish with a Release stamp store; the consumer only reads
// slots whose stamp shows the commit.
unsafe impl<const N: usize> Sync for TraceRing<N> {}

impl<const N: usize> TraceRing<N> {
    const MASK: usize = N - 1;

    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "trace ring size must be a power of 2");
        Self {
            slots: [const { UnsafeCell::new(TraceEntry::EMPTY) }; N],
            stamps: [const { AtomicU32::new(0) }; N],
            write_idx: AtomicU32::new(0),
            read_idx: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
        }
    }

    /// Format and enqueue one entry. Never blocks; drops when full.
    ///
    /// Returns whether the entry was queued.
    pub fn log(&self, timestamp_us: i64, level: TraceLevel, args: fmt::Arguments<'_>) -> bool {
        let write = loop {
            let write = self.write_idx.load(Ordering::Relaxed);
            let read = self.read_idx.load(Ordering::Acquire);
            if write.wrapping_sub(read) >= N as u32 {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return false;
            }
            if self
                .write_idx
                .compare_exchange_weak(
                    write,
                    write.wrapping_add(1),
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                )
                .is_ok()
            {
                break write;
            }
        };

        let mut text = [0u8; MAX_TRACE_LEN];
        let len = write_truncated(&mut text, args);

        let idx = (write as usize) & Self::MASK;
        // SAFETY: the compare-exchange handed this producer a slot index no
        // other producer holds, and the stamp is still unset for this lap,
        // so the consumer will not touch the slot until the store below.
        unsafe {
            let slot = &mut *self.slots[idx].get();
            slot.timestamp_us = timestamp_us;
            slot.level = level;
            slot.len = len as u8;
            slot.text = text;
        }
        self.stamps[idx].store(write.wrapping_add(1), Ordering::Release);
        true
    }

    /// Dequeue the oldest entry, if any. Foreground consumer only.
    pub fn pop(&self) -> Option<TraceEntry> {
        let read = self.read_idx.load(Ordering::Relaxed);
        let idx = (read as usize) & Self::MASK;
        if self.stamps[idx].load(Ordering::Acquire) != read.wrapping_add(1) {
            return None;
        }

        // SAFETY: the stamp shows the producer committed this slot, and no
        // producer reuses it before read_idx moves past it.
        let entry = unsafe { *self.slots[idx].get() };
        self.read_idx.store(read.wrapping_add(1), Ordering::Release);
        Some(entry)
    }

    /// Entries lost to a full ring since the last `take_dropped`.
    pub fn take_dropped(&self) -> u32 {
        self.dropped.swap(0, Ordering::Relaxed)
    }
}

impl<const N: usize> Default for TraceRing<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Render an entry as a console line: `[timestamp] LEVEL: message\n`.
///
/// Returns the number of bytes written into `out`.
pub fn render_entry(entry: &TraceEntry, out: &mut [u8]) -> usize {
    use fmt::Write;

    let mut writer = SliceWriter { out, pos: 0 };
    let _ = write!(
        writer,
        "[{:10}] {}: ",
        entry.timestamp_us,
        entry.level.as_str()
    );
    let pos = writer.pos;
    let out = writer.out;

    let text = entry.text();
    let n = text.len().min(out.len().saturating_sub(pos + 1));
    out[pos..pos + n].copy_from_slice(&text[..n]);
    if pos + n < out.len() {
        out[pos + n] = b'\n';
        return pos + n + 1;
    }
    pos + n
}

fn write_truncated(out: &mut [u8], args: fmt::Arguments<'_>) -> usize {
    let mut writer = SliceWriter { out, pos: 0 };
    let _ = fmt::write(&mut writer, args);
    writer.pos
}

struct SliceWriter<'a> {
    out: &'a mut [u8],
    pos: usize,
}

impl fmt::Write for SliceWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        let n = bytes.len().min(self.out.len() - self.pos);
        self.out[self.pos..self.pos + n].copy_from_slice(&bytes[..n]);
        self.pos += n;
        Ok(())
    }
}

/// Enqueue a formatted trace entry from any context.
#[macro_export]
macro_rules! trace {
    ($ring:expr, $timestamp:expr, $level:expr, $($arg:tt)*) => {
        $ring.log($timestamp, $level, format_args!($($arg)*))
    };
}
