//! End-to-end report cycle: counter and rate through the sampler, out over
//! the blocking transmitter, decoded back off the simulated wire.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::thread;

use rust_geiger_telemetry::config::{FRAME_BITS, WINDOW_TICKS};
use rust_geiger_telemetry::{
    BitTimer, RateSampler, TelemetryState, Transmitter, TxEngine, TxLine,
};

struct WireLine {
    level: AtomicBool,
}

impl WireLine {
    fn new() -> Self {
        Self {
            level: AtomicBool::new(true),
        }
    }
}

impl TxLine for WireLine {
    fn set_high(&self) {
        self.level.store(true, Ordering::Relaxed);
    }
    fn set_low(&self) {
        self.level.store(false, Ordering::Relaxed);
    }
}

struct WireTimer {
    armed: AtomicBool,
    deadline: AtomicU64,
}

impl WireTimer {
    fn new() -> Self {
        Self {
            armed: AtomicBool::new(false),
            deadline: AtomicU64::new(0),
        }
    }
}

impl BitTimer for WireTimer {
    fn arm(&self, ticks: u16) {
        self.deadline.store(ticks as u64, Ordering::Relaxed);
        self.armed.store(true, Ordering::Release);
    }
    fn extend(&self, ticks: u16) {
        self.deadline.fetch_add(ticks as u64, Ordering::Relaxed);
    }
    fn disarm(&self) {
        self.armed.store(false, Ordering::Release);
    }
}

/// Interrupt stand-in: services every pending compare-match, recording the
/// line level held for each emitted bit.
fn drive_wire(
    engine: &TxEngine,
    line: &WireLine,
    timer: &WireTimer,
    bits: &Mutex<Vec<bool>>,
    stop: &AtomicBool,
) {
    while !stop.load(Ordering::Acquire) {
        if timer.armed.load(Ordering::Acquire) {
            engine.on_compare_match(line, timer);
            if engine.busy() {
                bits.lock().unwrap().push(line.level.load(Ordering::Relaxed));
            }
        } else {
            thread::yield_now();
        }
    }
}

/// Split the bit record into 10-bit frames and decode the payload bytes.
fn decode_wire(bits: &[bool]) -> String {
    assert_eq!(bits.len() % FRAME_BITS as usize, 0, "partial frame on wire");

    let mut out = String::new();
    for frame in bits.chunks(FRAME_BITS as usize) {
        assert!(!frame[0], "start bit must be low");
        assert!(frame[9], "stop bit must be high");
        let mut byte = 0u8;
        for (i, &level) in frame[1..9].iter().enumerate() {
            if level {
                byte |= 1 << i;
            }
        }
        out.push(byte as char);
    }
    out
}

// FnMut: report closures drive a sampler between reports, which needs a
// mutable capture.
fn transmit_and_decode(mut reports: impl FnMut(&Transmitter<'_, WireLine, WireTimer>)) -> String {
    let engine = TxEngine::new();
    let line = WireLine::new();
    let timer = WireTimer::new();
    let bits = Mutex::new(Vec::new());
    let stop = AtomicBool::new(false);

    thread::scope(|s| {
        let driver = s.spawn(|| drive_wire(&engine, &line, &timer, &bits, &stop));

        let transmitter = Transmitter::new(&engine, &line, &timer);
        reports(&transmitter);

        stop.store(true, Ordering::Release);
        driver.join().unwrap();
    });

    let bits = bits.into_inner().unwrap();
    decode_wire(&bits)
}

#[test]
fn test_reference_two_window_report() {
    let state = TelemetryState::new();
    let mut sampler = RateSampler::new(0);

    // Window 1: 37 qualifying edges.
    for _ in 0..37 {
        state.pulses.on_edge();
    }
    for _ in 0..WINDOW_TICKS {
        sampler.on_tick(&state);
    }

    let wire = transmit_and_decode(|tx| {
        let (counter, rate) = state.snapshot();
        tx.transmit_report(counter, rate);

        // Window 2: no further edges.
        for _ in 0..WINDOW_TICKS {
            sampler.on_tick(&state);
        }
        let (counter, rate) = state.snapshot();
        tx.transmit_report(counter, rate);
    });

    assert_eq!(wire, "37 37\n\r37 0\n\r");
}

#[test]
fn test_fresh_device_reports_zeros() {
    let state = TelemetryState::new();

    let wire = transmit_and_decode(|tx| {
        let (counter, rate) = state.snapshot();
        tx.transmit_report(counter, rate);
    });

    assert_eq!(wire, "0 0\n\r");
}

#[test]
fn test_transmit_byte_blocks_until_frame_done() {
    let engine = TxEngine::new();
    let line = WireLine::new();
    let timer = WireTimer::new();
    let bits = Mutex::new(Vec::new());
    let stop = AtomicBool::new(false);

    thread::scope(|s| {
        let driver = s.spawn(|| drive_wire(&engine, &line, &timer, &bits, &stop));

        let transmitter = Transmitter::new(&engine, &line, &timer);
        transmitter.transmit_byte(b'G');

        // Synchronous contract: by the time the call returns, the frame
        // has fully clocked out and the timer was released.
        assert!(!engine.busy());
        assert!(!timer.armed.load(Ordering::Acquire));
        assert_eq!(bits.lock().unwrap().len(), FRAME_BITS as usize);

        stop.store(true, Ordering::Release);
        driver.join().unwrap();
    });

    let bits = bits.into_inner().unwrap();
    assert_eq!(decode_wire(&bits), "G");
}

#[test]
fn test_wraparound_counter_on_the_wire() {
    let state = TelemetryState::starting_at(65_530);
    let mut sampler = RateSampler::new(65_530);

    for _ in 0..11 {
        state.pulses.on_edge(); // counter wraps to 5
    }
    for _ in 0..WINDOW_TICKS {
        sampler.on_tick(&state);
    }

    let wire = transmit_and_decode(|tx| {
        let (counter, rate) = state.snapshot();
        tx.transmit_report(counter, rate);
    });

    assert_eq!(wire, "5 11\n\r");
}
