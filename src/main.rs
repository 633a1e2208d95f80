//! GeigerTelemetry - Main entry point
//!
//! Board bring-up and the 1 Hz reporting scheduler. The timing-critical
//! machinery (pulse counting, rate sampling, bit transmission) runs in
//! interrupt context against the statics below; this file only wires the
//! handlers up and then reports once per second.

#![no_std]
#![no_main]

use core::ffi::c_void;

use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::prelude::Peripherals;
use esp_idf_svc::sys as esp_idf_sys;

use rust_geiger_telemetry::{
    config::{REPORT_PERIOD_MS, TICK_PERIOD_MS},
    hal::debug_uart::{self, DebugUartConfig},
    hal::gpio::{attach_pulse_isr, configure_pins, PinAssignment, SerialOut, TogglePin},
    hal::timer::{start_sampling_tick, EspBitTimer},
    logging::{TraceLevel, TraceRing},
    trace, RateSampler, TelemetryState, Transmitter, TxEngine,
};

// Shared device state. Write discipline is documented per field in the
// core modules: pulses <- edge ISR, rate <- tick handler, reads are
// foreground.
static STATE: TelemetryState = TelemetryState::new();

// One in-flight transmit frame, driven by the compare-match ISR.
static TX_ENGINE: TxEngine = TxEngine::new();

// Telemetry line and human-feedback outputs. Stateless/atomic, ISR-safe.
static TX_LINE: SerialOut = SerialOut::new(PinAssignment::DEFAULT.serial_tx);
static STATUS_LED: TogglePin = TogglePin::new(PinAssignment::DEFAULT.status_led);
static MARKER: TogglePin = TogglePin::new(PinAssignment::DEFAULT.marker);

// Diagnostics ring, drained to the debug UART by the report loop.
static TRACE: TraceRing = TraceRing::new();

// Runtime-initialized singletons. BIT_TIMER is read by the alarm ISR and
// the foreground transmitter; SAMPLER is touched by the tick handler only.
static mut BIT_TIMER: Option<EspBitTimer> = None;
static mut SAMPLER: Option<RateSampler> = None;

/// Input-edge handler: one qualifying edge, one count.
///
/// The GPIO ISR service has already acknowledged the pin interrupt; the
/// LED toggle is human feedback with no effect on counting.
unsafe extern "C" fn on_pulse_edge(_arg: *mut c_void) {
    STATE.pulses.on_edge();
    STATUS_LED.toggle();
}

/// Timer compare-match handler: shift out the next telemetry bit.
unsafe extern "C" fn on_bit_alarm(
    _timer: esp_idf_sys::gptimer_handle_t,
    _edata: *const esp_idf_sys::gptimer_alarm_event_data_t,
    _arg: *mut c_void,
) -> bool {
    if let Some(timer) = BIT_TIMER.as_ref() {
        TX_ENGINE.on_compare_match(&TX_LINE, timer);
    }
    false // no task wakeup needed
}

/// Sampling-tick handler: window accounting plus the marker square wave.
unsafe extern "C" fn on_sampling_tick(_arg: *mut c_void) {
    let Some(sampler) = SAMPLER.as_mut() else {
        return;
    };

    let outcome = sampler.on_tick(&STATE);
    if outcome.toggle_marker {
        MARKER.toggle();
    }
    if outcome.window_closed {
        let (counter, rate) = STATE.snapshot();
        trace!(
            TRACE,
            esp_idf_sys::esp_timer_get_time(),
            TraceLevel::Info,
            "window closed: counter={} rate={}",
            counter,
            rate
        );
    }
}

#[no_mangle]
fn main() {
    esp_idf_sys::link_patches();

    let peripherals = Peripherals::take().expect("peripherals already taken");
    let pins = PinAssignment::default();

    // Board bring-up: pins first, then timers, then interrupts.
    configure_pins(&pins).expect("pin setup failed");

    let mut console = debug_uart::init_debug_uart(
        peripherals.uart1,
        peripherals.pins.gpio6,
        &DebugUartConfig::default(),
    )
    .expect("debug uart setup failed");

    unsafe {
        BIT_TIMER = Some(EspBitTimer::new(on_bit_alarm).expect("bit timer setup failed"));
        // First window starts at the bring-up counter value.
        SAMPLER = Some(RateSampler::new(STATE.pulses.read()));
    }

    attach_pulse_isr(pins.pulse, on_pulse_edge).expect("pulse isr setup failed");
    start_sampling_tick(TICK_PERIOD_MS as u64 * 1_000, on_sampling_tick)
        .expect("sampling tick setup failed");

    let bit_timer = unsafe { BIT_TIMER.as_ref().expect("bit timer not initialized") };
    let transmitter = Transmitter::new(&TX_ENGINE, &TX_LINE, bit_timer);

    trace!(
        TRACE,
        unsafe { esp_idf_sys::esp_timer_get_time() },
        TraceLevel::Info,
        "{} up, reporting at 1 Hz",
        env!("VERSION_STRING")
    );

    // Reporting scheduler: the core does not self-schedule its cadence.
    loop {
        // Millisecond delay; the HAL converts to FreeRTOS ticks whatever
        // CONFIG_FREERTOS_HZ is.
        FreeRtos::delay_ms(REPORT_PERIOD_MS);

        let (counter, rate) = STATE.snapshot();
        transmitter.transmit_report(counter, rate);

        let now = unsafe { esp_idf_sys::esp_timer_get_time() };
        debug_uart::drain_trace(&mut console, &TRACE, now);
    }
}
