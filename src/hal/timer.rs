//! Timer plumbing: the bit-transmit compare unit and the sampling tick.
//!
//! Two separate hardware units, so the transmitter's exclusive ownership
//! of its compare timer never starves the sampling tick: a general-purpose
//! timer (`gptimer`) paces the bits, an `esp_timer` fires the 32 ms tick.

use core::ffi::c_void;
use core::ptr;
use core::sync::atomic::{AtomicU64, Ordering};

use esp_idf_svc::sys::{self, esp, EspError};

use crate::config::TIMER_CLOCK_HZ;
use crate::softuart::BitTimer;

/// Alarm callback signature re-exported for the binary.
pub type AlarmHandler = unsafe extern "C" fn(
    sys::gptimer_handle_t,
    *const sys::gptimer_alarm_event_data_t,
    *mut c_void,
) -> bool;

/// Compare-match timer over an ESP-IDF general-purpose timer.
///
/// The programmed alarm value is mirrored in `deadline` so `extend` can
/// reschedule additively from the previous target instead of from the
/// current count. That mirrors the original compare-register arithmetic
/// and is what keeps bit edges drift-free under dispatch jitter.
pub struct EspBitTimer {
    handle: sys::gptimer_handle_t,
    deadline: AtomicU64,
}

// SAFETY: the handle is only passed to thread- and ISR-safe gptimer calls;
// the mirrored deadline is an atomic.
unsafe impl Send for EspBitTimer {}
unsafe impl Sync for EspBitTimer {}

impl EspBitTimer {
    /// Create the timer at the configured resolution and register the
    /// compare-match handler. The timer starts idle.
    pub fn new(on_alarm: AlarmHandler) -> Result<Self, EspError> {
        let config = sys::gptimer_config_t {
            clk_src: sys::soc_periph_gptimer_clk_src_t_GPTIMER_CLK_SRC_DEFAULT,
            direction: sys::gptimer_count_direction_t_GPTIMER_COUNT_UP,
            resolution_hz: TIMER_CLOCK_HZ,
            ..Default::default()
        };

        let mut handle: sys::gptimer_handle_t = ptr::null_mut();
        esp!(unsafe { sys::gptimer_new_timer(&config, &mut handle) })?;

        let callbacks = sys::gptimer_event_callbacks_t {
            on_alarm: Some(on_alarm),
        };
        esp!(unsafe {
            sys::gptimer_register_event_callbacks(handle, &callbacks, ptr::null_mut())
        })?;
        esp!(unsafe { sys::gptimer_enable(handle) })?;

        Ok(Self {
            handle,
            deadline: AtomicU64::new(0),
        })
    }

    fn program_alarm(&self, alarm_count: u64) {
        let alarm = sys::gptimer_alarm_config_t {
            alarm_count,
            ..Default::default()
        };
        unsafe {
            sys::gptimer_set_alarm_action(self.handle, &alarm);
        }
    }
}

impl BitTimer for EspBitTimer {
    fn arm(&self, ticks: u16) {
        let mut now = 0u64;
        unsafe {
            sys::gptimer_get_raw_count(self.handle, &mut now);
        }
        let first = now + ticks as u64;
        self.deadline.store(first, Ordering::Relaxed);
        self.program_alarm(first);
        unsafe {
            sys::gptimer_start(self.handle);
        }
    }

    fn extend(&self, ticks: u16) {
        // Additive from the previous target, never from the raw count.
        let next = self.deadline.fetch_add(ticks as u64, Ordering::Relaxed) + ticks as u64;
        self.program_alarm(next);
    }

    fn disarm(&self) {
        unsafe {
            sys::gptimer_set_alarm_action(self.handle, ptr::null());
            sys::gptimer_stop(self.handle);
        }
    }
}

/// Start the fixed-period sampling tick.
///
/// `esp_timer` dispatches the callback from its service task at the
/// configured period; the handler treats it as its interrupt context.
pub fn start_sampling_tick(
    period_us: u64,
    callback: unsafe extern "C" fn(*mut c_void),
) -> Result<sys::esp_timer_handle_t, EspError> {
    let args = sys::esp_timer_create_args_t {
        callback: Some(callback),
        arg: ptr::null_mut(),
        dispatch_method: sys::esp_timer_dispatch_t_ESP_TIMER_TASK,
        name: c"sampling-tick".as_ptr(),
        skip_unhandled_events: true,
    };

    let mut handle: sys::esp_timer_handle_t = ptr::null_mut();
    esp!(unsafe { sys::esp_timer_create(&args, &mut handle) })?;
    esp!(unsafe { sys::esp_timer_start_periodic(handle, period_us) })?;
    Ok(handle)
}
