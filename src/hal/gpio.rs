//! GPIO plumbing: tube input, telemetry line, status and marker outputs.

use core::ffi::c_void;
use core::sync::atomic::{AtomicBool, Ordering};

use esp_idf_svc::sys::{self, esp, EspError};

use crate::softuart::TxLine;

/// Board pin mapping.
pub struct PinAssignment {
    /// Tube/switch input, interrupt on the falling edge.
    pub pulse: i32,
    /// Software-UART telemetry output.
    pub serial_tx: i32,
    /// Status LED toggled per counted pulse.
    pub status_led: i32,
    /// Reference square-wave output.
    pub marker: i32,
}

impl PinAssignment {
    /// Reference board wiring.
    pub const DEFAULT: Self = Self {
        pulse: 4,
        serial_tx: 5,
        status_led: 2,
        marker: 7,
    };
}

impl Default for PinAssignment {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Configure pin directions and the edge-interrupt mode.
///
/// Must run before interrupts are enabled; the core assumes the serial
/// line idles high from here on.
pub fn configure_pins(pins: &PinAssignment) -> Result<(), EspError> {
    let outputs = sys::gpio_config_t {
        pin_bit_mask: (1u64 << pins.serial_tx) | (1u64 << pins.status_led) | (1u64 << pins.marker),
        mode: sys::gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: sys::gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: sys::gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: sys::gpio_int_type_t_GPIO_INTR_DISABLE,
        ..Default::default()
    };
    esp!(unsafe { sys::gpio_config(&outputs) })?;

    // Telemetry line idles high (mark), the rest start low.
    esp!(unsafe { sys::gpio_set_level(pins.serial_tx, 1) })?;
    esp!(unsafe { sys::gpio_set_level(pins.status_led, 0) })?;
    esp!(unsafe { sys::gpio_set_level(pins.marker, 0) })?;

    let input = sys::gpio_config_t {
        pin_bit_mask: 1u64 << pins.pulse,
        mode: sys::gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: sys::gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: sys::gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: sys::gpio_int_type_t_GPIO_INTR_NEGEDGE,
        ..Default::default()
    };
    esp!(unsafe { sys::gpio_config(&input) })
}

/// Bind the edge handler to the tube input.
///
/// The GPIO ISR service acknowledges the pin's interrupt flag before
/// dispatching, so the handler only has to count.
pub fn attach_pulse_isr(
    pin: i32,
    handler: unsafe extern "C" fn(*mut c_void),
) -> Result<(), EspError> {
    esp!(unsafe { sys::gpio_install_isr_service(0) })?;
    esp!(unsafe { sys::gpio_isr_handler_add(pin, Some(handler), core::ptr::null_mut()) })
}

/// Telemetry output line for the bit engine.
///
/// Stateless over a raw pin number so the compare-match ISR can drive it
/// through `&self`.
pub struct SerialOut {
    pin: i32,
}

impl SerialOut {
    pub const fn new(pin: i32) -> Self {
        Self { pin }
    }
}

impl TxLine for SerialOut {
    #[inline]
    fn set_high(&self) {
        unsafe {
            sys::gpio_set_level(self.pin, 1);
        }
    }

    #[inline]
    fn set_low(&self) {
        unsafe {
            sys::gpio_set_level(self.pin, 0);
        }
    }
}

/// Output pin with remembered level, for LED and marker toggling.
pub struct TogglePin {
    pin: i32,
    level: AtomicBool,
}

impl TogglePin {
    pub const fn new(pin: i32) -> Self {
        Self {
            pin,
            level: AtomicBool::new(false),
        }
    }

    /// Flip the output. Safe from interrupt context.
    #[inline]
    pub fn toggle(&self) {
        let level = !self.level.load(Ordering::Relaxed);
        self.level.store(level, Ordering::Relaxed);
        unsafe {
            sys::gpio_set_level(self.pin, level as u32);
        }
    }
}
