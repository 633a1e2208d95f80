//! Debug console on the hardware UART.
//!
//! Drains the trace ring to a TX-only UART for a PC serial monitor. This
//! is diagnostics only; the telemetry report line goes out over the
//! software UART, not here.

use esp_idf_svc::hal::gpio;
use esp_idf_svc::hal::peripheral::Peripheral;
use esp_idf_svc::hal::uart::{self, UartTxDriver};
use esp_idf_svc::sys::EspError;

use crate::logging::{render_entry, TraceLevel, TraceRing, MAX_TRACE_LEN};

/// Debug UART configuration.
pub struct DebugUartConfig {
    pub baud_rate: u32,
}

impl Default for DebugUartConfig {
    fn default() -> Self {
        Self { baud_rate: 115_200 }
    }
}

/// Initialize a TX-only UART for trace output.
pub fn init_debug_uart<'d>(
    uart: impl Peripheral<P = uart::UART1> + 'd,
    tx_pin: impl Peripheral<P = impl gpio::OutputPin> + 'd,
    config: &DebugUartConfig,
) -> Result<UartTxDriver<'d>, EspError> {
    let uart_config =
        uart::config::Config::default().baudrate(esp_idf_svc::hal::units::Hertz(config.baud_rate));

    UartTxDriver::new(
        uart,
        tx_pin,
        Option::<gpio::AnyIOPin>::None, // CTS
        Option::<gpio::AnyIOPin>::None, // RTS
        &uart_config,
    )
}

/// Write everything queued in the trace ring, then report drops if any.
pub fn drain_trace<const N: usize>(
    uart: &mut UartTxDriver<'_>,
    ring: &TraceRing<N>,
    now_us: i64,
) {
    let mut line = [0u8; MAX_TRACE_LEN + 32];

    while let Some(entry) = ring.pop() {
        let len = render_entry(&entry, &mut line);
        let _ = uart.write(&line[..len]);
    }

    let dropped = ring.take_dropped();
    if dropped > 0 {
        ring.log(
            now_us,
            TraceLevel::Warn,
            format_args!("trace ring dropped {} entries", dropped),
        );
        if let Some(entry) = ring.pop() {
            let len = render_entry(&entry, &mut line);
            let _ = uart.write(&line[..len]);
        }
    }
}
