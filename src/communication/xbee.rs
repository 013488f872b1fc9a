//! XBee radio link
//!
//! Transparent-mode XBee module on a UART: bytes written go out over the
//! air unchanged. The link owns the UART driver while open, so the radio
//! can also serve as a [`LogSink`] for the log router.
//!
//! # Usage
//!
//! ```
//! use flight_daq::communication::xbee::{Xbee, XBEE_BAUD_RATE};
//! use flight_daq::platform::mock::mock_uart_driver;
//!
//! let uart = mock_uart_driver(Default::default(), 64).unwrap();
//!
//! let mut radio = Xbee::new();
//! radio.open(uart).unwrap();
//! assert_eq!(radio.uart().unwrap().config().baud_rate, XBEE_BAUD_RATE);
//! assert_eq!(radio.write(b"1200,2048\n"), Ok(10));
//! ```

use crate::core::log_router::LogSink;
use crate::devices::uart::{UartDriver, UartSetMask};
use crate::log_warn;
use crate::platform::{PlatformError, Result, UartConfig, UartInterface, UartParity, UartStopBits};

/// Factory baud rate of the radio modules
pub const XBEE_BAUD_RATE: u32 = 57_600;

/// Line settings of the radio link at `baud_rate`, 8N1
pub const fn xbee_config(baud_rate: u32) -> UartConfig {
    UartConfig {
        baud_rate,
        data_bits: 8,
        parity: UartParity::None,
        stop_bits: UartStopBits::One,
    }
}

/// Radio link over a UART driver
pub struct Xbee<'a, U> {
    uart: Option<UartDriver<'a, U>>,
}

impl<'a, U: UartInterface> Xbee<'a, U> {
    /// Closed link
    pub const fn new() -> Self {
        Self { uart: None }
    }

    /// Take over `uart` at [`XBEE_BAUD_RATE`]
    pub fn open(&mut self, uart: UartDriver<'a, U>) -> Result<()> {
        self.open_at(uart, XBEE_BAUD_RATE)
    }

    /// Take over `uart` and reconfigure it for the radio at `baud_rate`.
    ///
    /// # Errors
    ///
    /// `PlatformError::ResourceUnavailable` if the link is already open, or
    /// the UART error if the line settings are rejected.
    pub fn open_at(&mut self, mut uart: UartDriver<'a, U>, baud_rate: u32) -> Result<()> {
        if self.uart.is_some() {
            return Err(PlatformError::ResourceUnavailable);
        }

        uart.ioctl_set(UartSetMask::all(), &xbee_config(baud_rate))?;
        self.uart = Some(uart);
        Ok(())
    }

    /// Release the UART driver
    pub fn close(&mut self) -> Option<UartDriver<'a, U>> {
        self.uart.take()
    }

    pub fn is_open(&self) -> bool {
        self.uart.is_some()
    }

    /// Queue `data` for transmission, returning the number of bytes accepted
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        let uart = self.uart.as_mut().ok_or(PlatformError::ResourceUnavailable)?;
        let written = uart.write(data);
        if written < data.len() {
            log_warn!("radio dropped {} bytes", data.len() - written);
        }
        Ok(written)
    }

    /// Read received bytes into `out`
    pub fn read(&mut self, out: &mut [u8]) -> Result<usize> {
        let uart = self.uart.as_mut().ok_or(PlatformError::ResourceUnavailable)?;
        Ok(uart.read(out))
    }

    pub fn uart(&self) -> Option<&UartDriver<'a, U>> {
        self.uart.as_ref()
    }

    pub fn uart_mut(&mut self) -> Option<&mut UartDriver<'a, U>> {
        self.uart.as_mut()
    }
}

impl<U: UartInterface> Default for Xbee<'_, U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U: UartInterface> LogSink for Xbee<'_, U> {
    fn write_log(&mut self, line: &[u8]) -> usize {
        self.uart.as_mut().map_or(0, |uart| uart.write(line))
    }
}
