//! UART interface trait
//!
//! The peripheral side of an interrupt-driven UART: the driver hands over
//! one contiguous run at a time and is told about completion through
//! [`UartLine::on_tx_complete`](crate::devices::uart::UartLine::on_tx_complete).

use crate::platform::Result;

/// UART configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartConfig {
    /// Baud rate in bits per second
    pub baud_rate: u32,
    /// Data bits (8 or 9)
    pub data_bits: u8,
    /// Parity mode
    pub parity: UartParity,
    /// Stop bits
    pub stop_bits: UartStopBits,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115200,
            data_bits: 8,
            parity: UartParity::None,
            stop_bits: UartStopBits::One,
        }
    }
}

/// UART parity modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UartParity {
    /// No parity
    None,
    /// Even parity
    Even,
    /// Odd parity
    Odd,
}

/// UART stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UartStopBits {
    /// One stop bit
    One,
    /// Two stop bits
    Two,
}

/// UART interface trait
///
/// # Safety Invariants
///
/// - Only one owner per UART peripheral instance
/// - At most one transmission in flight; the caller waits for the
///   completion interrupt before starting the next one
pub trait UartInterface {
    /// Start transmitting `data` in the background.
    ///
    /// The bytes stay in the caller's buffer until the completion
    /// interrupt; the caller must not reuse them before then.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Uart` if the transmission cannot start.
    fn start_transmit(&mut self, data: &[u8]) -> Result<()>;

    /// Read up to `buffer.len()` received bytes without blocking.
    ///
    /// Returns the number of bytes actually read.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Apply a new line configuration
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Uart(UartError::InvalidBaudRate)` if the baud
    /// rate cannot be achieved with the current clock configuration.
    fn set_config(&mut self, config: &UartConfig) -> Result<()>;

    /// Check if data is available to read
    fn available(&self) -> bool;
}
