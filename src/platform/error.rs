//! Platform error types
//!
//! Peripheral implementations map their HAL failures onto these; drivers
//! add the configuration and ownership errors.

use core::fmt;

/// Result type for platform operations
pub type Result<T> = core::result::Result<T, PlatformError>;

/// Driver and peripheral errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlatformError {
    Uart(UartError),
    I2c(I2cError),
    /// Configuration rejected by the driver (bad clock, empty ring, mode
    /// not available)
    InvalidConfig,
    /// Device already opened, or not opened at all
    ResourceUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UartError {
    /// Peripheral refused to start a transmission
    WriteFailed,
    ReadFailed,
    InvalidBaudRate,
    /// Receive data register overwritten before it was read
    Overrun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cError {
    /// Slave did not acknowledge its address or a data byte
    Nack,
    BusError,
    Timeout,
    /// Address does not fit in 7 bits
    InvalidAddress,
}

impl fmt::Display for UartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UartError::WriteFailed => write!(f, "transmit not started"),
            UartError::ReadFailed => write!(f, "read failed"),
            UartError::InvalidBaudRate => write!(f, "invalid baud rate"),
            UartError::Overrun => write!(f, "receive overrun"),
        }
    }
}

impl fmt::Display for I2cError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            I2cError::Nack => write!(f, "no acknowledge"),
            I2cError::BusError => write!(f, "bus error"),
            I2cError::Timeout => write!(f, "timeout"),
            I2cError::InvalidAddress => write!(f, "invalid 7-bit address"),
        }
    }
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformError::Uart(e) => write!(f, "UART: {}", e),
            PlatformError::I2c(e) => write!(f, "I2C: {}", e),
            PlatformError::InvalidConfig => write!(f, "Invalid configuration"),
            PlatformError::ResourceUnavailable => write!(f, "Device not available"),
        }
    }
}

impl From<UartError> for PlatformError {
    fn from(error: UartError) -> Self {
        PlatformError::Uart(error)
    }
}

impl From<I2cError> for PlatformError {
    fn from(error: I2cError) -> Self {
        PlatformError::I2c(error)
    }
}
