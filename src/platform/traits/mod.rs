//! Platform abstraction traits
//!
//! This module defines the bus traits that platform implementations must provide.

pub mod i2c;
pub mod uart;

pub use i2c::I2cInterface;
pub use uart::{UartConfig, UartInterface, UartParity, UartStopBits};
