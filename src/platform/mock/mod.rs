//! Mock platform implementation for testing
//!
//! In-memory bus implementations for unit and integration tests.
//!
//! # Feature Gate
//!
//! This module is available in two contexts:
//! - During test builds (`#[cfg(test)]`)
//! - When the `mock` feature is enabled

mod i2c;
mod uart;

pub use i2c::{I2cTransaction, MockI2c};
pub use uart::{mock_uart_driver, MockUart};
