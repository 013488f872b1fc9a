//! Platform abstraction layer
//!
//! Bus traits and error types shared by every driver. Real peripherals
//! implement the traits in the board support code; [`mock`] provides
//! in-memory versions for host testing.

pub mod error;
pub mod traits;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::{I2cError, PlatformError, Result, UartError};
pub use traits::{I2cInterface, UartConfig, UartInterface, UartParity, UartStopBits};
