//! Device drivers
//!
//! Drivers built on the platform abstraction traits, usable with either the
//! hardware peripherals or the mocks.
//!
//! ## Modules
//!
//! - `i2c`: register access with scheduler-delivered completion
//! - `uart`: interrupt-driven transmit ring and receive path

pub mod i2c;
pub mod uart;
