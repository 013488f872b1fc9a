//! I2C interface trait
//!
//! The raw bus transactions a sensor peripheral needs. Register addressing
//! and completion delivery through the scheduler are layered on top by
//! [`I2cBus`](crate::devices::i2c::I2cBus).

use crate::platform::Result;

/// Blocking I2C master
///
/// Slave addresses are 7-bit. An implementation owns its bus exclusively;
/// sharing one bus between the main loop and an interrupt handler goes
/// through a [`SharedState`](crate::core::traits::SharedState).
pub trait I2cInterface {
    /// Send `data` to the slave at `addr` in one transfer
    ///
    /// # Errors
    ///
    /// `PlatformError::I2c` when the slave does not acknowledge, the bus
    /// faults or the transfer times out.
    fn write(&mut self, addr: u8, data: &[u8]) -> Result<()>;

    /// Fill `buffer` from the slave at `addr`
    fn read(&mut self, addr: u8, buffer: &mut [u8]) -> Result<()>;

    /// Send `write_data`, then read into `read_buffer` after a repeated
    /// start. This is a register read: the written bytes select the
    /// register.
    fn write_read(&mut self, addr: u8, write_data: &[u8], read_buffer: &mut [u8]) -> Result<()>;

    /// Change the SCL clock, in Hz
    ///
    /// # Errors
    ///
    /// `PlatformError::InvalidConfig` if the peripheral cannot produce the
    /// requested clock.
    fn set_frequency(&mut self, frequency: u32) -> Result<()>;
}
