//! I2C bus driver with scheduler-delivered completion
//!
//! Register access for sensor drivers. Two read flavours:
//! - [`I2cBus::read_register_blocking`] returns once the data is in
//! - [`I2cBus::read_register`] additionally schedules the slave's callback
//!   as a one-shot task carrying an [`I2cEvent`], the way a transfer-done
//!   interrupt would
//!
//! The blocking transfer stalls the whole cooperative scheduler for its
//! duration; keep register bursts short.

use bitflags::bitflags;
use heapless::Vec;

use crate::core::scheduler::{Scheduler, TaskCallback, TaskHandle};
use crate::core::traits::TimeSource;
use crate::platform::{I2cError, I2cInterface, PlatformError, Result};
use crate::{log_error, log_warn};

/// Largest payload accepted by [`I2cBus::write_register`]
pub const MAX_REGISTER_WRITE: usize = 32;

/// Fastest supported clock (fast mode)
pub const MAX_CLOCK_SPEED: u32 = 400_000;

/// Transfer completion events delivered to slave callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum I2cEvent {
    TxTransferDone = 0,
    RxTransferDone = 1,
    Error = 2,
}

impl I2cEvent {
    /// Decode the event tag of a task invocation
    pub fn from_event(event: u32) -> Option<Self> {
        match event {
            0 => Some(I2cEvent::TxTransferDone),
            1 => Some(I2cEvent::RxTransferDone),
            2 => Some(I2cEvent::Error),
            _ => None,
        }
    }
}

/// How transfers complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferMode {
    Interrupt,
    /// Not available on this driver
    Dma,
    Polling,
}

/// Slave addressing width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressingMode {
    SevenBit,
    /// Not available on this driver
    TenBit,
}

/// Width of a register address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressSize {
    EightBit,
    SixteenBit,
}

/// Bus configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I2cBusConfig {
    /// Clock in Hz, at most [`MAX_CLOCK_SPEED`]
    pub clock_speed: u32,
    pub transfer_mode: TransferMode,
    pub addressing_mode: AddressingMode,
}

impl Default for I2cBusConfig {
    fn default() -> Self {
        Self {
            clock_speed: MAX_CLOCK_SPEED,
            transfer_mode: TransferMode::Interrupt,
            addressing_mode: AddressingMode::SevenBit,
        }
    }
}

bitflags! {
    /// Fields applied by [`I2cBus::ioctl_set_bus`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct I2cBusSetMask: u8 {
        const CLOCK_SPEED = 0x01;
        const TRANSFER_MODE = 0x02;
        const ADDRESSING_MODE = 0x04;
    }
}

bitflags! {
    /// Fields applied by [`I2cBus::ioctl_set_slave`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct I2cSlaveSetMask: u8 {
        const ADDRESS = 0x01;
        const CALLBACK = 0x02;
        const PRIORITY = 0x04;
    }
}

/// Slave settings applied through [`I2cBus::ioctl_set_slave`]
pub struct I2cSlaveConfig<C, T> {
    /// 7-bit address
    pub address: u8,
    /// Completion callback and its argument
    pub callback: Option<TaskCallback<C, T>>,
    pub argument: usize,
    /// Scheduler priority of the completion task
    pub priority: u8,
}

/// A peripheral on the bus
pub struct I2cSlaveDevice<C, T> {
    address: u8,
    callback: Option<TaskCallback<C, T>>,
    argument: usize,
    priority: u8,
}

impl<C, T> I2cSlaveDevice<C, T> {
    /// Unconfigured slave at address 0 without callback
    pub const fn new() -> Self {
        Self {
            address: 0,
            callback: None,
            argument: 0,
            priority: 0,
        }
    }

    /// 7-bit address
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Check if a completion callback is set
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }
}

impl<C, T> Default for I2cSlaveDevice<C, T> {
    fn default() -> Self {
        Self::new()
    }
}

/// I2C bus driver over an [`I2cInterface`] peripheral
pub struct I2cBus<I> {
    port: I,
    config: I2cBusConfig,
}

impl<I: I2cInterface> I2cBus<I> {
    /// Validate `config` and apply it to `port`
    pub fn open(mut port: I, config: I2cBusConfig) -> Result<Self> {
        validate_bus(&config)?;
        port.set_frequency(config.clock_speed)?;
        Ok(Self { port, config })
    }

    /// Update the bus fields selected by `mask` from `conf`
    pub fn ioctl_set_bus(&mut self, mask: I2cBusSetMask, conf: &I2cBusConfig) -> Result<()> {
        let mut next = self.config;
        if mask.contains(I2cBusSetMask::CLOCK_SPEED) {
            next.clock_speed = conf.clock_speed;
        }
        if mask.contains(I2cBusSetMask::TRANSFER_MODE) {
            next.transfer_mode = conf.transfer_mode;
        }
        if mask.contains(I2cBusSetMask::ADDRESSING_MODE) {
            next.addressing_mode = conf.addressing_mode;
        }

        validate_bus(&next)?;
        if next.clock_speed != self.config.clock_speed {
            self.port.set_frequency(next.clock_speed)?;
        }
        self.config = next;
        Ok(())
    }

    /// Update the slave fields selected by `mask` from `conf`
    pub fn ioctl_set_slave<C, T>(
        &self,
        slave: &mut I2cSlaveDevice<C, T>,
        mask: I2cSlaveSetMask,
        conf: &I2cSlaveConfig<C, T>,
    ) -> Result<()> {
        if mask.contains(I2cSlaveSetMask::ADDRESS) {
            if conf.address > 0x7F {
                return Err(PlatformError::I2c(I2cError::InvalidAddress));
            }
            slave.address = conf.address;
        }
        if mask.contains(I2cSlaveSetMask::CALLBACK) {
            slave.callback = conf.callback;
            slave.argument = conf.argument;
        }
        if mask.contains(I2cSlaveSetMask::PRIORITY) {
            slave.priority = conf.priority;
        }
        Ok(())
    }

    /// Current bus configuration
    pub fn config(&self) -> I2cBusConfig {
        self.config
    }

    /// Underlying peripheral
    pub fn port(&self) -> &I {
        &self.port
    }

    /// Underlying peripheral, mutably
    pub fn port_mut(&mut self) -> &mut I {
        &mut self.port
    }

    /// Write `data` to the register at `memory_address`
    pub fn write_register<C, T>(
        &mut self,
        slave: &I2cSlaveDevice<C, T>,
        memory_address: u16,
        size: AddressSize,
        data: &[u8],
    ) -> Result<()> {
        if data.len() > MAX_REGISTER_WRITE {
            return Err(PlatformError::InvalidConfig);
        }

        let mut frame: Vec<u8, { MAX_REGISTER_WRITE + 2 }> = Vec::new();
        let _ = frame.extend_from_slice(register_address(memory_address, size).as_slice());
        let _ = frame.extend_from_slice(data);
        self.port.write(slave.address, &frame)
    }

    /// Read the register at `memory_address` into `out`, blocking
    pub fn read_register_blocking<C, T>(
        &mut self,
        slave: &I2cSlaveDevice<C, T>,
        memory_address: u16,
        size: AddressSize,
        out: &mut [u8],
    ) -> Result<()> {
        let address = register_address(memory_address, size);
        self.port.write_read(slave.address, &address, out)
    }

    /// Read a register and deliver completion through the scheduler.
    ///
    /// `out` holds the data once the call returns; the slave callback then
    /// runs as a one-shot task with [`I2cEvent::RxTransferDone`], or
    /// [`I2cEvent::Error`] if the transfer failed.
    ///
    /// # Errors
    ///
    /// `PlatformError::InvalidConfig` if the slave has no callback,
    /// `PlatformError::ResourceUnavailable` if the completion task cannot be
    /// created.
    pub fn read_register<C, T: TimeSource>(
        &mut self,
        scheduler: &mut Scheduler<C, T>,
        slave: &I2cSlaveDevice<C, T>,
        memory_address: u16,
        size: AddressSize,
        out: &mut [u8],
    ) -> Result<TaskHandle> {
        let callback = slave.callback.ok_or(PlatformError::InvalidConfig)?;

        let event = match self.read_register_blocking(slave, memory_address, size, out) {
            Ok(()) => I2cEvent::RxTransferDone,
            Err(e) => {
                log_warn!("I2C read of 0x{:x} failed: {}", slave.address, e);
                I2cEvent::Error
            }
        };

        scheduler
            .schedule_one_shot(callback, event as u32, slave.argument, slave.priority)
            .map_err(|e| {
                log_error!("I2C completion not scheduled: {}", e);
                PlatformError::ResourceUnavailable
            })
    }
}

fn validate_bus(config: &I2cBusConfig) -> Result<()> {
    if config.clock_speed == 0 || config.clock_speed > MAX_CLOCK_SPEED {
        return Err(PlatformError::InvalidConfig);
    }
    if config.transfer_mode == TransferMode::Dma || config.addressing_mode == AddressingMode::TenBit {
        return Err(PlatformError::InvalidConfig);
    }
    Ok(())
}

fn register_address(memory_address: u16, size: AddressSize) -> Vec<u8, 2> {
    let mut bytes = Vec::new();
    match size {
        AddressSize::EightBit => {
            let _ = bytes.push(memory_address as u8);
        }
        AddressSize::SixteenBit => {
            let _ = bytes.extend_from_slice(&memory_address.to_be_bytes());
        }
    }
    bytes
}
