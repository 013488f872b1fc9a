//! Mock I2C implementation for testing

use crate::platform::{error::I2cError, traits::I2cInterface, PlatformError, Result};
use std::vec::Vec;

/// I2C transaction type for logging
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum I2cTransaction {
    /// Write transaction
    Write { addr: u8, data: Vec<u8> },
    /// Read transaction
    Read { addr: u8, len: usize },
    /// Write-Read transaction
    WriteRead {
        addr: u8,
        write_data: Vec<u8>,
        read_len: usize,
    },
}

/// Mock I2C implementation
///
/// Records all transactions for test verification and serves
/// pre-programmed read data.
#[derive(Debug)]
pub struct MockI2c {
    frequency: u32,
    transactions: Vec<I2cTransaction>,
    read_data: Vec<u8>,
    error: Option<I2cError>,
}

impl MockI2c {
    /// Create a new mock I2C bus running at `frequency` Hz
    pub fn new(frequency: u32) -> Self {
        Self {
            frequency,
            transactions: Vec::new(),
            read_data: Vec::new(),
            error: None,
        }
    }

    /// Get transaction log (for test verification)
    pub fn transactions(&self) -> &[I2cTransaction] {
        &self.transactions
    }

    /// Clear transaction log
    pub fn clear_transactions(&mut self) {
        self.transactions.clear();
    }

    /// Set data to return for read operations
    pub fn set_read_data(&mut self, data: &[u8]) {
        self.read_data = data.to_vec();
    }

    /// Fail every following transaction with `error` (`None` to recover)
    pub fn set_error(&mut self, error: Option<I2cError>) {
        self.error = error;
    }

    /// Get current frequency
    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    fn check(&self) -> Result<()> {
        match self.error {
            Some(error) => Err(PlatformError::I2c(error)),
            None => Ok(()),
        }
    }

    fn fill(&mut self, buffer: &mut [u8]) {
        let to_read = core::cmp::min(buffer.len(), self.read_data.len());
        buffer[..to_read].copy_from_slice(&self.read_data[..to_read]);
        self.read_data.drain(..to_read);
    }
}

impl I2cInterface for MockI2c {
    fn write(&mut self, addr: u8, data: &[u8]) -> Result<()> {
        self.check()?;
        self.transactions.push(I2cTransaction::Write {
            addr,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn read(&mut self, addr: u8, buffer: &mut [u8]) -> Result<()> {
        self.check()?;
        self.transactions.push(I2cTransaction::Read {
            addr,
            len: buffer.len(),
        });
        self.fill(buffer);
        Ok(())
    }

    fn write_read(&mut self, addr: u8, write_data: &[u8], read_buffer: &mut [u8]) -> Result<()> {
        self.check()?;
        self.transactions.push(I2cTransaction::WriteRead {
            addr,
            write_data: write_data.to_vec(),
            read_len: read_buffer.len(),
        });
        self.fill(read_buffer);
        Ok(())
    }

    fn set_frequency(&mut self, frequency: u32) -> Result<()> {
        self.frequency = frequency;
        Ok(())
    }
}
