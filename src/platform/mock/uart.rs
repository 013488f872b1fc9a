//! Mock UART implementation for testing

use crate::core::circular_buffer::CircularBuffer;
use crate::devices::uart::{UartDriver, UartLine};
use crate::platform::{
    error::UartError,
    traits::{UartConfig, UartInterface},
    PlatformError, Result,
};
use std::boxed::Box;
use std::vec::Vec;

/// Mock UART implementation
///
/// Records every transmission started by the line and serves injected
/// receive data. Completion is never signalled by the mock itself: tests call
/// `UartLine::on_tx_complete` to play the interrupt.
///
/// # Example
///
/// ```
/// use flight_daq::platform::mock::MockUart;
/// use flight_daq::platform::traits::UartInterface;
///
/// let mut uart = MockUart::new(Default::default());
/// uart.start_transmit(b"Hello").unwrap();
/// assert_eq!(uart.transmitted(), b"Hello");
///
/// uart.inject_rx_data(b"#LV7");
/// let mut buf = [0u8; 4];
/// assert_eq!(uart.read(&mut buf).unwrap(), 4);
/// assert_eq!(&buf, b"#LV7");
/// ```
#[derive(Debug)]
pub struct MockUart {
    config: UartConfig,
    runs: Vec<Vec<u8>>,
    rx_buffer: Vec<u8>,
    fail_transmit: bool,
}

impl MockUart {
    /// Create a new mock UART
    pub fn new(config: UartConfig) -> Self {
        Self {
            config,
            runs: Vec::new(),
            rx_buffer: Vec::new(),
            fail_transmit: false,
        }
    }

    /// All transmitted bytes, in order
    pub fn transmitted(&self) -> Vec<u8> {
        self.runs.concat()
    }

    /// Each run handed to `start_transmit`
    pub fn transmit_runs(&self) -> &[Vec<u8>] {
        &self.runs
    }

    /// Clear the transmit log
    pub fn clear_transmitted(&mut self) {
        self.runs.clear();
    }

    /// Inject receive data (for test setup)
    pub fn inject_rx_data(&mut self, data: &[u8]) {
        self.rx_buffer.extend_from_slice(data);
    }

    /// Make `start_transmit` fail until reset
    pub fn set_fail_transmit(&mut self, fail: bool) {
        self.fail_transmit = fail;
    }

    /// Current line configuration
    pub fn config(&self) -> UartConfig {
        self.config
    }
}

/// Open a driver over a fresh [`MockUart`] with a `tx_capacity`-byte
/// transmit ring.
///
/// The ring storage and the line are leaked so the driver is `'static`;
/// meant for tests.
///
/// # Errors
///
/// `PlatformError::InvalidConfig` for a zero capacity, or the mock's
/// configuration error.
pub fn mock_uart_driver(config: UartConfig, tx_capacity: usize) -> Result<UartDriver<'static, MockUart>> {
    let storage: &'static mut [u8] = std::vec![0u8; tx_capacity].leak();
    let ring = CircularBuffer::attach(storage).map_err(|_| PlatformError::InvalidConfig)?;
    let ring: &'static mut CircularBuffer<'static> = Box::leak(Box::new(ring));
    let (producer, consumer) = ring.split();

    let line: &'static UartLine<'static, MockUart> =
        Box::leak(Box::new(UartLine::new(MockUart::new(config), consumer)));
    UartDriver::open(line, config, producer)
}

impl UartInterface for MockUart {
    fn start_transmit(&mut self, data: &[u8]) -> Result<()> {
        if self.fail_transmit {
            return Err(PlatformError::Uart(UartError::WriteFailed));
        }
        self.runs.push(data.to_vec());
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let to_read = core::cmp::min(buffer.len(), self.rx_buffer.len());
        buffer[..to_read].copy_from_slice(&self.rx_buffer[..to_read]);
        self.rx_buffer.drain(..to_read);
        Ok(to_read)
    }

    fn set_config(&mut self, config: &UartConfig) -> Result<()> {
        if config.baud_rate == 0 {
            return Err(PlatformError::Uart(UartError::InvalidBaudRate));
        }
        self.config = *config;
        Ok(())
    }

    fn available(&self) -> bool {
        !self.rx_buffer.is_empty()
    }
}
