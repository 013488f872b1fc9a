//! Interrupt-driven UART driver
//!
//! Both rings are split once at startup, and neither direction needs a lock
//! around the bytes themselves:
//!
//! - Transmit: [`UartDriver::write`] enqueues through the producer half.
//!   The [`UartLine`] holds the peripheral and the consumer half; it hands
//!   the contiguous run at the front of the ring to the peripheral and, on
//!   [`UartLine::on_tx_complete`], consumes it and starts the next. The
//!   peripheral reads straight out of the ring.
//! - Receive: the interrupt handler owns a [`UartRxIsr`] (producer half)
//!   and the driver owns the consumer half.
//!
//! The transmit-complete interrupt only needs `&UartLine`, never the
//! driver. The line keeps its state in a critical section that is held for
//! one peripheral call at a time.
//!
//! # Example
//!
//! ```
//! use flight_daq::core::circular_buffer::CircularBuffer;
//! use flight_daq::devices::uart::{UartDriver, UartLine, UartRxIsr};
//! use flight_daq::platform::mock::MockUart;
//! use flight_daq::platform::UartConfig;
//!
//! let mut tx_storage = [0u8; 64];
//! let mut tx_ring = CircularBuffer::attach(&mut tx_storage).unwrap();
//! let (tx_producer, tx_consumer) = tx_ring.split();
//! let mut rx_storage = [0u8; 32];
//! let mut rx_ring = CircularBuffer::attach(&mut rx_storage).unwrap();
//! let (rx_producer, rx_consumer) = rx_ring.split();
//!
//! let line = UartLine::new(MockUart::new(UartConfig::default()), tx_consumer);
//! let mut uart = UartDriver::open(&line, UartConfig::default(), tx_producer).unwrap();
//! uart.attach_rx(rx_consumer);
//! let mut isr = UartRxIsr::new(rx_producer);
//!
//! uart.write(b"hello");
//! assert_eq!(line.with_port(|port| port.transmitted()), b"hello");
//! line.on_tx_complete();
//!
//! isr.on_receive(b"#LV7");
//! let mut buf = [0u8; 8];
//! assert_eq!(uart.read(&mut buf), 4);
//! ```

use bitflags::bitflags;

use crate::core::circular_buffer::{Consumer, Producer};
use crate::core::log_router::LogSink;
use crate::core::traits::{CsState, SharedState};
use crate::platform::{Result, UartConfig, UartInterface};
use crate::{log_error, log_warn};

/// Bytes moved per port read in [`UartDriver::poll_rx`]
const RX_POLL_CHUNK: usize = 16;

bitflags! {
    /// Fields applied by [`UartDriver::ioctl_set`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UartSetMask: u8 {
        const BAUD_RATE = 0x01;
        const PARITY = 0x02;
        const WORD_LENGTH = 0x04;
        const STOP_BITS = 0x08;
    }
}

// ============================================================================
// Transmit line (interrupt side)
// ============================================================================

/// Peripheral plus the consumer half of the transmit ring.
///
/// Shared by the driver and the transmit-complete interrupt.
pub struct UartLine<'a, U> {
    state: CsState<LineState<'a, U>>,
}

struct LineState<'a, U> {
    port: U,
    tx: Consumer<'a>,
    busy: bool,
    errors: u32,
}

impl<U: UartInterface> LineState<'_, U> {
    fn start_next(&mut self) {
        let run = self.tx.peek_linear();
        if run.is_empty() {
            return;
        }

        match self.port.start_transmit(run) {
            Ok(()) => self.busy = true,
            Err(e) => {
                self.errors = self.errors.saturating_add(1);
                log_error!("UART transmit start failed: {}", e);
            }
        }
    }
}

impl<'a, U: UartInterface> UartLine<'a, U> {
    /// `tx` must be the consumer half of the ring whose producer goes to
    /// [`UartDriver::open`].
    pub fn new(port: U, tx: Consumer<'a>) -> Self {
        Self {
            state: CsState::new(LineState {
                port,
                tx,
                busy: false,
                errors: 0,
            }),
        }
    }

    /// Transmit-complete interrupt: release the sent run, start the next.
    pub fn on_tx_complete(&self) {
        self.state.with_mut(|line| {
            if !line.busy {
                return;
            }
            line.tx.advance_linear();
            line.busy = false;
            line.start_next();
        });
    }

    /// Check if a run is being transmitted
    pub fn is_transmitting(&self) -> bool {
        self.state.with(|line| line.busy)
    }

    /// Transmissions the peripheral refused to start
    pub fn tx_errors(&self) -> u32 {
        self.state.with(|line| line.errors)
    }

    /// Run `f` on the peripheral inside the line's critical section
    pub fn with_port<R>(&self, f: impl FnOnce(&mut U) -> R) -> R {
        self.state.with_mut(|line| f(&mut line.port))
    }

    /// Start a transmission unless one is in flight
    fn kick(&self) {
        self.state.with_mut(|line| {
            if !line.busy {
                line.start_next();
            }
        });
    }
}

// ============================================================================
// Driver (main loop side)
// ============================================================================

/// UART driver over a [`UartLine`]
pub struct UartDriver<'a, U> {
    line: &'a UartLine<'a, U>,
    tx: Producer<'a>,
    config: UartConfig,
    rx: Option<Consumer<'a>>,
}

impl<'a, U: UartInterface> UartDriver<'a, U> {
    /// Configure the line's peripheral and take the producer half of its
    /// transmit ring.
    ///
    /// # Errors
    ///
    /// The peripheral error if the configuration is rejected.
    pub fn open(line: &'a UartLine<'a, U>, config: UartConfig, tx: Producer<'a>) -> Result<Self> {
        line.with_port(|port| port.set_config(&config))?;

        Ok(Self {
            line,
            tx,
            config,
            rx: None,
        })
    }

    /// Hand the consumer half of the RX ring to the driver
    pub fn attach_rx(&mut self, consumer: Consumer<'a>) {
        self.rx = Some(consumer);
    }

    /// Update the fields selected by `mask` from `conf` and reconfigure.
    ///
    /// On error the previous configuration stays in effect.
    pub fn ioctl_set(&mut self, mask: UartSetMask, conf: &UartConfig) -> Result<()> {
        let mut next = self.config;
        if mask.contains(UartSetMask::BAUD_RATE) {
            next.baud_rate = conf.baud_rate;
        }
        if mask.contains(UartSetMask::PARITY) {
            next.parity = conf.parity;
        }
        if mask.contains(UartSetMask::WORD_LENGTH) {
            next.data_bits = conf.data_bits;
        }
        if mask.contains(UartSetMask::STOP_BITS) {
            next.stop_bits = conf.stop_bits;
        }

        self.line.with_port(|port| port.set_config(&next))?;
        self.config = next;
        Ok(())
    }

    /// Current line configuration
    pub fn config(&self) -> UartConfig {
        self.config
    }

    /// Transmit side shared with the interrupt handler
    pub fn line(&self) -> &'a UartLine<'a, U> {
        self.line
    }

    /// Run `f` on the peripheral
    pub fn with_port<R>(&self, f: impl FnOnce(&mut U) -> R) -> R {
        self.line.with_port(f)
    }

    /// Queue `data` for transmission.
    ///
    /// Returns the number of bytes queued; fewer than `data.len()` when the
    /// transmit ring is full.
    pub fn write(&mut self, data: &[u8]) -> usize {
        let written = self.tx.enqueue(data);
        if written < data.len() {
            log_warn!("UART TX ring full, dropped {} bytes", data.len() - written);
        }
        self.line.kick();
        written
    }

    pub fn is_transmitting(&self) -> bool {
        self.line.is_transmitting()
    }

    /// Bytes queued or in flight
    pub fn pending(&self) -> usize {
        self.tx.size()
    }

    pub fn tx_errors(&self) -> u32 {
        self.line.tx_errors()
    }

    /// Read received bytes.
    ///
    /// Dequeues from the RX ring when one is attached, otherwise reads the
    /// peripheral directly. Returns the number of bytes read.
    pub fn read(&mut self, out: &mut [u8]) -> usize {
        match self.rx.as_mut() {
            Some(rx) => rx.dequeue(out),
            None => match self.line.with_port(|port| port.read(out)) {
                Ok(count) => count,
                Err(e) => {
                    log_error!("UART read failed: {}", e);
                    0
                }
            },
        }
    }

    /// Move everything the peripheral has received into the RX ring.
    ///
    /// For ports without a receive interrupt hooked up. Returns the number
    /// of bytes accepted by the ring.
    pub fn poll_rx(&mut self, isr: &mut UartRxIsr<'_>) -> Result<usize> {
        let mut chunk = [0u8; RX_POLL_CHUNK];
        let mut accepted = 0;

        while self.line.with_port(|port| port.available()) {
            let count = self.line.with_port(|port| port.read(&mut chunk))?;
            if count == 0 {
                break;
            }
            accepted += isr.on_receive(&chunk[..count]);
        }

        Ok(accepted)
    }
}

impl<U: UartInterface> LogSink for UartDriver<'_, U> {
    fn write_log(&mut self, line: &[u8]) -> usize {
        self.write(line)
    }
}

/// Receive interrupt half of a UART: feeds the RX ring.
pub struct UartRxIsr<'a> {
    producer: Producer<'a>,
    dropped: u32,
}

impl<'a> UartRxIsr<'a> {
    pub fn new(producer: Producer<'a>) -> Self {
        Self {
            producer,
            dropped: 0,
        }
    }

    /// Store received bytes; whatever does not fit is counted as dropped.
    pub fn on_receive(&mut self, bytes: &[u8]) -> usize {
        let accepted = self.producer.enqueue(bytes);
        let lost = bytes.len() - accepted;
        self.dropped = self.dropped.saturating_add(lost as u32);
        accepted
    }

    /// Bytes lost to a full RX ring since startup
    pub fn dropped_bytes(&self) -> u32 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::core::circular_buffer::CircularBuffer;
    use crate::platform::mock::{mock_uart_driver, MockUart};
    use crate::platform::{PlatformError, UartError, UartParity, UartStopBits};

    fn open(tx_capacity: usize) -> UartDriver<'static, MockUart> {
        mock_uart_driver(UartConfig::default(), tx_capacity).unwrap()
    }

    fn runs(uart: &UartDriver<'_, MockUart>) -> Vec<Vec<u8>> {
        uart.with_port(|port| port.transmit_runs().to_vec())
    }

    #[test]
    fn write_starts_transmission_when_idle() {
        let mut uart = open(16);

        assert_eq!(uart.write(b"abc"), 3);
        assert!(uart.is_transmitting());
        assert_eq!(runs(&uart), [b"abc".to_vec()]);

        // in flight: queued, not started
        assert_eq!(uart.write(b"de"), 2);
        assert_eq!(runs(&uart).len(), 1);
        assert_eq!(uart.pending(), 5);

        uart.line().on_tx_complete();
        assert_eq!(uart.with_port(|port| port.transmitted()), b"abcde");
        uart.line().on_tx_complete();
        assert!(!uart.is_transmitting());
        assert_eq!(uart.pending(), 0);
    }

    #[test]
    fn wrapped_data_goes_out_in_two_runs() {
        let mut uart = open(8);
        let line = uart.line();

        uart.write(b"012345");
        line.on_tx_complete();
        uart.write(b"abcde");
        line.on_tx_complete();
        line.on_tx_complete();

        assert_eq!(
            runs(&uart),
            [b"012345".to_vec(), b"ab".to_vec(), b"cde".to_vec()]
        );
        assert!(!uart.is_transmitting());
    }

    #[test]
    fn full_ring_truncates_write() {
        let mut uart = open(4);
        assert_eq!(uart.write(b"123456"), 4);
        assert_eq!(uart.write(b"7"), 0);
    }

    #[test]
    fn spurious_completion_is_ignored() {
        let uart = open(4);
        uart.line().on_tx_complete();
        assert_eq!(uart.pending(), 0);
        assert!(runs(&uart).is_empty());
    }

    #[test]
    fn failed_start_is_retried_on_next_write() {
        let mut uart = open(16);

        uart.with_port(|port| port.set_fail_transmit(true));
        assert_eq!(uart.write(b"abc"), 3);
        assert!(!uart.is_transmitting());
        assert_eq!(uart.tx_errors(), 1);

        uart.with_port(|port| port.set_fail_transmit(false));
        uart.write(b"d");
        assert_eq!(uart.with_port(|port| port.transmitted()), b"abcd");
    }

    #[test]
    fn completion_runs_from_another_thread_while_driver_writes() {
        let mut uart = open(8);
        let line = uart.line();

        let written = AtomicBool::new(false);

        std::thread::scope(|scope| {
            scope.spawn(|| {
                while !written.load(Ordering::Acquire) {
                    line.on_tx_complete();
                    std::thread::yield_now();
                }
            });

            let mut sent = 0;
            while sent < 64 {
                sent += uart.write(&[b'x'; 64][..64 - sent]);
                std::thread::yield_now();
            }
            written.store(true, Ordering::Release);
        });

        // drain what the interrupt thread left behind
        while uart.is_transmitting() {
            line.on_tx_complete();
        }
        assert_eq!(uart.pending(), 0);
        assert_eq!(uart.with_port(|port| port.transmitted()), [b'x'; 64]);
    }

    #[test]
    fn ioctl_set_applies_masked_fields() {
        let mut uart = open(4);

        let conf = UartConfig {
            baud_rate: 57600,
            data_bits: 9,
            parity: UartParity::Even,
            stop_bits: UartStopBits::Two,
        };
        uart.ioctl_set(UartSetMask::BAUD_RATE | UartSetMask::PARITY, &conf)
            .unwrap();

        let applied = uart.with_port(|port| port.config());
        assert_eq!(applied.baud_rate, 57600);
        assert_eq!(applied.parity, UartParity::Even);
        assert_eq!(applied.data_bits, 8);
        assert_eq!(applied.stop_bits, UartStopBits::One);
        assert_eq!(uart.config(), applied);
    }

    #[test]
    fn ioctl_set_keeps_config_on_error() {
        let mut uart = open(4);
        let conf = UartConfig {
            baud_rate: 0,
            ..UartConfig::default()
        };

        assert_eq!(
            uart.ioctl_set(UartSetMask::all(), &conf),
            Err(PlatformError::Uart(UartError::InvalidBaudRate))
        );
        assert_eq!(uart.config().baud_rate, 115200);
    }

    #[test]
    fn rx_path_through_split_ring() {
        let rx_storage: &'static mut [u8] = vec![0u8; 4].leak();
        let rx_ring: &'static mut CircularBuffer<'static> =
            Box::leak(Box::new(CircularBuffer::attach(rx_storage).unwrap()));
        let (producer, consumer) = rx_ring.split();

        let mut uart = open(8);
        uart.attach_rx(consumer);
        let mut isr = UartRxIsr::new(producer);

        assert_eq!(isr.on_receive(b"#LF03"), 4);
        assert_eq!(isr.dropped_bytes(), 1);

        let mut out = [0u8; 8];
        assert_eq!(uart.read(&mut out), 4);
        assert_eq!(&out[..4], b"#LF0");
    }

    #[test]
    fn poll_rx_moves_port_bytes() {
        let rx_storage: &'static mut [u8] = vec![0u8; 64].leak();
        let rx_ring: &'static mut CircularBuffer<'static> =
            Box::leak(Box::new(CircularBuffer::attach(rx_storage).unwrap()));
        let (producer, consumer) = rx_ring.split();

        let mut uart = open(8);
        uart.attach_rx(consumer);
        let mut isr = UartRxIsr::new(producer);

        uart.with_port(|port| port.inject_rx_data(b"#LV3 and some more bytes"));
        assert_eq!(uart.poll_rx(&mut isr).unwrap(), 24);

        let mut out = [0u8; 4];
        assert_eq!(uart.read(&mut out), 4);
        assert_eq!(&out, b"#LV3");
    }

    #[test]
    fn read_without_ring_uses_port() {
        let mut uart = open(4);
        uart.with_port(|port| port.inject_rx_data(b"xy"));

        let mut out = [0u8; 4];
        assert_eq!(uart.read(&mut out), 2);
    }

    #[test]
    fn driver_is_a_log_sink() {
        let mut uart = open(32);
        assert_eq!(uart.write_log(b"DEBUG: hi\n"), 10);
        assert_eq!(uart.with_port(|port| port.transmitted()), b"DEBUG: hi\n");
    }
}
