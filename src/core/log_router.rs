//! Log Router
//!
//! Operator-facing log channel. Messages are tagged with a [`LogLevel`] and
//! a module index and written as text lines to a [`LogSink`] (the console
//! UART or the radio link):
//!
//! ```text
//! WARNING: pitot read timeout\n
//! ```
//!
//! A message goes out only if the router is open, not paused, its module is
//! not filtered and its level is part of the active [`Verbosity`].
//!
//! ## Usage
//!
//! ```
//! use flight_daq::core::log_router::{LogLevel, LogRouter, Verbosity};
//!
//! let mut router = LogRouter::new();
//! router.open(heapless::Vec::<u8, 64>::new()).unwrap();
//! router.set_verbosity(Verbosity::WARNING | Verbosity::CRITICAL).unwrap();
//!
//! assert_eq!(router.send("ignored", 0, LogLevel::Debug), Ok(false));
//! assert_eq!(router.send("low battery", 0, LogLevel::Warning), Ok(true));
//! assert_eq!(router.sink().unwrap().as_slice(), b"WARNING: low battery\n");
//! ```

use core::fmt;

use bitflags::bitflags;
use heapless::String;

use crate::log_warn;

/// Number of module indexes that can be filtered
pub const LOG_MODULE_COUNT: u8 = 32;

/// Maximum length of one formatted line, prefix and newline included
pub const LOG_LINE_CAPACITY: usize = 200;

bitflags! {
    /// Set of active log levels
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Verbosity: u8 {
        const DEBUG = 0x1;
        const WARNING = 0x2;
        const CRITICAL = 0x4;
    }
}

/// Severity of a log message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LogLevel {
    Debug,
    Warning,
    Critical,
}

impl LogLevel {
    /// Verbosity flag enabling this level
    pub fn flag(self) -> Verbosity {
        match self {
            LogLevel::Debug => Verbosity::DEBUG,
            LogLevel::Warning => Verbosity::WARNING,
            LogLevel::Critical => Verbosity::CRITICAL,
        }
    }

    /// Line prefix written before the message
    pub fn prefix(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG: ",
            LogLevel::Warning => "WARNING: ",
            LogLevel::Critical => "CRITICAL: ",
        }
    }
}

/// Log router errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LogError {
    /// `open` called on an open router
    AlreadyOpen,
    /// Operation requires an open router
    Closed,
    /// Module index is not below `LOG_MODULE_COUNT`
    InvalidModule,
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogError::AlreadyOpen => write!(f, "Log already open"),
            LogError::Closed => write!(f, "Log closed"),
            LogError::InvalidModule => write!(f, "Invalid log module"),
        }
    }
}

/// Destination of formatted log lines
pub trait LogSink {
    /// Write a complete line, returning the number of bytes accepted
    fn write_log(&mut self, line: &[u8]) -> usize;
}

impl<const N: usize> LogSink for heapless::Vec<u8, N> {
    fn write_log(&mut self, line: &[u8]) -> usize {
        let accepted = line.len().min(N - self.len());
        // Cannot fail: `accepted` fits the remaining capacity
        let _ = self.extend_from_slice(&line[..accepted]);
        accepted
    }
}

/// Level and module filtering in front of a [`LogSink`]
pub struct LogRouter<S> {
    sink: Option<S>,
    active: bool,
    paused: bool,
    verbosity: Verbosity,
    filtered_modules: u32,
}

impl<S: LogSink> LogRouter<S> {
    /// Create a closed router
    pub const fn new() -> Self {
        Self {
            sink: None,
            active: false,
            paused: false,
            verbosity: Verbosity::empty(),
            filtered_modules: 0,
        }
    }

    /// Activate with every level enabled, writing to `sink`
    pub fn open(&mut self, sink: S) -> Result<(), LogError> {
        if self.active {
            return Err(LogError::AlreadyOpen);
        }
        self.sink = Some(sink);
        self.verbosity = Verbosity::all();
        self.active = true;
        Ok(())
    }

    /// Disable every level
    pub fn close(&mut self) -> Result<(), LogError> {
        if !self.active {
            return Err(LogError::Closed);
        }
        self.verbosity = Verbosity::empty();
        self.active = false;
        Ok(())
    }

    /// Check whether the router is open
    pub fn is_open(&self) -> bool {
        self.active
    }

    /// Temporarily silence (or resume) every message
    pub fn pause(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Replace the set of active levels
    pub fn set_verbosity(&mut self, verbosity: Verbosity) -> Result<(), LogError> {
        if !self.active {
            return Err(LogError::Closed);
        }
        self.verbosity = verbosity;
        Ok(())
    }

    /// Active levels
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Mute (`filter_on`) or unmute one module
    pub fn filter_module(&mut self, module: u8, filter_on: bool) -> Result<(), LogError> {
        if module >= LOG_MODULE_COUNT {
            return Err(LogError::InvalidModule);
        }
        if filter_on {
            self.filtered_modules |= 1 << module;
        } else {
            self.filtered_modules &= !(1 << module);
        }
        Ok(())
    }

    /// Check whether a module is muted
    pub fn is_filtered(&self, module: u8) -> bool {
        module < LOG_MODULE_COUNT && self.filtered_modules & (1 << module) != 0
    }

    /// Replace the sink, returning the previous one
    pub fn set_output(&mut self, sink: S) -> Option<S> {
        self.sink.replace(sink)
    }

    /// Current sink
    pub fn sink(&self) -> Option<&S> {
        self.sink.as_ref()
    }

    /// Current sink, mutably
    pub fn sink_mut(&mut self) -> Option<&mut S> {
        self.sink.as_mut()
    }

    /// Send one message.
    ///
    /// Returns `Ok(false)` when the message was suppressed (paused, module
    /// filtered or level inactive) and `Ok(true)` once the line was handed
    /// to the sink. Messages longer than the line buffer are truncated.
    pub fn send(&mut self, message: &str, module: u8, level: LogLevel) -> Result<bool, LogError> {
        if !self.active {
            return Err(LogError::Closed);
        }
        if module >= LOG_MODULE_COUNT {
            return Err(LogError::InvalidModule);
        }
        if self.paused || self.is_filtered(module) || !self.verbosity.contains(level.flag()) {
            return Ok(false);
        }
        let Some(sink) = self.sink.as_mut() else {
            return Ok(false);
        };

        let line = format_line(message, level);
        let written = sink.write_log(line.as_bytes());
        if written < line.len() {
            log_warn!("log line truncated by sink: {} of {} bytes", written, line.len());
        }
        Ok(true)
    }
}

impl<S: LogSink> Default for LogRouter<S> {
    fn default() -> Self {
        Self::new()
    }
}

fn format_line(message: &str, level: LogLevel) -> String<LOG_LINE_CAPACITY> {
    let mut line = String::new();
    let _ = line.push_str(level.prefix());
    for ch in message.chars() {
        // Keep room for the newline
        if line.len() + ch.len_utf8() >= LOG_LINE_CAPACITY {
            break;
        }
        let _ = line.push(ch);
    }
    let _ = line.push('\n');
    line
}
