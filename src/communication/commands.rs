//! Ground command channel
//!
//! Commands arrive as ASCII frames on a serial link:
//!
//! ```text
//! #LF3,1    mute log module 3
//! #LF3,0    unmute log module 3
//! #LV6      verbosity = WARNING | CRITICAL
//! ```
//!
//! A frame is `#`, a two byte command name, then a fixed number of argument
//! bytes given by [`COMMAND_TABLE`]. Bytes before the `#` are skipped. One
//! frame is handled per [`poll`]; a frame whose name or arguments have not
//! fully arrived when it is read is dropped.

use core::fmt;

use crate::core::circular_buffer::Consumer;
use crate::core::log_router::{LogError, LogRouter, LogSink, Verbosity};
use crate::devices::uart::UartDriver;
use crate::platform::UartInterface;

/// Frame start marker
pub const COMMAND_START: u8 = b'#';

/// Length of a command name
pub const COMMAND_SIZE: usize = 2;

/// Longest accepted argument field
pub const MAX_ARGUMENT_SIZE: usize = 16;

/// Parsed ground command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Mute or unmute one log module
    LogFilter { module: u8, filtered: bool },
    /// Replace the active log levels
    LogVerbosity(Verbosity),
}

/// Command channel errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Name not in the command table
    UnknownCommand([u8; COMMAND_SIZE]),
    /// Command name cut short
    Truncated,
    /// Argument field does not parse
    InvalidArguments,
    /// Log router rejected the command
    Log(LogError),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::UnknownCommand(name) => write!(
                f,
                "Unknown command {}{}",
                char::from(name[0]),
                char::from(name[1])
            ),
            CommandError::Truncated => write!(f, "Command truncated"),
            CommandError::InvalidArguments => write!(f, "Invalid command arguments"),
            CommandError::Log(e) => write!(f, "Log router error: {}", e),
        }
    }
}

impl From<LogError> for CommandError {
    fn from(error: LogError) -> Self {
        CommandError::Log(error)
    }
}

/// Non-blocking byte input
pub trait ByteSource {
    /// Read up to `out.len()` bytes that are already available
    fn read_bytes(&mut self, out: &mut [u8]) -> usize;
}

impl<U: UartInterface> ByteSource for UartDriver<'_, U> {
    fn read_bytes(&mut self, out: &mut [u8]) -> usize {
        self.read(out)
    }
}

impl ByteSource for Consumer<'_> {
    fn read_bytes(&mut self, out: &mut [u8]) -> usize {
        self.dequeue(out)
    }
}

impl<'a> ByteSource for &'a [u8] {
    fn read_bytes(&mut self, out: &mut [u8]) -> usize {
        let input: &'a [u8] = *self;
        let n = core::cmp::min(out.len(), input.len());
        out[..n].copy_from_slice(&input[..n]);
        *self = &input[n..];
        n
    }
}

/// Entry of the command table
pub struct CommandEntry {
    pub name: [u8; COMMAND_SIZE],
    /// Argument bytes read after the name
    pub argument_size: usize,
    pub parse: fn(&[u8]) -> Result<Command, CommandError>,
}

/// Known commands
pub static COMMAND_TABLE: [CommandEntry; 2] = [
    CommandEntry {
        name: *b"LF",
        argument_size: 5,
        parse: parse_log_filter,
    },
    CommandEntry {
        name: *b"LV",
        argument_size: 1,
        parse: parse_log_verbosity,
    },
];

/// Look up a command by name
pub fn find_command(name: &[u8]) -> Option<&'static CommandEntry> {
    COMMAND_TABLE.iter().find(|entry| entry.name == name)
}

/// Read and parse the next frame from `source`.
///
/// Returns `Ok(None)` when no frame start is pending.
pub fn next_command<B: ByteSource>(source: &mut B) -> Result<Option<Command>, CommandError> {
    let mut byte = [0u8; 1];
    loop {
        if source.read_bytes(&mut byte) == 0 {
            return Ok(None);
        }
        if byte[0] == COMMAND_START {
            break;
        }
    }

    let mut name = [0u8; COMMAND_SIZE];
    if source.read_bytes(&mut name) != COMMAND_SIZE {
        return Err(CommandError::Truncated);
    }
    let entry = find_command(&name).ok_or(CommandError::UnknownCommand(name))?;

    let mut arguments = [0u8; MAX_ARGUMENT_SIZE];
    let wanted = core::cmp::min(entry.argument_size, MAX_ARGUMENT_SIZE);
    let received = source.read_bytes(&mut arguments[..wanted]);
    (entry.parse)(&arguments[..received]).map(Some)
}

/// Apply `command` to the log router
pub fn apply<S: LogSink>(command: Command, router: &mut LogRouter<S>) -> Result<(), CommandError> {
    match command {
        Command::LogFilter { module, filtered } => router.filter_module(module, filtered)?,
        Command::LogVerbosity(verbosity) => router.set_verbosity(verbosity)?,
    }
    Ok(())
}

/// Handle at most one pending frame from `source`
pub fn poll<B: ByteSource, S: LogSink>(
    source: &mut B,
    router: &mut LogRouter<S>,
) -> Result<Option<Command>, CommandError> {
    let command = next_command(source)?;
    if let Some(command) = command {
        apply(command, router)?;
    }
    Ok(command)
}

/// `<module>,<0|1>`; anything after the flag digit is ignored
fn parse_log_filter(arguments: &[u8]) -> Result<Command, CommandError> {
    if arguments.len() < 3 {
        return Err(CommandError::InvalidArguments);
    }

    let mut fields = arguments.split(|&b| b == b',');
    let module = fields
        .next()
        .and_then(parse_decimal)
        .ok_or(CommandError::InvalidArguments)?;
    let filtered = match fields.next().and_then(|field| field.first()) {
        Some(b'0') => false,
        Some(b'1') => true,
        _ => return Err(CommandError::InvalidArguments),
    };

    Ok(Command::LogFilter { module, filtered })
}

/// Single digit holding the verbosity flags
fn parse_log_verbosity(arguments: &[u8]) -> Result<Command, CommandError> {
    match arguments.first() {
        Some(&digit @ b'0'..=b'7') => Ok(Command::LogVerbosity(Verbosity::from_bits_truncate(
            digit - b'0',
        ))),
        _ => Err(CommandError::InvalidArguments),
    }
}

fn parse_decimal(field: &[u8]) -> Option<u8> {
    core::str::from_utf8(field).ok()?.trim().parse().ok()
}
