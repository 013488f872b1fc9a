//! Acquisition firmware parameters
//!
//! # Parameters
//!
//! - `DAQ_TELEMETRY_PERIOD_MS` - telemetry downlink period
//! - `DAQ_COMMAND_POLL_MS` - command channel poll period
//! - `DAQ_MOCK_PERIOD_MS` - mock device refresh period
//! - `DAQ_RADIO_BAUD` - XBee link baud rate
//! - `DAQ_CONSOLE_BAUD` - console UART baud rate
//!
//! # Example
//!
//! ```sh
//! DAQ_TELEMETRY_PERIOD_MS=250 cargo build --release
//! ```

const TELEMETRY_PERIOD_MS: u32 = const_parse_u32(env!("DAQ_TELEMETRY_PERIOD_MS"), 500);
const COMMAND_POLL_MS: u32 = const_parse_u32(env!("DAQ_COMMAND_POLL_MS"), 20);
const MOCK_PERIOD_MS: u32 = const_parse_u32(env!("DAQ_MOCK_PERIOD_MS"), 500);
const RADIO_BAUD: u32 = const_parse_u32(env!("DAQ_RADIO_BAUD"), 57_600);
const CONSOLE_BAUD: u32 = const_parse_u32(env!("DAQ_CONSOLE_BAUD"), 115_200);

/// Runtime configuration of the acquisition firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DaqConfig {
    /// Telemetry packet period in ticks
    pub telemetry_period_ms: u32,
    /// Command channel poll period in ticks
    pub command_poll_ms: u32,
    /// Mock device refresh period in ticks
    pub mock_period_ms: u32,
    /// Radio link baud rate
    pub radio_baud: u32,
    /// Console baud rate
    pub console_baud: u32,
}

impl Default for DaqConfig {
    fn default() -> Self {
        Self {
            telemetry_period_ms: 500,
            command_poll_ms: 20,
            mock_period_ms: 500,
            radio_baud: 57_600,
            console_baud: 115_200,
        }
    }
}

impl DaqConfig {
    /// Configuration forwarded by `build.rs`.
    ///
    /// A value that is not a positive decimal integer falls back to its
    /// default.
    pub const fn from_build_env() -> Self {
        Self {
            telemetry_period_ms: TELEMETRY_PERIOD_MS,
            command_poll_ms: COMMAND_POLL_MS,
            mock_period_ms: MOCK_PERIOD_MS,
            radio_baud: RADIO_BAUD,
            console_baud: CONSOLE_BAUD,
        }
    }
}

/// Parse a decimal u32 at compile time
///
/// Returns `default` for an empty string, a non-digit character, zero or
/// overflow.
const fn const_parse_u32(s: &str, default: u32) -> u32 {
    let bytes = s.as_bytes();
    if bytes.is_empty() {
        return default;
    }

    let mut value: u32 = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b < b'0' || b > b'9' {
            return default;
        }
        value = match value.checked_mul(10) {
            Some(v) => match v.checked_add((b - b'0') as u32) {
                Some(v) => v,
                None => return default,
            },
            None => return default,
        };
        i += 1;
    }

    if value == 0 {
        default
    } else {
        value
    }
}
