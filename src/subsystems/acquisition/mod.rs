//! Data acquisition
//!
//! Sensor tasks store their latest reading, already formatted as ASCII, in
//! the [`AcquisitionBuffers`]; the telemetry task gathers the new readings
//! into one packet for the radio.
//!
//! ```text
//! ┌──────────────┐  write   ┌────────────────────┐  read   ┌──────────────┐
//! │ sensor tasks │ ───────▶ │ AcquisitionBuffers │ ──────▶ │  gatherer    │
//! │ (mock device)│          │  one slot/channel  │         │ (telemetry)  │
//! └──────────────┘          └────────────────────┘         └──────┬───────┘
//!                                                                 ▼
//!                                                               radio
//! ```

pub mod buffers;
pub mod gatherer;
pub mod mock_device;

pub use buffers::{AcquisitionBuffers, Channel};
pub use gatherer::{read_telemetry, TelemetryPacket, PACKET_CAPACITY};

/// Scheduler context giving tasks access to the acquisition buffers
pub trait AcquisitionContext {
    fn buffers(&mut self) -> &mut AcquisitionBuffers;
}

impl AcquisitionContext for AcquisitionBuffers {
    fn buffers(&mut self) -> &mut AcquisitionBuffers {
        self
    }
}
