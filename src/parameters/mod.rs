//! Build-time configuration
//!
//! Task periods and serial link settings are fixed when the firmware is
//! built. `build.rs` forwards the `DAQ_*` environment variables (or their
//! defaults) to the compiler; [`DaqConfig::from_build_env`] reads them back.

pub mod daq;

pub use daq::DaqConfig;
