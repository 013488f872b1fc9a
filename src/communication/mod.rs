//! Ground communication
//!
//! - `xbee`: radio link carrying telemetry downlink and log output
//! - `commands`: `#XY...` command frames received from the ground

pub mod commands;
pub mod xbee;
