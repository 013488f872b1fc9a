//! Subsystems
//!
//! - `acquisition`: sensor readings from the drivers to the telemetry downlink

pub mod acquisition;
