#![cfg_attr(not(test), no_std)]

//! flight_daq - Flight data acquisition firmware core
//!
//! Sensor polling, acquisition buffers and radio telemetry driven by a
//! cooperative task scheduler with interrupt-driven I/O completion.

// Mock buses allocate; the rest of the crate stays allocation-free
#[cfg(all(feature = "mock", not(test)))]
extern crate std;

// Platform abstraction layer (bus traits, errors, mocks)
pub mod platform;

// Bus drivers built on the platform traits and the circular buffer
pub mod devices;

// Scheduler, containers, logging
pub mod core;

// Radio link and command channel
pub mod communication;

// Acquisition buffers, telemetry assembly, mock sensor
pub mod subsystems;

// Build-time and runtime configuration
pub mod parameters;

// Task wiring for the flight computer
pub mod app;
