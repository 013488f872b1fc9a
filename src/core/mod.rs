//! Core flight computer infrastructure
//!
//! The cooperative task scheduler and the containers it is built on, plus
//! logging and the platform-agnostic traits shared by every layer.

pub mod circular_buffer;
pub mod list;
pub mod log_router;
pub mod logging;
pub mod scheduler;
pub mod traits;
