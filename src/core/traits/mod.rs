//! Core traits that decouple the scheduler and drivers from the platform.
//!
//! ```text
//!   Scheduler, drivers, acquisition tasks
//!                  │
//!      ┌───────────┴────────────┐
//!      ▼                        ▼
//!  TimeSource               SharedState<T>
//!  + now_ms() / now_us()    + with(f)
//!  + tick() -> Tick         + with_mut(f)
//!      │                        │
//!  MockTime                 MockState<T>, CsState<T>
//!  EmbassyTime (embassy)    EmbassyState<T> (embassy)
//! ```
//!
//! Mock implementations are always available for host testing.

pub mod sync;
pub mod time;

pub use sync::{CsState, MockState, SharedState};
pub use time::{MockTime, Tick, TimeSource};

#[cfg(feature = "embassy")]
pub use sync::EmbassyState;

#[cfg(feature = "embassy")]
pub use time::EmbassyTime;
