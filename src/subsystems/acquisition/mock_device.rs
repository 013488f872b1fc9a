//! Mock sensor device
//!
//! Stands in for the real sensor drivers on the bench: a repeating task that
//! stores a fixed reading in every acquisition channel.

use super::{AcquisitionContext, Channel};
use crate::core::scheduler::{Invocation, Scheduler, SchedulerError, TaskHandle};
use crate::core::traits::TimeSource;
use crate::log_debug;

/// Default refresh period in ticks
pub const MOCK_PERIOD_MS: u32 = 500;

/// Scheduler priority of the mock device task
pub const MOCK_PRIORITY: u8 = 2;

/// Fixed reading per channel
pub const DUMMY_READINGS: [(Channel, &[u8]); 6] = [
    (Channel::Pitot, b"2048"),
    (Channel::Barometer, b"99325"),
    (Channel::GpsAltitude, b"167.8"),
    (Channel::GpsPosition, b"4529.8360#N#7334.74137#W"),
    (Channel::Accelerometer, b"101#101#101"),
    (Channel::Gyroscope, b"101#101#101"),
];

/// Store the dummy readings
pub fn fill_buffers<A: AcquisitionContext + ?Sized>(ctx: &mut A) {
    let buffers = ctx.buffers();
    for (channel, reading) in DUMMY_READINGS {
        buffers.write(channel, reading);
    }
}

/// Register the mock device task, refreshing every `period_ms` ticks
pub fn install<C, T>(scheduler: &mut Scheduler<C, T>, period_ms: u32) -> Result<TaskHandle, SchedulerError>
where
    C: AcquisitionContext,
    T: TimeSource,
{
    scheduler.create_task(mock_loop::<C, T>, 0, 0, period_ms, true, MOCK_PRIORITY)
}

fn mock_loop<C: AcquisitionContext, T>(_: &mut Scheduler<C, T>, ctx: &mut C, _: Invocation) {
    fill_buffers(ctx);
    log_debug!("mock device refreshed");
}
