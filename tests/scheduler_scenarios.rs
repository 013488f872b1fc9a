//! Host scenarios for the scheduler and the drivers that feed it

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use flight_daq::core::scheduler::{
    schedule_from_isr, Invocation, IsrQueue, Scheduler, SchedulerError, MAX_TASKS,
};
use flight_daq::core::traits::{MockTime, Tick};
use flight_daq::devices::i2c::{
    AddressSize, I2cBus, I2cBusConfig, I2cEvent, I2cSlaveConfig, I2cSlaveDevice, I2cSlaveSetMask,
};
use flight_daq::platform::mock::MockI2c;
use flight_daq::platform::I2cError;
use flight_daq::subsystems::acquisition::{AcquisitionBuffers, Channel};

#[derive(Default)]
struct Trace {
    events: Vec<u32>,
    ticks: Vec<Tick>,
}

type TraceScheduler = Scheduler<Trace, MockTime>;

fn record(scheduler: &mut TraceScheduler, trace: &mut Trace, invocation: Invocation) {
    trace.events.push(invocation.event);
    trace.ticks.push(scheduler.now());
}

fn chain(scheduler: &mut TraceScheduler, trace: &mut Trace, invocation: Invocation) {
    trace.events.push(invocation.event);
    if invocation.event < 3 {
        scheduler
            .schedule_one_shot(chain, invocation.event + 1, 0, 1)
            .unwrap();
    }
}

#[test]
fn one_shot_chain_drains_the_scheduler() {
    let mut scheduler = TraceScheduler::new(MockTime::new());
    let mut trace = Trace::default();
    scheduler.schedule_one_shot(chain, 0, 0, 1).unwrap();

    assert_eq!(scheduler.run_forever(&mut trace), SchedulerError::NoTasks);
    assert_eq!(trace.events, [0, 1, 2, 3]);
    assert_eq!(scheduler.task_count(), 0);
    assert_eq!(scheduler.stats().retired, 4);
}

#[test]
fn periodic_task_survives_tick_wraparound() {
    // 250 ms before the millisecond tick wraps
    let start_us = (u64::from(u32::MAX) - 249) * 1000;
    let mut scheduler = TraceScheduler::new(MockTime::with_initial(start_us));
    let mut trace = Trace::default();
    let handle = scheduler.create_task(record, 1, 0, 100, true, 0).unwrap();

    scheduler.run(&mut trace).unwrap();
    for _ in 0..10 {
        scheduler.clock().advance_ms(100);
        assert_eq!(scheduler.run(&mut trace).unwrap().promoted, 1);
        assert_eq!(scheduler.run(&mut trace).unwrap().executed, Some(handle));
    }

    assert_eq!(trace.events.len(), 11);
    for pair in trace.ticks.windows(2) {
        assert_eq!(pair[1].wrapping_since(pair[0]), 100);
    }
    assert!(trace.ticks.last().unwrap().as_u32() < 1000);
}

static TASK_RUNNING: AtomicBool = AtomicBool::new(false);
static REQUEST_POSTED: AtomicBool = AtomicBool::new(false);

/// Holds the main loop until the interrupt thread has posted, or 2 s pass
fn wait_for_interrupt(_: &mut TraceScheduler, trace: &mut Trace, invocation: Invocation) {
    TASK_RUNNING.store(true, Ordering::SeqCst);
    let deadline = Instant::now() + Duration::from_secs(2);
    while !REQUEST_POSTED.load(Ordering::SeqCst) && Instant::now() < deadline {
        thread::yield_now();
    }
    trace.events.push(invocation.event);
}

#[test]
fn interrupt_posts_while_task_is_running() {
    let mut scheduler = TraceScheduler::new(MockTime::new());
    let mut trace = Trace::default();
    let isr = IsrQueue::new();
    scheduler
        .create_task(wait_for_interrupt, 1, 0, 1000, true, 2)
        .unwrap();

    let started = Instant::now();
    thread::scope(|scope| {
        scope.spawn(|| {
            while !TASK_RUNNING.load(Ordering::SeqCst) {
                thread::yield_now();
            }
            schedule_from_isr(&isr, record, 42, 0, 0).unwrap();
            REQUEST_POSTED.store(true, Ordering::SeqCst);
        });

        let report = scheduler.run_with(&mut trace, &isr).unwrap();
        assert_eq!(report.accepted, 0);
    });

    // the task saw the request arrive instead of timing out
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(isr.len(), 1);

    let report = scheduler.run_with(&mut trace, &isr).unwrap();
    assert_eq!(report.accepted, 1);
    assert_eq!(trace.events, [1, 42]);
    assert_eq!(scheduler.task_count(), 1);
}

#[test]
fn pool_exhaustion_and_recovery() {
    let mut scheduler = TraceScheduler::new(MockTime::new());
    let mut trace = Trace::default();

    let handles: Vec<_> = (0..MAX_TASKS)
        .map(|i| scheduler.create_task(record, i as u32, 0, 10, true, 2).unwrap())
        .collect();
    assert_eq!(
        scheduler.create_task(record, 99, 0, 10, true, 2),
        Err(SchedulerError::PoolFull)
    );

    scheduler.destroy_task(handles[5]).unwrap();
    let reused = scheduler.schedule_one_shot(record, 99, 0, 0).unwrap();
    assert_eq!(reused.index(), handles[5].index());
    assert!(!scheduler.is_live(handles[5]));
    assert_eq!(
        scheduler.destroy_task(handles[5]),
        Err(SchedulerError::StaleHandle)
    );

    assert_eq!(scheduler.run(&mut trace).unwrap().executed, Some(reused));
    assert_eq!(trace.events, [99]);
}

// ============================================================================
// Sensor read through the I2C driver
// ============================================================================

struct Sensors {
    bus: I2cBus<MockI2c>,
    barometer: I2cSlaveDevice<Sensors, MockTime>,
    raw: [u8; 3],
    buffers: AcquisitionBuffers,
    errors: u32,
}

type SensorScheduler = Scheduler<Sensors, MockTime>;

const BARO_ADDRESS: u8 = 0x60;
const BARO_OUT_P_MSB: u16 = 0x01;

fn poll_barometer(scheduler: &mut SensorScheduler, ctx: &mut Sensors, _: Invocation) {
    ctx.bus
        .read_register(
            scheduler,
            &ctx.barometer,
            BARO_OUT_P_MSB,
            AddressSize::EightBit,
            &mut ctx.raw,
        )
        .unwrap();
}

fn barometer_done(_: &mut SensorScheduler, ctx: &mut Sensors, invocation: Invocation) {
    match I2cEvent::from_event(invocation.event) {
        Some(I2cEvent::RxTransferDone) => {
            // 18.2 fixed point pascals
            let raw = u32::from_be_bytes([0, ctx.raw[0], ctx.raw[1], ctx.raw[2]]) >> 6;
            let text = raw.to_string();
            ctx.buffers.write(Channel::Barometer, text.as_bytes());
        }
        _ => ctx.errors += 1,
    }
}

fn sensors() -> Sensors {
    let bus = I2cBus::open(MockI2c::new(100_000), I2cBusConfig::default()).unwrap();
    let mut barometer = I2cSlaveDevice::new();
    bus.ioctl_set_slave(
        &mut barometer,
        I2cSlaveSetMask::all(),
        &I2cSlaveConfig {
            address: BARO_ADDRESS,
            callback: Some(barometer_done),
            argument: 0,
            priority: 0,
        },
    )
    .unwrap();

    Sensors {
        bus,
        barometer,
        raw: [0; 3],
        buffers: AcquisitionBuffers::new(),
        errors: 0,
    }
}

#[test]
fn barometer_reading_reaches_acquisition_buffer() {
    let mut scheduler = SensorScheduler::new(MockTime::new());
    let mut ctx = sensors();
    let poll = scheduler.create_task(poll_barometer, 0, 0, 100, true, 2).unwrap();

    // 99325 Pa << 6
    let raw = (99_325u32 << 6).to_be_bytes();
    ctx.bus.port_mut().set_read_data(&raw[1..]);

    assert_eq!(scheduler.run(&mut ctx).unwrap().executed, Some(poll));
    assert_eq!(scheduler.task_count(), 2);
    scheduler.run(&mut ctx).unwrap();

    assert!(ctx.buffers.is_new(Channel::Barometer));
    assert_eq!(ctx.buffers.peek(Channel::Barometer), b"99325");
    assert_eq!(scheduler.task_count(), 1);

    ctx.bus.port_mut().set_error(Some(I2cError::Nack));
    scheduler.clock().advance_ms(100);
    scheduler.run(&mut ctx).unwrap();
    scheduler.run(&mut ctx).unwrap();
    scheduler.run(&mut ctx).unwrap();
    assert_eq!(ctx.errors, 1);
}
