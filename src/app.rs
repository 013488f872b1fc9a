//! Flight computer task wiring
//!
//! [`FlightComputer`] is the scheduler context shared by every task: the
//! acquisition buffers, the radio link and the operator log. [`install`]
//! registers the periodic tasks:
//!
//! | Task         | Period (default) | Priority |
//! |--------------|------------------|----------|
//! | telemetry    | 500 ms           | 1        |
//! | mock device  | 500 ms           | 2        |
//! | command poll | 20 ms            | 2        |
//!
//! The board support code owns the peripherals, builds the context with
//! [`FlightComputer::open`] and [`open_console`], calls [`install`] and then
//! `Scheduler::run_forever_with`. Interrupt handlers never touch the
//! context: UART transmit completions go to the driver's
//! [`UartLine`](crate::devices::uart::UartLine), and sensor completions are
//! posted to the scheduler's [`IsrQueue`](crate::core::scheduler::IsrQueue).

use core::fmt::Write;

use heapless::String;

use crate::communication::commands;
use crate::communication::xbee::Xbee;
use crate::core::log_router::{LogLevel, LogRouter, LogSink};
use crate::core::scheduler::{Invocation, Scheduler, SchedulerError, TaskHandle};
use crate::core::traits::TimeSource;
use crate::devices::uart::{UartDriver, UartSetMask};
use crate::parameters::DaqConfig;
use crate::platform::{self, PlatformError, UartConfig, UartInterface};
use crate::subsystems::acquisition::{
    mock_device, read_telemetry, AcquisitionBuffers, AcquisitionContext, TelemetryPacket,
};
use crate::{log_info, log_warn};

/// Log module index of the telemetry task
pub const LOG_MODULE_TELEMETRY: u8 = 0;

/// Log module index of the command channel
pub const LOG_MODULE_COMMANDS: u8 = 1;

/// Scheduler priority of the telemetry task
pub const TELEMETRY_PRIORITY: u8 = 1;

/// Scheduler priority of the command poll task
pub const COMMAND_PRIORITY: u8 = 2;

/// Scheduler context of the acquisition firmware
pub struct FlightComputer<'a, R, L> {
    pub buffers: AcquisitionBuffers,
    /// Telemetry downlink and command uplink
    pub radio: Xbee<'a, R>,
    /// Operator log, usually on the console UART
    pub log: LogRouter<L>,
    packet: TelemetryPacket,
    packets_sent: u32,
}

/// Handles of the tasks registered by [`install`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppTasks {
    pub mock_device: TaskHandle,
    pub telemetry: TaskHandle,
    pub commands: TaskHandle,
}

impl<'a, R: UartInterface, L: LogSink> FlightComputer<'a, R, L> {
    pub fn new(radio: Xbee<'a, R>, log: LogRouter<L>) -> Self {
        Self {
            buffers: AcquisitionBuffers::new(),
            radio,
            log,
            packet: TelemetryPacket::new(),
            packets_sent: 0,
        }
    }

    /// Open the radio on `radio_uart` at `config.radio_baud` and build the
    /// context around it.
    ///
    /// # Errors
    ///
    /// The UART error if the radio line settings are rejected.
    pub fn open(
        radio_uart: UartDriver<'a, R>,
        log: LogRouter<L>,
        config: &DaqConfig,
    ) -> platform::Result<Self> {
        let mut radio = Xbee::new();
        radio.open_at(radio_uart, config.radio_baud)?;
        Ok(Self::new(radio, log))
    }

    /// Number of telemetry packets fully queued on the radio
    pub fn packets_sent(&self) -> u32 {
        self.packets_sent
    }

    /// Last assembled telemetry packet
    pub fn last_packet(&self) -> &[u8] {
        &self.packet
    }

    fn telemetry_task<T: TimeSource>(scheduler: &mut Scheduler<Self, T>, ctx: &mut Self, _: Invocation) {
        let len = read_telemetry(&mut ctx.buffers, scheduler.now(), &mut ctx.packet);

        match ctx.radio.write(&ctx.packet) {
            Ok(written) if written == len => {
                ctx.packets_sent = ctx.packets_sent.wrapping_add(1);
            }
            Ok(_) => {
                let _ = ctx.log.send(
                    "telemetry packet truncated",
                    LOG_MODULE_TELEMETRY,
                    LogLevel::Warning,
                );
            }
            Err(e) => {
                log_warn!("telemetry not sent: {}", e);
                let _ = ctx
                    .log
                    .send("radio link closed", LOG_MODULE_TELEMETRY, LogLevel::Critical);
            }
        }
    }

    fn command_task<T: TimeSource>(_: &mut Scheduler<Self, T>, ctx: &mut Self, _: Invocation) {
        let Some(uart) = ctx.radio.uart_mut() else {
            return;
        };

        match commands::poll(uart, &mut ctx.log) {
            Ok(Some(_)) => {
                log_info!("command applied");
                let _ = ctx
                    .log
                    .send("command applied", LOG_MODULE_COMMANDS, LogLevel::Debug);
            }
            Ok(None) => {}
            Err(e) => {
                let mut message: String<64> = String::new();
                let _ = write!(message, "command rejected: {}", e);
                let _ = ctx
                    .log
                    .send(&message, LOG_MODULE_COMMANDS, LogLevel::Warning);
            }
        }
    }
}

impl<R, L> AcquisitionContext for FlightComputer<'_, R, L> {
    fn buffers(&mut self) -> &mut AcquisitionBuffers {
        &mut self.buffers
    }
}

/// Set `console` to `config.console_baud` and open an operator log on it.
///
/// # Errors
///
/// The UART error if the baud rate is rejected.
pub fn open_console<'a, U: UartInterface>(
    mut console: UartDriver<'a, U>,
    config: &DaqConfig,
) -> platform::Result<LogRouter<UartDriver<'a, U>>> {
    let baud = UartConfig {
        baud_rate: config.console_baud,
        ..console.config()
    };
    console.ioctl_set(UartSetMask::BAUD_RATE, &baud)?;

    let mut log = LogRouter::new();
    log.open(console)
        .map_err(|_| PlatformError::ResourceUnavailable)?;
    Ok(log)
}

/// Destroy a task registered earlier in [`install`]
fn unwind<C, T: TimeSource>(scheduler: &mut Scheduler<C, T>, handle: TaskHandle) {
    if let Err(e) = scheduler.destroy_task(handle) {
        log_warn!("install: task {} left registered: {}", handle.index(), e);
    }
}

/// Register the mock device, telemetry and command poll tasks.
///
/// If a task cannot be created, the ones registered before it are
/// destroyed again. The last live task cannot be destroyed and stays
/// registered with a warning.
pub fn install<'a, R, L, T>(
    scheduler: &mut Scheduler<FlightComputer<'a, R, L>, T>,
    config: &DaqConfig,
) -> Result<AppTasks, SchedulerError>
where
    R: UartInterface,
    L: LogSink,
    T: TimeSource,
{
    let mock_device = mock_device::install(scheduler, config.mock_period_ms)?;

    let telemetry = match scheduler.create_task(
        FlightComputer::<R, L>::telemetry_task::<T>,
        0,
        0,
        config.telemetry_period_ms,
        true,
        TELEMETRY_PRIORITY,
    ) {
        Ok(handle) => handle,
        Err(e) => {
            unwind(scheduler, mock_device);
            return Err(e);
        }
    };

    let commands = match scheduler.create_task(
        FlightComputer::<R, L>::command_task::<T>,
        0,
        0,
        config.command_poll_ms,
        true,
        COMMAND_PRIORITY,
    ) {
        Ok(handle) => handle,
        Err(e) => {
            unwind(scheduler, telemetry);
            unwind(scheduler, mock_device);
            return Err(e);
        }
    };

    Ok(AppTasks {
        mock_device,
        telemetry,
        commands,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log_router::Verbosity;
    use crate::core::scheduler::MAX_TASKS;
    use crate::core::traits::MockTime;
    use crate::platform::mock::{mock_uart_driver, MockUart};
    use crate::subsystems::acquisition::Channel;

    type Console = heapless::Vec<u8, 512>;
    type TestComputer<'a> = FlightComputer<'a, MockUart, Console>;

    fn computer() -> TestComputer<'static> {
        let uart = mock_uart_driver(UartConfig::default(), 256).unwrap();
        let mut log = LogRouter::new();
        log.open(Console::new()).unwrap();
        FlightComputer::open(uart, log, &DaqConfig::default()).unwrap()
    }

    fn inject(ctx: &mut TestComputer<'_>, bytes: &[u8]) {
        ctx.radio
            .uart()
            .unwrap()
            .with_port(|port| port.inject_rx_data(bytes));
    }

    fn noop(_: &mut Scheduler<TestComputer<'static>, MockTime>, _: &mut TestComputer<'static>, _: Invocation) {}

    #[test]
    fn install_registers_three_tasks() {
        let mut scheduler: Scheduler<TestComputer<'_>, MockTime> = Scheduler::new(MockTime::new());

        let tasks = install(&mut scheduler, &DaqConfig::default()).unwrap();
        assert_eq!(scheduler.task_count(), 3);
        assert!(scheduler.is_live(tasks.mock_device));
        assert!(scheduler.is_live(tasks.telemetry));
        assert!(scheduler.is_live(tasks.commands));
    }

    #[test]
    fn install_unwinds_on_full_pool() {
        let mut scheduler: Scheduler<TestComputer<'static>, MockTime> =
            Scheduler::new(MockTime::new());
        // room for the mock device and telemetry, not the command poll
        for _ in 0..MAX_TASKS - 2 {
            scheduler.create_task(noop, 0, 0, 1000, true, 2).unwrap();
        }

        assert_eq!(
            install(&mut scheduler, &DaqConfig::default()),
            Err(SchedulerError::PoolFull)
        );
        assert_eq!(scheduler.task_count(), MAX_TASKS - 2);
    }

    #[test]
    fn failed_unwind_keeps_last_task() {
        let mut scheduler: Scheduler<TestComputer<'static>, MockTime> =
            Scheduler::new(MockTime::new());
        let only = scheduler.create_task(noop, 0, 0, 1000, true, 2).unwrap();

        unwind(&mut scheduler, only);
        assert!(scheduler.is_live(only));
    }

    #[test]
    fn configured_baud_rates_reach_the_uarts() {
        let config = DaqConfig {
            radio_baud: 38_400,
            console_baud: 9_600,
            ..DaqConfig::default()
        };

        let console = open_console(mock_uart_driver(UartConfig::default(), 64).unwrap(), &config)
            .unwrap();
        let ctx = FlightComputer::open(
            mock_uart_driver(UartConfig::default(), 64).unwrap(),
            console,
            &config,
        )
        .unwrap();

        let radio = ctx.radio.uart().unwrap();
        assert_eq!(radio.with_port(|port| port.config().baud_rate), 38_400);
        assert_eq!(radio.config().data_bits, 8);
        let console = ctx.log.sink().unwrap();
        assert_eq!(console.with_port(|port| port.config().baud_rate), 9_600);
        assert!(ctx.log.is_open());
    }

    #[test]
    fn rejected_console_baud_is_reported() {
        let config = DaqConfig {
            console_baud: 0,
            ..DaqConfig::default()
        };
        assert!(matches!(
            open_console(mock_uart_driver(UartConfig::default(), 64).unwrap(), &config),
            Err(PlatformError::Uart(_))
        ));
    }

    #[test]
    fn first_pass_sends_packet_after_mock_fill() {
        let mut scheduler = Scheduler::new(MockTime::new());
        let mut ctx = computer();
        let tasks = install(&mut scheduler, &DaqConfig::default()).unwrap();

        // telemetry (priority 1) runs before the mock device (priority 2)
        assert_eq!(scheduler.run(&mut ctx).unwrap().executed, Some(tasks.telemetry));
        assert_eq!(ctx.last_packet(), b"0,,,,,,\n");
        assert_eq!(scheduler.run(&mut ctx).unwrap().executed, Some(tasks.mock_device));
        assert!(ctx.buffers.is_new(Channel::Pitot));

        scheduler.clock().advance_ms(500);
        ctx.radio.uart().unwrap().line().on_tx_complete();
        while scheduler.run(&mut ctx).unwrap().executed != Some(tasks.telemetry) {}

        assert!(ctx.last_packet().starts_with(b"500,2048,99325,167.8,"));
        assert_eq!(ctx.packets_sent(), 2);
    }

    #[test]
    fn commands_from_radio_reach_log_router() {
        let mut scheduler = Scheduler::new(MockTime::new());
        let mut ctx = computer();
        let tasks = install(&mut scheduler, &DaqConfig::default()).unwrap();

        inject(&mut ctx, b"#LV4#LQ1");
        while scheduler.run(&mut ctx).unwrap().executed != Some(tasks.commands) {}
        assert_eq!(ctx.log.verbosity(), Verbosity::CRITICAL);

        scheduler.clock().advance_ms(20);
        while scheduler.run(&mut ctx).unwrap().executed != Some(tasks.commands) {}
        // rejected command is a warning, filtered out by the new verbosity
        assert!(ctx.log.sink().unwrap().is_empty());

        ctx.log.set_verbosity(Verbosity::all()).unwrap();
        inject(&mut ctx, b"#XX");
        scheduler.clock().advance_ms(20);
        while scheduler.run(&mut ctx).unwrap().executed != Some(tasks.commands) {}
        assert_eq!(
            ctx.log.sink().unwrap().as_slice(),
            b"WARNING: command rejected: Unknown command XX\n"
        );
    }

    #[test]
    fn closed_radio_is_reported() {
        let mut scheduler = Scheduler::new(MockTime::new());
        let mut log = LogRouter::new();
        log.open(Console::new()).unwrap();
        let mut ctx: TestComputer<'_> = FlightComputer::new(Xbee::new(), log);
        let tasks = install(&mut scheduler, &DaqConfig::default()).unwrap();

        assert_eq!(scheduler.run(&mut ctx).unwrap().executed, Some(tasks.telemetry));
        assert_eq!(ctx.packets_sent(), 0);
        assert_eq!(
            ctx.log.sink().unwrap().as_slice(),
            b"CRITICAL: radio link closed\n"
        );
    }
}
