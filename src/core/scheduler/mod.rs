//! Cooperative task scheduler
//!
//! A fixed pool of [`MAX_TASKS`] task slots threaded onto intrusive lists:
//!
//! - one ready list per priority (`0` is the highest), FIFO within a priority
//! - one wait list ordered by next due tick (`last_end + interval`)
//! - one free list of unused slots, reused LIFO
//!
//! Each call to [`Scheduler::run`] executes the head of the highest-priority
//! non-empty ready list, then promotes every wait-list task whose due tick
//! has elapsed. Priorities are strict: a low-priority task can starve
//! indefinitely behind a busy high-priority one.
//!
//! New tasks start ready, so a freshly created task runs at the next
//! opportunity regardless of its interval. A repeating task goes to the
//! wait list after each execution; a one-shot task is destroyed.
//!
//! The scheduler tables are plain data owned by the main loop and are never
//! locked. Interrupt handlers post one-shot requests into an [`IsrQueue`]
//! with [`schedule_from_isr`]; [`Scheduler::run_with`] turns them into tasks
//! at the start of the next pass.
//!
//! # Example
//!
//! ```
//! use flight_daq::core::scheduler::{Invocation, Scheduler};
//! use flight_daq::core::traits::MockTime;
//!
//! fn count(_: &mut Scheduler<u32, MockTime>, runs: &mut u32, _: Invocation) {
//!     *runs += 1;
//! }
//!
//! let mut scheduler = Scheduler::new(MockTime::new());
//! let mut runs = 0u32;
//! scheduler.create_task(count, 0, 0, 100, true, 1).unwrap();
//!
//! scheduler.run(&mut runs).unwrap();
//! scheduler.clock().advance_ms(100);
//! scheduler.run(&mut runs).unwrap(); // promotes
//! scheduler.run(&mut runs).unwrap(); // executes
//! assert_eq!(runs, 2);
//! ```

pub mod isr;
pub mod stats;
pub mod task;

use core::fmt;

use crate::core::list::{Cursor, List, ListError};
use crate::core::traits::{Tick, TimeSource};

pub use isr::{IsrQueue, ISR_QUEUE_DEPTH};
pub use stats::{SchedulerStats, TaskStats};
pub use task::{Invocation, TaskCallback, TaskHandle, TaskStatus};

use task::{Queue, TaskSlot};

/// Maximum number of live tasks
pub const MAX_TASKS: usize = 24;

/// Number of priority levels (`0..PRIORITY_COUNT`)
pub const PRIORITY_COUNT: usize = 3;

/// Scheduler errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SchedulerError {
    /// No live task: `run` has nothing to schedule
    NoTasks,
    /// All `MAX_TASKS` slots are in use
    PoolFull,
    /// Priority outside `0..PRIORITY_COUNT`
    InvalidPriority,
    /// Handle refers to a destroyed task
    StaleHandle,
    /// Refused to destroy the last live task
    LastTask,
    /// Interrupt-side request queue is full
    IsrQueueFull,
    /// Internal list corruption
    List(ListError),
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::NoTasks => write!(f, "No live task"),
            SchedulerError::PoolFull => write!(f, "Task pool full"),
            SchedulerError::InvalidPriority => write!(f, "Invalid priority"),
            SchedulerError::StaleHandle => write!(f, "Stale task handle"),
            SchedulerError::LastTask => write!(f, "Cannot destroy the last task"),
            SchedulerError::IsrQueueFull => write!(f, "ISR request queue full"),
            SchedulerError::List(e) => write!(f, "List error: {}", e),
        }
    }
}

impl From<ListError> for SchedulerError {
    fn from(error: ListError) -> Self {
        SchedulerError::List(error)
    }
}

/// Outcome of one [`Scheduler::run`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RunReport {
    /// Task whose callback ran, if any was ready
    pub executed: Option<TaskHandle>,
    /// Tasks moved from the wait list to a ready list
    pub promoted: usize,
    /// Interrupt requests turned into one-shot tasks
    pub accepted: usize,
}

/// Cooperative scheduler over a fixed task pool.
///
/// `C` is the application context handed to every callback, `T` the tick
/// source.
pub struct Scheduler<C, T> {
    slots: [TaskSlot<C, T>; MAX_TASKS],
    free: List<Queue>,
    ready: [List<Queue>; PRIORITY_COUNT],
    wait: List<Queue>,
    live: usize,
    clock: T,
    stats: SchedulerStats,
}

impl<C, T: TimeSource> Scheduler<C, T> {
    /// Create an empty scheduler driven by `clock`
    pub fn new(clock: T) -> Self {
        let mut scheduler = Self {
            slots: core::array::from_fn(|_| TaskSlot::empty()),
            free: List::new(Queue::Free),
            ready: core::array::from_fn(|priority| List::new(Queue::Ready(priority as u8))),
            wait: List::new(Queue::Wait),
            live: 0,
            clock,
            stats: SchedulerStats::default(),
        };

        for index in 0..MAX_TASKS {
            let linked = scheduler.free.push_back(&mut scheduler.slots, index);
            debug_assert!(linked.is_ok());
        }

        scheduler
    }

    /// Tick source
    pub fn clock(&self) -> &T {
        &self.clock
    }

    /// Current tick
    pub fn now(&self) -> Tick {
        self.clock.tick()
    }

    /// Number of live tasks
    pub fn task_count(&self) -> usize {
        self.live
    }

    /// Global statistics
    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Check whether `handle` still refers to a live task
    pub fn is_live(&self, handle: TaskHandle) -> bool {
        self.resolve(handle).is_ok()
    }

    /// Ready/waiting state of a live task
    pub fn status(&self, handle: TaskHandle) -> Option<TaskStatus> {
        let index = self.resolve(handle).ok()?;
        match self.slots[index].queue()? {
            Queue::Ready(_) => Some(TaskStatus::Ready),
            Queue::Wait => Some(TaskStatus::Waiting),
            Queue::Free => None,
        }
    }

    /// Statistics of a live task
    pub fn task_stats(&self, handle: TaskHandle) -> Option<TaskStats> {
        let index = self.resolve(handle).ok()?;
        Some(self.slots[index].stats)
    }

    /// Due tick of the earliest waiting task
    pub fn next_deadline(&self) -> Option<Tick> {
        self.wait.front().map(|index| self.slots[index].due())
    }

    /// Register a task.
    ///
    /// The task starts ready in the `priority` list with a last completion
    /// tick of zero. `interval` is in ticks; with `repeat == false` the task
    /// is destroyed after its first execution.
    pub fn create_task(
        &mut self,
        callback: TaskCallback<C, T>,
        event: u32,
        argument: usize,
        interval: u32,
        repeat: bool,
        priority: u8,
    ) -> Result<TaskHandle, SchedulerError> {
        if priority as usize >= PRIORITY_COUNT {
            return Err(SchedulerError::InvalidPriority);
        }

        let index = self.free.front().ok_or(SchedulerError::PoolFull)?;
        self.free.remove(&mut self.slots, index)?;

        let slot = &mut self.slots[index];
        slot.callback = Some(callback);
        slot.event = event;
        slot.argument = argument;
        slot.priority = priority;
        slot.interval = interval;
        slot.repeat = repeat;
        slot.last_end = Tick::ZERO;
        slot.stats.reset();

        self.ready[priority as usize].push_back(&mut self.slots, index)?;
        self.live += 1;

        Ok(self.slots[index].handle(index))
    }

    /// Register a non-repeating task with a zero interval
    pub fn schedule_one_shot(
        &mut self,
        callback: TaskCallback<C, T>,
        event: u32,
        argument: usize,
        priority: u8,
    ) -> Result<TaskHandle, SchedulerError> {
        self.create_task(callback, event, argument, 0, false, priority)
    }

    /// Destroy a task and return its slot to the pool.
    ///
    /// Destroying the last live task is refused with
    /// [`SchedulerError::LastTask`]. A callback may destroy its own task.
    pub fn destroy_task(&mut self, handle: TaskHandle) -> Result<(), SchedulerError> {
        let index = self.resolve(handle)?;
        if self.live == 1 {
            return Err(SchedulerError::LastTask);
        }
        self.retire(index)
    }

    /// Execute at most one ready task, then promote due waiting tasks.
    ///
    /// Callbacks must not call `run` themselves.
    pub fn run(&mut self, ctx: &mut C) -> Result<RunReport, SchedulerError> {
        self.pass(ctx, 0)
    }

    /// Accept pending interrupt requests from `isr`, then [`run`](Self::run).
    ///
    /// Requests are accepted while pool slots are free; the rest stay queued
    /// for a later pass.
    pub fn run_with(&mut self, ctx: &mut C, isr: &IsrQueue<C, T>) -> Result<RunReport, SchedulerError> {
        let accepted = self.accept_pending(isr)?;
        self.pass(ctx, accepted)
    }

    /// Call [`run`](Self::run) until it fails, and return that error.
    ///
    /// This is the body of the firmware main loop. With at least one
    /// repeating task it never returns.
    pub fn run_forever(&mut self, ctx: &mut C) -> SchedulerError {
        loop {
            if let Err(e) = self.run(ctx) {
                return e;
            }
        }
    }

    /// [`run_forever`](Self::run_forever) with interrupt requests from `isr`
    pub fn run_forever_with(&mut self, ctx: &mut C, isr: &IsrQueue<C, T>) -> SchedulerError {
        loop {
            if let Err(e) = self.run_with(ctx, isr) {
                return e;
            }
        }
    }

    fn pass(&mut self, ctx: &mut C, accepted: usize) -> Result<RunReport, SchedulerError> {
        if self.live == 0 {
            return Err(SchedulerError::NoTasks);
        }
        self.stats.passes = self.stats.passes.saturating_add(1);

        let executed = match self.ready.iter().find_map(|list| list.front()) {
            Some(index) => Some(self.execute(index, ctx)?),
            None => None,
        };
        let promoted = self.promote_due()?;

        Ok(RunReport {
            executed,
            promoted,
            accepted,
        })
    }

    /// Turn queued interrupt requests into ready one-shot tasks
    fn accept_pending(&mut self, isr: &IsrQueue<C, T>) -> Result<usize, SchedulerError> {
        let mut accepted = 0;

        // Only dequeue when a slot is free, so no request is ever dropped
        while !self.free.is_empty() {
            let Some(request) = isr.take() else {
                break;
            };
            self.schedule_one_shot(
                request.callback,
                request.event,
                request.argument,
                request.priority,
            )?;
            accepted += 1;
        }

        Ok(accepted)
    }

    fn execute(&mut self, index: usize, ctx: &mut C) -> Result<TaskHandle, SchedulerError> {
        let slot = &self.slots[index];
        let handle = slot.handle(index);
        let callback = slot.callback.ok_or(SchedulerError::StaleHandle)?;
        let invocation = Invocation {
            handle,
            event: slot.event,
            argument: slot.argument,
        };

        let start = self.clock.tick();
        callback(self, ctx, invocation);
        let end = self.clock.tick();
        self.stats.executions = self.stats.executions.saturating_add(1);

        // Destroyed by its own callback
        if !self.is_live(handle) {
            return Ok(handle);
        }

        let slot = &mut self.slots[index];
        slot.last_end = end;
        slot.stats.record_execution(end.wrapping_since(start));

        if slot.repeat {
            self.unlink(index)?;
            self.wait.add_ordered(&mut self.slots, index, |existing, new| {
                existing.due().cmp_wrapping(new.due())
            })?;
        } else {
            self.retire(index)?;
            self.stats.retired = self.stats.retired.saturating_add(1);
        }

        Ok(handle)
    }

    /// Move every elapsed task at the head of the wait list to its ready list
    fn promote_due(&mut self) -> Result<usize, SchedulerError> {
        let now = self.clock.tick();
        let mut promoted = 0;

        while let Some(index) = self.wait.front() {
            let due = self.slots[index].due();
            if !due.is_at_or_before(now) {
                break;
            }

            self.wait.remove(&mut self.slots, index)?;
            let slot = &mut self.slots[index];
            slot.stats.record_promotion(now.wrapping_since(due));
            let priority = slot.priority as usize;
            self.ready[priority].push_back(&mut self.slots, index)?;
            promoted += 1;
        }

        self.stats.promotions = self.stats.promotions.saturating_add(promoted as u64);
        Ok(promoted)
    }

    fn resolve(&self, handle: TaskHandle) -> Result<usize, SchedulerError> {
        let index = handle.index();
        match self.slots.get(index) {
            Some(slot) if slot.is_live() && slot.generation == handle.generation => Ok(index),
            _ => Err(SchedulerError::StaleHandle),
        }
    }

    fn unlink(&mut self, index: usize) -> Result<(), SchedulerError> {
        let list = match self.slots[index].queue() {
            None => return Ok(()),
            Some(Queue::Free) => &mut self.free,
            Some(Queue::Ready(priority)) => &mut self.ready[priority as usize],
            Some(Queue::Wait) => &mut self.wait,
        };
        list.remove(&mut self.slots, index)?;
        Ok(())
    }

    fn retire(&mut self, index: usize) -> Result<(), SchedulerError> {
        self.unlink(index)?;

        let slot = &mut self.slots[index];
        slot.callback = None;
        slot.event = 0;
        slot.argument = 0;
        slot.generation = slot.generation.wrapping_add(1);

        self.free.add_after(&mut self.slots, index, Cursor::Head)?;
        self.live -= 1;
        Ok(())
    }
}

impl<C, T> fmt::Debug for Scheduler<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ready: [usize; PRIORITY_COUNT] = core::array::from_fn(|p| self.ready[p].len());
        f.debug_struct("Scheduler")
            .field("live", &self.live)
            .field("ready", &ready)
            .field("waiting", &self.wait.len())
            .field("stats", &self.stats)
            .finish()
    }
}

/// Schedule a one-shot task from interrupt context.
///
/// The request waits in `isr` until the main loop's next
/// [`Scheduler::run_with`]; the task handle only exists from then on.
/// Never blocks on a running task callback.
pub fn schedule_from_isr<C, T>(
    isr: &IsrQueue<C, T>,
    callback: TaskCallback<C, T>,
    event: u32,
    argument: usize,
    priority: u8,
) -> Result<(), SchedulerError> {
    isr.post(callback, event, argument, priority)
}
