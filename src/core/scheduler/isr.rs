//! Interrupt-side task requests
//!
//! An interrupt handler never touches the scheduler tables. It posts a
//! request into an [`IsrQueue`], which only holds a critical section for the
//! push itself. The main loop turns pending requests into one-shot tasks at
//! the start of [`Scheduler::run_with`](super::Scheduler::run_with), so a
//! long task callback never delays the interrupt.

use heapless::Deque;

use super::{SchedulerError, TaskCallback, PRIORITY_COUNT};
use crate::core::traits::{CsState, SharedState};

/// Requests an [`IsrQueue`] holds between two scheduler passes
pub const ISR_QUEUE_DEPTH: usize = 8;

/// One-shot task requested from interrupt context
pub(super) struct PendingTask<C, T> {
    pub callback: TaskCallback<C, T>,
    pub event: u32,
    pub argument: usize,
    pub priority: u8,
}

/// Bounded queue of task requests posted by interrupt handlers.
///
/// Const-constructible, so it can live in a `static` next to the
/// interrupt vector that posts into it.
pub struct IsrQueue<C, T> {
    pending: CsState<Deque<PendingTask<C, T>, ISR_QUEUE_DEPTH>>,
}

impl<C, T> IsrQueue<C, T> {
    pub const fn new() -> Self {
        Self {
            pending: CsState::new(Deque::new()),
        }
    }

    /// Post a one-shot task request.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::InvalidPriority`] for a priority outside
    /// `0..PRIORITY_COUNT`, [`SchedulerError::IsrQueueFull`] when
    /// [`ISR_QUEUE_DEPTH`] requests are already waiting.
    pub fn post(
        &self,
        callback: TaskCallback<C, T>,
        event: u32,
        argument: usize,
        priority: u8,
    ) -> Result<(), SchedulerError> {
        if priority as usize >= PRIORITY_COUNT {
            return Err(SchedulerError::InvalidPriority);
        }

        let request = PendingTask {
            callback,
            event,
            argument,
            priority,
        };
        self.pending
            .with_mut(|pending| pending.push_back(request))
            .map_err(|_| SchedulerError::IsrQueueFull)
    }

    /// Requests not yet taken by the scheduler
    pub fn len(&self) -> usize {
        self.pending.with(|pending| pending.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(super) fn take(&self) -> Option<PendingTask<C, T>> {
        self.pending.with_mut(|pending| pending.pop_front())
    }
}

impl<C, T> Default for IsrQueue<C, T> {
    fn default() -> Self {
        Self::new()
    }
}
