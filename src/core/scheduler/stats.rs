//! Task and scheduler statistics
//!
//! Per-task counters are updated by [`Scheduler::run`](super::Scheduler::run)
//! right after each callback returns. Durations are measured in scheduler
//! ticks (milliseconds), so callbacks shorter than one tick record zero.

/// Runtime statistics for a single task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskStats {
    /// Total number of executions
    pub execution_count: u64,

    /// Duration of the last callback in ticks
    pub last_duration_ticks: u32,

    /// Longest callback observed in ticks
    pub max_duration_ticks: u32,

    /// Ticks between the due time and the last promotion from the wait list
    pub last_promotion_lag_ticks: u32,
}

impl TaskStats {
    /// Record one completed execution lasting `duration_ticks`
    pub fn record_execution(&mut self, duration_ticks: u32) {
        self.execution_count = self.execution_count.saturating_add(1);
        self.last_duration_ticks = duration_ticks;
        if duration_ticks > self.max_duration_ticks {
            self.max_duration_ticks = duration_ticks;
        }
    }

    /// Record how many ticks past its due time a task was promoted
    pub fn record_promotion(&mut self, lag_ticks: u32) {
        self.last_promotion_lag_ticks = lag_ticks;
    }

    /// Reset all statistics to initial state
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Global scheduler statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SchedulerStats {
    /// Calls to `run` that found at least one live task
    pub passes: u64,

    /// Callbacks invoked
    pub executions: u64,

    /// Tasks moved from the wait list back to a ready list
    pub promotions: u64,

    /// One-shot tasks destroyed after completing
    pub retired: u32,
}
