//! Task slots, handles and the callback contract

use super::stats::TaskStats;
use super::Scheduler;
use crate::core::list::{Link, Linked};
use crate::core::traits::Tick;

/// Task callback.
///
/// Receives the scheduler (so it may create or destroy tasks, itself
/// included), the application context and the invocation data the task was
/// registered with.
pub type TaskCallback<C, T> = fn(&mut Scheduler<C, T>, &mut C, Invocation);

/// Data handed to a callback on every execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Invocation {
    /// Handle of the running task
    pub handle: TaskHandle,
    /// Event tag given at creation
    pub event: u32,
    /// Opaque argument given at creation
    pub argument: usize,
}

/// Generation-checked reference to a task slot.
///
/// A handle goes stale as soon as its task is destroyed; a later task
/// reusing the same slot gets a different generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskHandle {
    pub(super) index: u8,
    pub(super) generation: u16,
}

impl TaskHandle {
    /// Slot index inside the pool
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

/// Scheduling state of a live task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TaskStatus {
    /// In a ready list, runs at the next opportunity for its priority
    Ready,
    /// In the wait list until its interval elapses
    Waiting,
}

/// Which scheduler list a slot is linked into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Queue {
    Free,
    Ready(u8),
    Wait,
}

pub(super) struct TaskSlot<C, T> {
    pub callback: Option<TaskCallback<C, T>>,
    pub event: u32,
    pub argument: usize,
    pub priority: u8,
    pub interval: u32,
    pub repeat: bool,
    pub last_end: Tick,
    pub generation: u16,
    pub stats: TaskStats,
    link: Link<Queue>,
}

impl<C, T> TaskSlot<C, T> {
    pub fn empty() -> Self {
        Self {
            callback: None,
            event: 0,
            argument: 0,
            priority: 0,
            interval: 0,
            repeat: false,
            last_end: Tick::ZERO,
            generation: 0,
            stats: TaskStats::default(),
            link: Link::new(),
        }
    }

    /// Tick at which the task becomes ready again
    pub fn due(&self) -> Tick {
        self.last_end.wrapping_add(self.interval)
    }

    pub fn is_live(&self) -> bool {
        self.callback.is_some()
    }

    pub fn queue(&self) -> Option<Queue> {
        self.link.owner()
    }

    pub fn handle(&self, index: usize) -> TaskHandle {
        TaskHandle {
            index: index as u8,
            generation: self.generation,
        }
    }
}

impl<C, T> Linked<Queue> for TaskSlot<C, T> {
    fn link(&self) -> &Link<Queue> {
        &self.link
    }

    fn link_mut(&mut self) -> &mut Link<Queue> {
        &mut self.link
    }
}
