//! Shared state access across the main loop and interrupt handlers.
//!
//! The scheduler tables and the acquisition buffers are plain data owned by
//! the main loop. When an interrupt handler also needs to touch them (the
//! I2C completion path schedules a one-shot task), access goes through
//! [`SharedState::with_mut`], which runs the closure inside a critical
//! section on target.

use core::cell::RefCell;

/// Platform-agnostic synchronized state access.
///
/// - [`CsState<T>`] guards with a bare `critical_section::Mutex`
/// - `EmbassyState<T>` uses Embassy's blocking mutex (`embassy` feature)
/// - [`MockState<T>`] uses a `RefCell` for single-threaded host tests
///
/// # Example
///
/// ```
/// use flight_daq::core::traits::{MockState, SharedState};
///
/// struct Dropped {
///     bytes: u32,
/// }
///
/// fn record<S: SharedState<Dropped>>(state: &S, n: u32) -> u32 {
///     state.with_mut(|d| {
///         d.bytes += n;
///         d.bytes
///     })
/// }
///
/// let state = MockState::new(Dropped { bytes: 0 });
/// assert_eq!(record(&state, 3), 3);
/// ```
pub trait SharedState<T> {
    /// Access state immutably.
    fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R;

    /// Access state mutably.
    fn with_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R;
}

// ============================================================================
// Critical-section Implementation
// ============================================================================

/// State guarded by a global critical section.
///
/// Usable from interrupt handlers and the main loop alike; every access
/// masks interrupts for the duration of the closure. Can live in a
/// `static` because `critical_section::Mutex` is `Sync`.
pub struct CsState<T> {
    inner: critical_section::Mutex<RefCell<T>>,
}

impl<T> CsState<T> {
    /// Wrap `value`. Const so it can initialize a `static`.
    pub const fn new(value: T) -> Self {
        Self {
            inner: critical_section::Mutex::new(RefCell::new(value)),
        }
    }

    /// Consume the guard and return the value.
    pub fn into_inner(self) -> T {
        self.inner.into_inner().into_inner()
    }
}

impl<T> SharedState<T> for CsState<T> {
    fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        critical_section::with(|cs| f(&self.inner.borrow_ref(cs)))
    }

    fn with_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }
}

// ============================================================================
// Embassy Implementation
// ============================================================================

#[cfg(feature = "embassy")]
use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};

/// Embassy-based synchronized state using critical-section Mutex.
#[cfg(feature = "embassy")]
pub struct EmbassyState<T> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<T>>,
}

#[cfg(feature = "embassy")]
impl<T> EmbassyState<T> {
    /// Creates a new `EmbassyState` wrapping the given value.
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(value)),
        }
    }
}

#[cfg(feature = "embassy")]
impl<T> SharedState<T> for EmbassyState<T> {
    fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        self.inner.lock(|cell| f(&cell.borrow()))
    }

    fn with_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }
}

// ============================================================================
// Mock Implementation (always available for testing)
// ============================================================================

/// Mock synchronized state using RefCell for single-threaded testing.
///
/// # Panics
///
/// Panics if borrowing rules are violated (e.g. calling `with_mut` while
/// `with` is active), which indicates a bug in the test code.
pub struct MockState<T> {
    inner: RefCell<T>,
}

impl<T> MockState<T> {
    /// Creates a new `MockState` wrapping the given value.
    pub fn new(value: T) -> Self {
        Self {
            inner: RefCell::new(value),
        }
    }
}

impl<T> SharedState<T> for MockState<T> {
    fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.inner.borrow())
    }

    fn with_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        f(&mut self.inner.borrow_mut())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RxStats {
        received: u32,
        dropped: u32,
    }

    fn on_bytes<S: SharedState<RxStats>>(state: &S, received: u32, dropped: u32) {
        state.with_mut(|s| {
            s.received += received;
            s.dropped += dropped;
        });
    }

    #[test]
    fn mock_state_read_modify_read() {
        let state = MockState::new(RxStats::default());
        on_bytes(&state, 10, 0);
        on_bytes(&state, 4, 2);
        assert_eq!(state.with(|s| s.received), 14);
        assert_eq!(state.with(|s| s.dropped), 2);
    }

    #[test]
    fn cs_state_from_static() {
        static COUNTER: CsState<u32> = CsState::new(0);

        let value = COUNTER.with_mut(|v| {
            *v += 5;
            *v
        });
        assert_eq!(value, 5);
        assert_eq!(COUNTER.with(|v| *v), 5);
    }

    #[test]
    fn cs_state_shared_across_threads() {
        let state = CsState::new(RxStats::default());
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        on_bytes(&state, 1, 0);
                    }
                });
            }
        });
        assert_eq!(state.into_inner().received, 400);
    }

    #[test]
    #[should_panic]
    fn mock_state_double_borrow_panics() {
        let state = MockState::new(0u32);
        state.with(|_v| {
            let _ = state.inner.borrow_mut();
        });
    }
}
