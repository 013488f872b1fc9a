//! Time abstraction for the scheduler tick.
//!
//! The scheduler runs on a millisecond [`Tick`] that wraps at the `u32`
//! boundary. Ordering between ticks is defined through the signed
//! difference, which stays correct across a single wraparound as long as
//! the two ticks are less than 2^31 ms (~24.8 days) apart.

use core::cell::Cell;
use core::cmp::Ordering;

/// Wrapping millisecond counter value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tick(pub u32);

impl Tick {
    /// Tick zero
    pub const ZERO: Tick = Tick(0);

    /// Raw counter value
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// `self + interval`, wrapping at the `u32` boundary
    #[inline]
    pub const fn wrapping_add(self, interval: u32) -> Tick {
        Tick(self.0.wrapping_add(interval))
    }

    /// Ticks elapsed from `earlier` to `self`, wrapping
    #[inline]
    pub const fn wrapping_since(self, earlier: Tick) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }

    /// Check if `self` is strictly after `other`
    #[inline]
    pub const fn is_after(self, other: Tick) -> bool {
        (other.0.wrapping_sub(self.0) as i32) < 0
    }

    /// Check if `self` is strictly before `other`
    #[inline]
    pub const fn is_before(self, other: Tick) -> bool {
        other.is_after(self)
    }

    /// Check if `self` is at or before `other` (a deadline that has elapsed)
    #[inline]
    pub const fn is_at_or_before(self, other: Tick) -> bool {
        !self.is_after(other)
    }

    /// Wraparound-safe three-way comparison
    pub fn cmp_wrapping(self, other: Tick) -> Ordering {
        if self.is_before(other) {
            Ordering::Less
        } else if self.is_after(other) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }
}

/// Platform-agnostic monotonic time source.
///
/// - `EmbassyTime` for embedded targets (`embassy` feature)
/// - [`MockTime`] for host testing with controllable time
pub trait TimeSource {
    /// Milliseconds since system start
    fn now_ms(&self) -> u64;

    /// Microseconds since system start
    fn now_us(&self) -> u64;

    /// Current scheduler tick (milliseconds, wrapping at `u32`)
    fn tick(&self) -> Tick {
        Tick(self.now_ms() as u32)
    }
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }

    fn now_us(&self) -> u64 {
        (**self).now_us()
    }
}

// ============================================================================
// Embassy Implementation
// ============================================================================

/// Time source backed by the Embassy time driver
#[cfg(feature = "embassy")]
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyTime;

#[cfg(feature = "embassy")]
impl TimeSource for EmbassyTime {
    fn now_ms(&self) -> u64 {
        embassy_time::Instant::now().as_millis()
    }

    fn now_us(&self) -> u64 {
        embassy_time::Instant::now().as_micros()
    }
}

// ============================================================================
// Mock Implementation (always available for testing)
// ============================================================================

/// Mock time source with manual advancement.
///
/// # Example
///
/// ```
/// use flight_daq::core::traits::{MockTime, Tick, TimeSource};
///
/// let time = MockTime::new();
/// time.advance_ms(250);
/// assert_eq!(time.tick(), Tick(250));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockTime {
    current_us: Cell<u64>,
}

impl MockTime {
    /// Create a time source starting at 0
    pub fn new() -> Self {
        Self {
            current_us: Cell::new(0),
        }
    }

    /// Create a time source starting at `us`
    pub fn with_initial(us: u64) -> Self {
        Self {
            current_us: Cell::new(us),
        }
    }

    /// Set the absolute time in microseconds
    pub fn set(&self, us: u64) {
        self.current_us.set(us);
    }

    /// Advance by `us` microseconds
    pub fn advance(&self, us: u64) {
        self.current_us.set(self.current_us.get() + us);
    }

    /// Advance by `ms` milliseconds
    pub fn advance_ms(&self, ms: u64) {
        self.advance(ms * 1000);
    }
}

impl TimeSource for MockTime {
    fn now_ms(&self) -> u64 {
        self.current_us.get() / 1000
    }

    fn now_us(&self) -> u64 {
        self.current_us.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_time_advance() {
        let time = MockTime::new();
        time.advance(500_000);
        assert_eq!(time.now_us(), 500_000);
        time.advance_ms(500);
        assert_eq!(time.now_ms(), 1000);
        assert_eq!(time.tick(), Tick(1000));
    }

    #[test]
    fn mock_time_tick_wraps() {
        let time = MockTime::with_initial((u32::MAX as u64) * 1000);
        assert_eq!(time.tick(), Tick(u32::MAX));
        time.advance_ms(1);
        assert_eq!(time.tick(), Tick(0));
    }

    #[test]
    fn tick_ordering_without_wrap() {
        assert!(Tick(10).is_after(Tick(5)));
        assert!(Tick(5).is_before(Tick(10)));
        assert!(!Tick(5).is_after(Tick(5)));
        assert!(Tick(5).is_at_or_before(Tick(5)));
        assert_eq!(Tick(3).cmp_wrapping(Tick(3)), Ordering::Equal);
    }

    #[test]
    fn tick_ordering_across_wrap() {
        let before_wrap = Tick(u32::MAX - 5);
        let after_wrap = before_wrap.wrapping_add(10);
        assert_eq!(after_wrap, Tick(4));

        assert!(after_wrap.is_after(before_wrap));
        assert!(before_wrap.is_before(after_wrap));
        assert_eq!(before_wrap.cmp_wrapping(after_wrap), Ordering::Less);
        assert_eq!(after_wrap.wrapping_since(before_wrap), 10);
    }

    #[test]
    fn tick_half_range_limit() {
        let a = Tick(0);
        assert!(Tick((1 << 31) - 1).is_after(a));
        // Half the range apart is ambiguous: each looks later than the other
        let b = Tick(1 << 31);
        assert!(b.is_after(a));
        assert!(a.is_after(b));
    }
}
