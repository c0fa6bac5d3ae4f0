//! Clock interfaces

use chrono::{DateTime, Utc};
use std::rc::Rc;

/// Opaque monotonic sample
///
/// Only meaningful relative to another mark taken from the same clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerMark {
    nanos: u64,
}

impl TimerMark {
    pub fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    /// Milliseconds from `self` to `later`, zero if `later` is not after `self`
    pub fn millis_until(self, later: TimerMark) -> f64 {
        later.nanos.saturating_sub(self.nanos) as f64 / 1_000_000.0
    }
}

/// Non-decreasing time source immune to wall-clock adjustments
pub trait MonotonicClock {
    /// Take a sample. Successive calls never go backwards.
    fn now(&self) -> TimerMark;

    /// Smallest step this source can distinguish, in nanoseconds
    fn resolution_nanos(&self) -> u64 {
        1
    }
}

impl<C: MonotonicClock + ?Sized> MonotonicClock for Rc<C> {
    fn now(&self) -> TimerMark {
        (**self).now()
    }

    fn resolution_nanos(&self) -> u64 {
        (**self).resolution_nanos()
    }
}

impl<C: MonotonicClock + ?Sized> MonotonicClock for Box<C> {
    fn now(&self) -> TimerMark {
        (**self).now()
    }

    fn resolution_nanos(&self) -> u64 {
        (**self).resolution_nanos()
    }
}

/// Source of wall-clock timestamps for pause start times
pub trait WallClock {
    fn now(&self) -> DateTime<Utc>;
}

impl<W: WallClock + ?Sized> WallClock for Rc<W> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

impl<W: WallClock + ?Sized> WallClock for Box<W> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// The system's real-time clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemWallClock;

impl WallClock for SystemWallClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_until() {
        let start = TimerMark::from_nanos(1_000_000);
        let end = TimerMark::from_nanos(16_500_000);
        assert_eq!(start.millis_until(end), 15.5);
    }

    #[test]
    fn test_millis_until_never_negative() {
        let start = TimerMark::from_nanos(5_000_000);
        let earlier = TimerMark::from_nanos(1_000_000);
        assert_eq!(start.millis_until(earlier), 0.0);
    }
}
