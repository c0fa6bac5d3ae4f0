//! Platform monotonic backends
//!
//! Unix reads `CLOCK_MONOTONIC` directly. Everything else goes through
//! `std::time::Instant`, which is the performance counter on Windows.

use crate::source::{MonotonicClock, TimerMark};

/// Monotonic clock backed by the platform's native high-resolution counter
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl MonotonicClock for SystemClock {
    fn now(&self) -> TimerMark {
        TimerMark::from_nanos(imp::now_nanos())
    }

    fn resolution_nanos(&self) -> u64 {
        imp::resolution_nanos()
    }
}

#[cfg(unix)]
mod imp {
    fn to_nanos(ts: &libc::timespec) -> u64 {
        (ts.tv_sec as u64)
            .saturating_mul(1_000_000_000)
            .saturating_add(ts.tv_nsec as u64)
    }

    pub(super) fn now_nanos() -> u64 {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: `ts` is a valid, writable timespec for the duration of the call.
        let rc = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
        // Only EINVAL/EFAULT are possible and neither applies here.
        debug_assert_eq!(rc, 0);
        to_nanos(&ts)
    }

    pub(super) fn resolution_nanos() -> u64 {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: as above.
        let rc = unsafe { libc::clock_getres(libc::CLOCK_MONOTONIC, &mut ts) };
        if rc != 0 {
            return 1;
        }
        to_nanos(&ts).max(1)
    }
}

#[cfg(not(unix))]
mod imp {
    use std::sync::OnceLock;
    use std::time::Instant;

    static ANCHOR: OnceLock<Instant> = OnceLock::new();

    pub(super) fn now_nanos() -> u64 {
        let anchor = *ANCHOR.get_or_init(Instant::now);
        anchor.elapsed().as_nanos() as u64
    }

    pub(super) fn resolution_nanos() -> u64 {
        100
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_never_goes_backwards() {
        let clock = SystemClock::new();
        let mut previous = clock.now();
        for _ in 0..10_000 {
            let next = clock.now();
            assert!(next >= previous);
            previous = next;
        }
    }

    #[test]
    fn test_system_clock_measures_sleep() {
        let clock = SystemClock::new();
        let start = clock.now();
        std::thread::sleep(std::time::Duration::from_millis(20));
        let elapsed = start.millis_until(clock.now());
        assert!(elapsed >= 19.0, "elapsed {} ms", elapsed);
    }

    #[test]
    fn test_resolution_is_sub_millisecond() {
        assert!(SystemClock::new().resolution_nanos() < 1_000_000);
    }
}
