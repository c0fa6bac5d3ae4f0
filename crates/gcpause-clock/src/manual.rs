//! Hand-driven clock for deterministic tests and simulations

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use crate::source::{MonotonicClock, TimerMark, WallClock};

/// Clock that only moves when told to
///
/// Clones share the same underlying time, so a test can hold one handle and
/// give another to the code under test. Monotonic and wall time are tracked
/// separately: [`advance`](Self::advance) moves both,
/// [`set_wall`](Self::set_wall) jumps the wall clock alone, the way an NTP
/// correction would.
#[derive(Debug, Clone)]
pub struct ManualClock {
    nanos: Rc<Cell<u64>>,
    wall: Rc<Cell<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(wall: DateTime<Utc>) -> Self {
        Self {
            nanos: Rc::new(Cell::new(0)),
            wall: Rc::new(Cell::new(wall)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let nanos = by.as_nanos().min(u64::MAX as u128) as u64;
        self.nanos.set(self.nanos.get().saturating_add(nanos));

        let wall = self.wall.get();
        let step = ChronoDuration::from_std(by).unwrap_or(ChronoDuration::zero());
        self.wall.set(wall.checked_add_signed(step).unwrap_or(wall));
    }

    pub fn advance_millis(&self, ms: f64) {
        let nanos = (ms.max(0.0) * 1_000_000.0).round() as u64;
        self.advance(Duration::from_nanos(nanos));
    }

    /// Move the wall clock without touching monotonic time
    pub fn set_wall(&self, wall: DateTime<Utc>) {
        self.wall.set(wall);
    }

    pub fn elapsed_nanos(&self) -> u64 {
        self.nanos.get()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl MonotonicClock for ManualClock {
    fn now(&self) -> TimerMark {
        TimerMark::from_nanos(self.nanos.get())
    }
}

impl WallClock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.wall.get()
    }
}
