//! Start/end pause timer over a monotonic clock

use std::cell::Cell;

use crate::source::{MonotonicClock, TimerMark};

/// Holds at most one outstanding [`TimerMark`]
///
/// `start_timer` overwrites any previous mark. That is only correct while
/// the host never overlaps two pauses.
#[derive(Debug)]
pub struct PauseTimer<C> {
    clock: C,
    mark: Cell<Option<TimerMark>>,
}

impl<C: MonotonicClock> PauseTimer<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            mark: Cell::new(None),
        }
    }

    pub fn start_timer(&self) {
        self.mark.set(Some(self.clock.now()));
    }

    /// Milliseconds since the last `start_timer`, consuming the mark
    ///
    /// Returns `None` when no mark is outstanding.
    pub fn end_timer(&self) -> Option<f64> {
        let start = self.mark.take()?;
        Some(start.millis_until(self.clock.now()))
    }

    pub fn is_running(&self) -> bool {
        self.mark.get().is_some()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
