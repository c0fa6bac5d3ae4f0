//! Event capture inside the collector's restricted context
//!
//! The hooks here run on the collector's stack. They take timestamps, build
//! the [`GcEvent`] and hand it to the [`Dispatcher`]; nothing else. Observer
//! code never runs from here.

use chrono::{DateTime, Utc};
use gcpause_clock::{MonotonicClock, PauseTimer, WallClock};
use gcpause_core::{GcEvent, GcFlags, GcPauseError, GcType, ProfilerConfig, Result};
use std::cell::Cell;
use tracing::{error, trace, warn};

use crate::dispatcher::Dispatcher;
use crate::host::CollectorHooks;

#[derive(Debug, Clone, Copy)]
struct PendingPause {
    start_timestamp: DateTime<Utc>,
    kind: GcType,
}

/// Per-host capture state shared by the before and after hooks
pub struct PauseCapture {
    timer: PauseTimer<Box<dyn MonotonicClock>>,
    wall: Box<dyn WallClock>,
    pending: Cell<Option<PendingPause>>,
    dispatcher: Dispatcher,
    halted: Cell<bool>,
    captured: Cell<u64>,
    config: ProfilerConfig,
}

impl PauseCapture {
    pub(crate) fn new(
        clock: Box<dyn MonotonicClock>,
        wall: Box<dyn WallClock>,
        dispatcher: Dispatcher,
        config: ProfilerConfig,
    ) -> Self {
        Self {
            timer: PauseTimer::new(clock),
            wall,
            pending: Cell::new(None),
            dispatcher,
            halted: Cell::new(false),
            captured: Cell::new(0),
            config,
        }
    }

    /// True once a contract violation or lost delivery has stopped capture for good
    pub fn is_halted(&self) -> bool {
        self.halted.get()
    }

    /// True between a before hook and its after hook
    pub fn is_pause_open(&self) -> bool {
        self.pending.get().is_some()
    }

    /// Pauses captured and handed to the dispatcher so far
    pub fn captured(&self) -> u64 {
        self.captured.get()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    fn ensure_running(&self) -> Result<()> {
        if self.halted.get() {
            return Err(GcPauseError::IntegrityViolation(
                "pause capture halted after an earlier integrity violation".to_string(),
            ));
        }
        Ok(())
    }

    fn halt(&self, message: String) -> GcPauseError {
        self.halted.set(true);
        error!("{}; pause capture halted", message);
        GcPauseError::IntegrityViolation(message)
    }
}

impl CollectorHooks for PauseCapture {
    fn on_before_collection(&self, kind: GcType, flags: GcFlags) -> Result<()> {
        self.ensure_running()?;

        if self.config.trace_hooks {
            trace!(kind = %kind, flags = flags.bits(), "before collection");
        }

        let pause = PendingPause {
            start_timestamp: WallClock::now(&self.wall),
            kind,
        };
        if let Some(previous) = self.pending.replace(Some(pause)) {
            warn!(
                "Collection {} started while {} had not ended; discarding the earlier mark",
                kind, previous.kind
            );
        }
        self.timer.start_timer();
        Ok(())
    }

    fn on_after_collection(&self, kind: GcType, flags: GcFlags) -> Result<()> {
        self.ensure_running()?;

        let duration_ms = self.timer.end_timer();
        let (pause, duration_ms) = match (self.pending.take(), duration_ms) {
            (Some(pause), Some(duration_ms)) => (pause, duration_ms),
            _ => {
                return Err(self.halt(format!(
                    "after-collection hook for {} fired without a matching before-collection hook",
                    kind
                )))
            }
        };

        if self.config.trace_hooks {
            trace!(kind = %kind, flags = flags.bits(), duration_ms, "after collection");
        }
        if let Some(threshold) = self.config.slow_pause_ms {
            if duration_ms > threshold {
                warn!(
                    "Slow {} pause: {:.3} ms (threshold {:.3} ms)",
                    kind, duration_ms, threshold
                );
            }
        }

        let event = GcEvent::new(pause.start_timestamp, duration_ms, kind, flags);
        if let Err(e) = self.dispatcher.enqueue(event) {
            return Err(self.halt(format!(
                "delivery of the {} pause could not be scheduled ({})",
                kind, e
            )));
        }
        self.captured.set(self.captured.get() + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{DeferredWork, TaskScheduler};
    use crate::registry::ObserverHandle;
    use crate::TurnQueue;
    use chrono::TimeZone;
    use gcpause_clock::ManualClock;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn build_capture(
        clock: &ManualClock,
        scheduler: Rc<dyn TaskScheduler>,
        observers: Rc<ObserverHandle>,
        config: ProfilerConfig,
    ) -> PauseCapture {
        PauseCapture::new(
            Box::new(clock.clone()),
            Box::new(clock.clone()),
            Dispatcher::new(scheduler, observers),
            config,
        )
    }

    fn capture_with(clock: &ManualClock, queue: &Rc<TurnQueue>) -> PauseCapture {
        build_capture(
            clock,
            queue.clone(),
            Rc::new(ObserverHandle::new()),
            ProfilerConfig::default(),
        )
    }

    struct ClosedScheduler;

    impl TaskScheduler for ClosedScheduler {
        fn submit(&self, _work: Box<dyn DeferredWork>) -> Result<()> {
            Err(GcPauseError::Scheduler("closed".to_string()))
        }
    }

    #[test]
    fn test_hook_pair_enqueues_one_event() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
        let queue = Rc::new(TurnQueue::new());
        let capture = capture_with(&clock, &queue);

        capture.on_before_collection(GcType::SCAVENGE, GcFlags::NONE).unwrap();
        assert!(capture.is_pause_open());
        clock.advance_millis(4.0);
        capture.on_after_collection(GcType::SCAVENGE, GcFlags::NONE).unwrap();

        assert!(!capture.is_pause_open());
        assert_eq!(capture.captured(), 1);
        assert_eq!(queue.pending(), 1);
        assert_eq!(capture.dispatcher().in_flight(), 1);
    }

    #[test]
    fn test_after_without_before_halts() {
        let clock = ManualClock::default();
        let queue = Rc::new(TurnQueue::new());
        let capture = capture_with(&clock, &queue);

        let err = capture
            .on_after_collection(GcType::SCAVENGE, GcFlags::NONE)
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(capture.is_halted());
        assert_eq!(queue.pending(), 0);

        // Every later hook is refused
        assert!(capture
            .on_before_collection(GcType::SCAVENGE, GcFlags::NONE)
            .is_err());
        assert!(capture
            .on_after_collection(GcType::SCAVENGE, GcFlags::NONE)
            .is_err());
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_second_after_hook_is_a_violation() {
        let clock = ManualClock::default();
        let queue = Rc::new(TurnQueue::new());
        let capture = capture_with(&clock, &queue);

        capture.on_before_collection(GcType::SCAVENGE, GcFlags::NONE).unwrap();
        capture.on_after_collection(GcType::SCAVENGE, GcFlags::NONE).unwrap();
        assert!(capture
            .on_after_collection(GcType::SCAVENGE, GcFlags::NONE)
            .is_err());
        assert_eq!(queue.pending(), 1);
    }

    #[test]
    fn test_restarted_pause_is_not_a_violation() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let clock = ManualClock::new(t0);
        let queue = Rc::new(TurnQueue::new());
        let capture = capture_with(&clock, &queue);

        capture.on_before_collection(GcType::SCAVENGE, GcFlags::NONE).unwrap();
        clock.advance_millis(10.0);
        capture
            .on_before_collection(GcType::MARK_SWEEP_COMPACT, GcFlags::NONE)
            .unwrap();
        clock.advance_millis(1.0);
        capture
            .on_after_collection(GcType::MARK_SWEEP_COMPACT, GcFlags::NONE)
            .unwrap();

        assert_eq!(capture.captured(), 1);
        assert!(!capture.is_halted());
    }

    #[test]
    fn test_unschedulable_delivery_halts_capture() {
        let clock = ManualClock::default();
        let capture = build_capture(
            &clock,
            Rc::new(ClosedScheduler),
            Rc::new(ObserverHandle::new()),
            ProfilerConfig::default(),
        );

        capture.on_before_collection(GcType::SCAVENGE, GcFlags::NONE).unwrap();
        clock.advance_millis(2.0);
        let err = capture
            .on_after_collection(GcType::SCAVENGE, GcFlags::NONE)
            .unwrap_err();

        assert!(err.is_fatal());
        assert!(capture.is_halted());
        assert_eq!(capture.captured(), 0);
        assert_eq!(capture.dispatcher().in_flight(), 0);
        assert!(capture
            .on_before_collection(GcType::SCAVENGE, GcFlags::NONE)
            .is_err());
    }

    #[test]
    fn test_slow_pause_is_still_delivered() {
        let clock = ManualClock::default();
        let queue = Rc::new(TurnQueue::new());
        let observers = Rc::new(ObserverHandle::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        observers.replace(Rc::new(
            move |_: DateTime<Utc>, ms: f64, _: GcType, _: GcFlags| sink.borrow_mut().push(ms),
        ));
        let capture = build_capture(
            &clock,
            queue.clone(),
            observers,
            ProfilerConfig {
                slow_pause_ms: Some(1.0),
                trace_hooks: true,
            },
        );

        for ms in [0.5, 5.0] {
            capture.on_before_collection(GcType::SCAVENGE, GcFlags::NONE).unwrap();
            clock.advance_millis(ms);
            capture.on_after_collection(GcType::SCAVENGE, GcFlags::NONE).unwrap();
        }
        queue.run_until_idle();

        assert_eq!(capture.captured(), 2);
        assert_eq!(*seen.borrow(), vec![0.5, 5.0]);
    }
}
