//! Host-facing registration entry point
//!
//! The host hands over dynamically typed values. This module checks that the
//! first argument is a function and adapts it into a [`PauseObserver`] that
//! receives `(startTimestamp, durationMs, gcType, gcFlags)` positionally.

use chrono::{DateTime, Utc};
use gcpause_core::{epoch_seconds, GcFlags, GcPauseError, GcType, Result};
use std::rc::Rc;
use tracing::debug;

use crate::registry::{PauseObserver, Profiler};

/// Message reported when registration gets no callable
pub const CALLBACK_REQUIRED: &str = "Must provide a callback function to the profiler.";

/// A callable host value
pub trait HostFunction {
    fn call(&self, args: &[HostValue]);
}

impl<F: Fn(&[HostValue])> HostFunction for F {
    fn call(&self, args: &[HostValue]) {
        self(args)
    }
}

/// Dynamically typed value crossing the host boundary
#[derive(Clone)]
pub enum HostValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Integer(i64),
    String(String),
    Function(Rc<dyn HostFunction>),
}

impl HostValue {
    pub fn function(f: impl HostFunction + 'static) -> Self {
        Self::Function(Rc::new(f))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Self::Function(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) | Self::Integer(_) => "number",
            Self::String(_) => "string",
            Self::Function(_) => "function",
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl std::fmt::Debug for HostValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
            Self::Integer(i) => write!(f, "{}", i),
            Self::String(s) => write!(f, "{:?}", s),
            Self::Function(_) => write!(f, "[Function]"),
        }
    }
}

struct FunctionObserver {
    function: Rc<dyn HostFunction>,
}

impl PauseObserver for FunctionObserver {
    fn on_pause(
        &self,
        start_timestamp: DateTime<Utc>,
        duration_ms: f64,
        gc_type: GcType,
        gc_flags: GcFlags,
    ) {
        self.function.call(&[
            HostValue::Number(epoch_seconds(start_timestamp)),
            HostValue::Number(duration_ms),
            HostValue::Integer(i64::from(gc_type.code())),
            HostValue::Integer(i64::from(gc_flags.bits())),
        ]);
    }
}

/// `loadProfiler(callback)`
///
/// Fails with [`GcPauseError::InvalidArgument`] when no argument is given or
/// the first one is not a function; nothing is installed in that case.
pub fn load_profiler(profiler: &Profiler, args: &[HostValue]) -> Result<()> {
    match args.first() {
        Some(HostValue::Function(function)) => {
            profiler.register(Rc::new(FunctionObserver {
                function: Rc::clone(function),
            }));
            Ok(())
        }
        other => {
            debug!(
                "loadProfiler rejected argument of type {}",
                other.map_or("none", HostValue::type_name)
            );
            Err(GcPauseError::InvalidArgument(CALLBACK_REQUIRED.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SimulatedCollector, TurnQueue};
    use chrono::TimeZone;
    use gcpause_clock::ManualClock;
    use std::cell::RefCell;

    fn profiler() -> (Rc<SimulatedCollector>, Rc<TurnQueue>, ManualClock, Profiler) {
        let collector = Rc::new(SimulatedCollector::new());
        let queue = Rc::new(TurnQueue::new());
        let clock = ManualClock::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        let profiler = Profiler::builder(collector.clone(), queue.clone())
            .clock(clock.clone())
            .wall_clock(clock.clone())
            .build();
        (collector, queue, clock, profiler)
    }

    #[test]
    fn test_rejects_missing_or_non_callable() {
        let (collector, _queue, _clock, profiler) = profiler();

        for args in [
            vec![],
            vec![HostValue::Undefined],
            vec![HostValue::Number(3.0)],
            vec![HostValue::String("cb".to_string())],
        ] {
            let err = load_profiler(&profiler, &args).unwrap_err();
            assert!(matches!(err, GcPauseError::InvalidArgument(ref m) if m == CALLBACK_REQUIRED));
        }

        assert!(!profiler.hooks_installed());
        assert_eq!(collector.installed_hook_sets(), 0);
    }

    #[test]
    fn test_callback_receives_positional_arguments() {
        let (collector, queue, clock, profiler) = profiler();
        let calls: Rc<RefCell<Vec<Vec<HostValue>>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = calls.clone();

        load_profiler(
            &profiler,
            &[HostValue::function(move |args: &[HostValue]| {
                sink.borrow_mut().push(args.to_vec());
            })],
        )
        .unwrap();

        collector
            .collect(GcType::MARK_SWEEP_COMPACT, GcFlags::FORCED, || {
                clock.advance_millis(7.5)
            })
            .unwrap();
        queue.run_until_idle();

        let calls = calls.borrow();
        assert_eq!(calls.len(), 1);
        let args = &calls[0];
        assert_eq!(args.len(), 4);
        assert_eq!(args[0].as_f64(), Some(1_700_000_000.0));
        assert!((args[1].as_f64().unwrap() - 7.5).abs() < 1e-9);
        assert_eq!(args[2].as_i64(), Some(2));
        assert_eq!(args[3].as_i64(), Some(4));
    }

    #[test]
    fn test_extra_arguments_are_ignored() {
        let (collector, _queue, _clock, profiler) = profiler();
        load_profiler(
            &profiler,
            &[HostValue::function(|_: &[HostValue]| {}), HostValue::Null],
        )
        .unwrap();
        assert_eq!(collector.installed_hook_sets(), 1);
    }

    #[test]
    fn test_host_value_debug() {
        assert_eq!(format!("{:?}", HostValue::function(|_: &[HostValue]| {})), "[Function]");
        assert_eq!(format!("{:?}", HostValue::Integer(3)), "3");
    }
}
