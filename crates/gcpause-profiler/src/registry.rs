//! Observer registry and hook installation

use chrono::{DateTime, Utc};
use gcpause_clock::{MonotonicClock, SystemClock, SystemWallClock, WallClock};
use gcpause_core::{GcFlags, GcType, ProfilerConfig};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, info};

use crate::capture::PauseCapture;
use crate::dispatcher::Dispatcher;
use crate::host::{CollectorHooks, HostCollector, TaskScheduler};

/// Receives every delivered pause
///
/// Called once per collection, at a turn of the host loop after the
/// collection has finished, never on the collector's stack.
pub trait PauseObserver {
    fn on_pause(
        &self,
        start_timestamp: DateTime<Utc>,
        duration_ms: f64,
        gc_type: GcType,
        gc_flags: GcFlags,
    );
}

impl<F> PauseObserver for F
where
    F: Fn(DateTime<Utc>, f64, GcType, GcFlags),
{
    fn on_pause(
        &self,
        start_timestamp: DateTime<Utc>,
        duration_ms: f64,
        gc_type: GcType,
        gc_flags: GcFlags,
    ) {
        self(start_timestamp, duration_ms, gc_type, gc_flags)
    }
}

/// The single process-wide observer slot
///
/// Last write wins; there is no unregister.
#[derive(Default)]
pub struct ObserverHandle {
    current: RefCell<Option<Rc<dyn PauseObserver>>>,
    generation: Cell<u64>,
}

impl ObserverHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `observer`, returning true when it replaced an earlier one
    pub fn replace(&self, observer: Rc<dyn PauseObserver>) -> bool {
        self.generation.set(self.generation.get() + 1);
        self.current.borrow_mut().replace(observer).is_some()
    }

    /// The observer registered right now
    ///
    /// Hands out a clone so the slot is not borrowed while the observer runs;
    /// an observer may re-register from inside its own callback.
    pub fn current(&self) -> Option<Rc<dyn PauseObserver>> {
        self.current.borrow().clone()
    }

    pub fn is_registered(&self) -> bool {
        self.current.borrow().is_some()
    }

    /// Number of registrations so far
    pub fn generation(&self) -> u64 {
        self.generation.get()
    }
}

/// Builder for [`Profiler`]
pub struct ProfilerBuilder {
    collector: Rc<dyn HostCollector>,
    scheduler: Rc<dyn TaskScheduler>,
    clock: Box<dyn MonotonicClock>,
    wall: Box<dyn WallClock>,
    config: ProfilerConfig,
}

impl ProfilerBuilder {
    pub fn clock(mut self, clock: impl MonotonicClock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn wall_clock(mut self, wall: impl WallClock + 'static) -> Self {
        self.wall = Box::new(wall);
        self
    }

    pub fn config(mut self, config: ProfilerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Profiler {
        let observers = Rc::new(ObserverHandle::new());
        let dispatcher = Dispatcher::new(self.scheduler, Rc::clone(&observers));
        let capture = Rc::new(PauseCapture::new(
            self.clock,
            self.wall,
            dispatcher,
            self.config,
        ));

        Profiler {
            collector: self.collector,
            capture,
            observers,
            installed: Cell::new(false),
        }
    }
}

/// Owns the capture state and installs it with the host collector
///
/// One `Profiler` per host. Registering installs the hooks the first time
/// and only swaps the observer afterwards.
pub struct Profiler {
    collector: Rc<dyn HostCollector>,
    capture: Rc<PauseCapture>,
    observers: Rc<ObserverHandle>,
    installed: Cell<bool>,
}

impl Profiler {
    /// Profiler on the platform clocks with default settings
    pub fn new(collector: Rc<dyn HostCollector>, scheduler: Rc<dyn TaskScheduler>) -> Self {
        Self::builder(collector, scheduler).build()
    }

    pub fn builder(
        collector: Rc<dyn HostCollector>,
        scheduler: Rc<dyn TaskScheduler>,
    ) -> ProfilerBuilder {
        ProfilerBuilder {
            collector,
            scheduler,
            clock: Box::new(SystemClock::new()),
            wall: Box::new(SystemWallClock),
            config: ProfilerConfig::default(),
        }
    }

    /// Make `observer` the sole recipient of future pauses
    ///
    /// Installs the collection hooks on first use. Pauses already queued for
    /// delivery go to whichever observer is registered when they are
    /// dispatched.
    pub fn register(&self, observer: Rc<dyn PauseObserver>) {
        if self.observers.replace(observer) {
            info!("Replaced pause observer");
        }

        if !self.installed.replace(true) {
            let hooks: Rc<dyn CollectorHooks> = self.capture.clone();
            self.collector.add_collection_hooks(hooks);
            debug!("Installed collection hooks");
        }
    }

    pub fn hooks_installed(&self) -> bool {
        self.installed.get()
    }

    pub fn observers(&self) -> &ObserverHandle {
        &self.observers
    }

    pub fn capture(&self) -> &PauseCapture {
        &self.capture
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SimulatedCollector, TurnQueue};

    fn noop() -> Rc<dyn PauseObserver> {
        Rc::new(|_: DateTime<Utc>, _: f64, _: GcType, _: GcFlags| {})
    }

    #[test]
    fn test_observer_handle_last_write_wins() {
        let handle = ObserverHandle::new();
        assert!(!handle.is_registered());

        assert!(!handle.replace(noop()));
        assert!(handle.replace(noop()));
        assert!(handle.is_registered());
        assert_eq!(handle.generation(), 2);
    }

    #[test]
    fn test_register_installs_hooks_once() {
        let collector = Rc::new(SimulatedCollector::new());
        let profiler = Profiler::new(collector.clone(), Rc::new(TurnQueue::new()));

        assert!(!profiler.hooks_installed());
        for _ in 0..5 {
            profiler.register(noop());
        }

        assert!(profiler.hooks_installed());
        assert_eq!(collector.installed_hook_sets(), 1);
        assert_eq!(profiler.observers().generation(), 5);
    }
}
