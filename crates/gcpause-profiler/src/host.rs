//! Capabilities the host runtime provides
//!
//! The profiler depends only on these traits. A real embedding implements
//! them against the runtime's collector and event loop; tests use
//! [`SimulatedCollector`](crate::SimulatedCollector) and
//! [`TurnQueue`](crate::TurnQueue).

use gcpause_core::{GcFlags, GcType, Result};
use std::rc::Rc;

/// Lifecycle hooks the host collector fires around every collection
///
/// Both run synchronously on the collector's own stack, inside the
/// restricted context. Implementations must not run observer code there.
pub trait CollectorHooks {
    /// Fired immediately before a collection starts
    fn on_before_collection(&self, kind: GcType, flags: GcFlags) -> Result<()>;

    /// Fired immediately after the matching collection ends
    fn on_after_collection(&self, kind: GcType, flags: GcFlags) -> Result<()>;
}

/// Host collector hook registration
pub trait HostCollector {
    /// Register a hook set. The host fires it around every later collection.
    fn add_collection_hooks(&self, hooks: Rc<dyn CollectorHooks>);
}

/// A unit of deferred work
///
/// The host runs `execute` first and `complete` at a later turn of its loop,
/// outside any collection.
pub trait DeferredWork {
    /// Off-context phase. The profiler has nothing to compute here.
    fn execute(&mut self) {}

    /// Completion phase, run at a safe point
    fn complete(self: Box<Self>);
}

/// Host next-turn scheduling primitive
///
/// `submit` must never run the work inline; it only queues it. Work
/// submitted in order completes in the same order.
pub trait TaskScheduler {
    fn submit(&self, work: Box<dyn DeferredWork>) -> Result<()>;
}

impl<S: TaskScheduler + ?Sized> TaskScheduler for Rc<S> {
    fn submit(&self, work: Box<dyn DeferredWork>) -> Result<()> {
        (**self).submit(work)
    }
}
