//! Deferred delivery of captured pauses
//!
//! A pause becomes available inside the collection, but the observer may only
//! run once the collection is over. [`Dispatcher::enqueue`] wraps the event
//! in a one-slot work item and submits it to the host scheduler; the work
//! item's completion phase performs the delivery at the next safe turn.

use gcpause_core::{GcEvent, Result};
use std::cell::Cell;
use std::rc::Rc;
use tracing::debug;

use crate::host::{DeferredWork, TaskScheduler};
use crate::registry::ObserverHandle;

/// What happened to a dispatched event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The registered observer was invoked
    Delivered,
    /// No observer was registered; the event was discarded
    Dropped,
}

/// Hands completed events from the collector to the observer
pub struct Dispatcher {
    scheduler: Rc<dyn TaskScheduler>,
    observers: Rc<ObserverHandle>,
    in_flight: Rc<Cell<usize>>,
}

impl Dispatcher {
    pub fn new(scheduler: Rc<dyn TaskScheduler>, observers: Rc<ObserverHandle>) -> Self {
        Self {
            scheduler,
            observers,
            in_flight: Rc::new(Cell::new(0)),
        }
    }

    /// Schedule delivery of `event` at the host's next safe turn
    ///
    /// Never calls the observer.
    pub fn enqueue(&self, event: GcEvent) -> Result<()> {
        let waiting = self.in_flight.get() + 1;
        self.in_flight.set(waiting);
        if waiting > 1 {
            debug!("{} pauses awaiting delivery", waiting);
        }

        // A refused work item is dropped by the scheduler, which releases its count
        self.scheduler.submit(Box::new(DeliveryWork {
            slot: Some(event),
            observers: Rc::clone(&self.observers),
            in_flight: Rc::clone(&self.in_flight),
        }))
    }

    /// Work items submitted and still held by the scheduler
    pub fn in_flight(&self) -> usize {
        self.in_flight.get()
    }

    /// Invoke the current observer with `event`, then release it
    pub fn dispatch(observers: &ObserverHandle, event: GcEvent) -> DispatchOutcome {
        match observers.current() {
            Some(observer) => {
                observer.on_pause(
                    event.start_timestamp,
                    event.duration_ms,
                    event.gc_type,
                    event.gc_flags,
                );
                DispatchOutcome::Delivered
            }
            None => {
                debug!("No pause observer registered; dropping {} event", event.gc_type);
                DispatchOutcome::Dropped
            }
        }
    }
}

struct DeliveryWork {
    slot: Option<GcEvent>,
    observers: Rc<ObserverHandle>,
    in_flight: Rc<Cell<usize>>,
}

impl DeferredWork for DeliveryWork {
    fn complete(mut self: Box<Self>) {
        let event = self.slot.take();
        let observers = Rc::clone(&self.observers);
        drop(self);

        if let Some(event) = event {
            Dispatcher::dispatch(&observers, event);
        }
    }
}

impl Drop for DeliveryWork {
    fn drop(&mut self) {
        if self.slot.is_some() {
            debug!("Pause work item discarded before delivery");
        }
        self.in_flight.set(self.in_flight.get().saturating_sub(1));
    }
}
