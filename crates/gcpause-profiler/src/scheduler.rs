//! Next-turn schedulers
//!
//! Two realisations of [`TaskScheduler`]:
//!
//! - [`TurnQueue`] for hosts that drive their own loop. Work submitted during
//!   a turn runs on the following one.
//! - [`ChannelScheduler`] feeding a [`DeliveryLoop`] that runs as a task on
//!   the current tokio thread.

use gcpause_core::{GcPauseError, Result};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use tokio::sync::mpsc;
use tracing::debug;

use crate::host::{DeferredWork, TaskScheduler};

fn run(mut work: Box<dyn DeferredWork>) {
    work.execute();
    work.complete();
}

/// FIFO queue drained one turn at a time
#[derive(Default)]
pub struct TurnQueue {
    queue: RefCell<VecDeque<Box<dyn DeferredWork>>>,
    turns: Cell<u64>,
}

impl TurnQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the work that was queued when this turn began
    ///
    /// Returns the number of items completed.
    pub fn run_turn(&self) -> usize {
        let batch: Vec<_> = self.queue.borrow_mut().drain(..).collect();
        self.turns.set(self.turns.get() + 1);

        let count = batch.len();
        for work in batch {
            run(work);
        }
        count
    }

    /// Run turns until nothing is left queued
    pub fn run_until_idle(&self) -> usize {
        let mut total = 0;
        while self.pending() > 0 {
            total += self.run_turn();
        }
        total
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn turns(&self) -> u64 {
        self.turns.get()
    }
}

impl TaskScheduler for TurnQueue {
    fn submit(&self, work: Box<dyn DeferredWork>) -> Result<()> {
        self.queue.borrow_mut().push_back(work);
        Ok(())
    }
}

/// Submitting half of a tokio-driven delivery loop
#[derive(Clone)]
pub struct ChannelScheduler {
    tx: mpsc::UnboundedSender<Box<dyn DeferredWork>>,
}

impl ChannelScheduler {
    /// Create a scheduler and the loop that drains it
    pub fn channel() -> (Self, DeliveryLoop) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, DeliveryLoop { rx, completed: 0 })
    }
}

impl TaskScheduler for ChannelScheduler {
    fn submit(&self, work: Box<dyn DeferredWork>) -> Result<()> {
        self.tx
            .send(work)
            .map_err(|_| GcPauseError::Scheduler("delivery loop has shut down".to_string()))
    }
}

/// Receiving half: runs deferred work on the thread that polls it
pub struct DeliveryLoop {
    rx: mpsc::UnboundedReceiver<Box<dyn DeferredWork>>,
    completed: u64,
}

impl DeliveryLoop {
    /// Run work as it arrives until every scheduler handle is dropped
    pub async fn run(&mut self) -> u64 {
        while let Some(work) = self.rx.recv().await {
            run(work);
            self.completed += 1;
        }
        debug!("Delivery loop finished after {} items", self.completed);
        self.completed
    }

    /// Run everything queued right now without waiting
    pub fn run_pending(&mut self) -> usize {
        let mut count = 0;
        while let Ok(work) = self.rx.try_recv() {
            run(work);
            count += 1;
        }
        self.completed += count as u64;
        count
    }

    /// Total items completed by this loop
    pub fn completed(&self) -> u64 {
        self.completed
    }
}
