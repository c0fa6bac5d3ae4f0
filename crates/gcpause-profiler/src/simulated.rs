//! In-process stand-in for a host collector

use gcpause_core::{GcFlags, GcType, Result};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::debug;

use crate::host::{CollectorHooks, HostCollector};

/// Stop-the-world collector driven by hand
///
/// Fires every installed hook set around `collect`, strictly serialised on
/// the calling thread.
#[derive(Default)]
pub struct SimulatedCollector {
    hooks: RefCell<Vec<Rc<dyn CollectorHooks>>>,
    collecting: Cell<bool>,
    collections: Cell<u64>,
}

impl SimulatedCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one collection
    ///
    /// Fires the before hooks, runs `pause` (advance a manual clock, sleep,
    /// burn cycles), then fires the after hooks. Stops at the first hook
    /// error and returns it.
    pub fn collect<F: FnOnce()>(&self, kind: GcType, flags: GcFlags, pause: F) -> Result<()> {
        let hooks = self.hooks.borrow().clone();
        self.collecting.set(true);

        let result = (|| -> Result<()> {
            for hook in &hooks {
                hook.on_before_collection(kind, flags)?;
            }
            pause();
            for hook in &hooks {
                hook.on_after_collection(kind, flags)?;
            }
            Ok(())
        })();

        self.collecting.set(false);
        self.collections.set(self.collections.get() + 1);
        result
    }

    /// Fire only the before hooks, as a misbehaving host might
    pub fn fire_before(&self, kind: GcType, flags: GcFlags) -> Result<()> {
        let hooks = self.hooks.borrow().clone();
        hooks
            .iter()
            .try_for_each(|hook| hook.on_before_collection(kind, flags))
    }

    /// Fire only the after hooks, as a misbehaving host might
    pub fn fire_after(&self, kind: GcType, flags: GcFlags) -> Result<()> {
        let hooks = self.hooks.borrow().clone();
        hooks
            .iter()
            .try_for_each(|hook| hook.on_after_collection(kind, flags))
    }

    /// True while inside `collect`
    pub fn is_collecting(&self) -> bool {
        self.collecting.get()
    }

    pub fn collections(&self) -> u64 {
        self.collections.get()
    }

    pub fn installed_hook_sets(&self) -> usize {
        self.hooks.borrow().len()
    }
}

impl HostCollector for SimulatedCollector {
    fn add_collection_hooks(&self, hooks: Rc<dyn CollectorHooks>) {
        self.hooks.borrow_mut().push(hooks);
        debug!("Simulated collector now has {} hook sets", self.installed_hook_sets());
    }
}
