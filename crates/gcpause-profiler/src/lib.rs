//! # gcpause-profiler
//!
//! Collector pause capture with deferred delivery.
//!
//! This crate provides:
//! - [`PauseCapture`]: before/after collection hooks that time each pause
//! - [`Dispatcher`]: relays a finished pause out of the collector to the
//!   host's next safe turn
//! - [`Profiler`]: the observer registry, installing hooks exactly once
//! - [`load_profiler`]: the host-facing registration entry point
//!
//! ## Flow
//!
//! ```text
//! register → before hook (start timer) → after hook (end timer, build event)
//!          → Dispatcher::enqueue → next turn → observer
//! ```
//!
//! Everything runs on one thread. The host serialises hook calls and never
//! overlaps two pauses.

mod binding;
mod capture;
mod dispatcher;
mod host;
mod registry;
mod scheduler;
mod simulated;

pub use binding::{load_profiler, HostFunction, HostValue, CALLBACK_REQUIRED};
pub use capture::PauseCapture;
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use host::{CollectorHooks, DeferredWork, HostCollector, TaskScheduler};
pub use registry::{ObserverHandle, PauseObserver, Profiler, ProfilerBuilder};
pub use scheduler::{ChannelScheduler, DeliveryLoop, TurnQueue};
pub use simulated::SimulatedCollector;
