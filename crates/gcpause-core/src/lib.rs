//! # gcpause-core
//!
//! Core types for gcpause, a collector pause profiler.
//!
//! A host runtime calls into the profiler around every garbage collection.
//! The pause is measured inside the collection and handed to an observer
//! later, once arbitrary code is safe to run again.
//!
//! ## Data Model
//!
//! - [`GcEvent`] is one completed pause: wall-clock start, monotonic duration,
//!   collector kind and flags
//! - [`GcType`] and [`GcFlags`] are host-defined and passed through opaquely
//! - [`GcInfo`] is the decoded view a consumer usually wants

mod config;
mod error;
mod types;

pub use config::{GcPauseConfig, OutputConfig, OutputFormat, ProfilerConfig, SimulationConfig};
pub use error::{GcPauseError, Result};
pub use types::*;
