//! # gcpause-clock
//!
//! Monotonic timing for collector pauses.
//!
//! - [`MonotonicClock`] is the one clock interface; [`SystemClock`] is the
//!   platform backend picked at build time
//! - [`PauseTimer`] holds the single outstanding [`TimerMark`] between a
//!   start and the matching end
//! - [`ManualClock`] is a hand-driven clock for deterministic tests
//! - [`WallClock`] supplies informational start timestamps, never durations

mod manual;
mod platform;
mod source;
mod timer;

pub use manual::ManualClock;
pub use platform::SystemClock;
pub use source::{MonotonicClock, SystemWallClock, TimerMark, WallClock};
pub use timer::PauseTimer;
