//! Unified error types for gcpause

use thiserror::Error;

/// Unified error type for all gcpause operations
#[derive(Error, Debug)]
pub enum GcPauseError {
    /// Registration was attempted without a callable observer
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The host broke the before/after hook contract
    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),

    /// Deferred work could not be handed to the host scheduler
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("Config error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GcPauseError {
    /// Whether this error signals a broken host contract that must halt capture
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::IntegrityViolation(_))
    }
}

/// Result type alias using GcPauseError
pub type Result<T> = std::result::Result<T, GcPauseError>;
