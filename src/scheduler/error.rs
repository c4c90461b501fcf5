//! Scheduler error types.

use thiserror::Error;

/// Errors that can occur in the import scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Scheduled import not found.
    #[error("scheduled import not found: {0}")]
    NotFound(String),

    /// The import feature flag is off.
    #[error("card import is disabled")]
    ImportDisabled,

    /// The import collaborator failed.
    #[error("import failed: {0}")]
    ImportFailed(String),
}

/// Result type for scheduler operations.
pub type Result<T> = std::result::Result<T, SchedulerError>;
