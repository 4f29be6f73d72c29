//! Error types for the dayplan task core.

use crate::store::StoreError;
use crate::task::TaskId;

/// Top-level error type for task mutations and queries.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    /// Persistence failure. The mutation was aborted with no partial write.
    #[error("store error: {0}")]
    Store(StoreError),

    /// No task with the given id exists.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// Request rejected at the boundary before reaching the coordinator.
    #[error("invalid task: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send/receive error (coordinator stopped or response dropped).
    #[error("channel error: {0}")]
    Channel(String),

    /// Reminder scheduler setup error. Scheduling failures during a mutation
    /// are reported as `ReminderSync::Degraded` instead.
    #[error("reminder error: {0}")]
    Reminder(#[from] crate::reminder::ReminderError),
}

impl From<StoreError> for PlannerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, PlannerError>;
