//! Application error types

use apiprobe_domain::DomainError;
use thiserror::Error;

/// Errors reported by the task scheduler.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// A domain validation error occurred.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// The queue has reached its capacity.
    #[error("task queue is full (capacity {capacity})")]
    QueueFull {
        /// Configured capacity.
        capacity: usize,
    },

    /// No task with the given identifier exists.
    #[error("task not found: {0}")]
    NotFound(String),

    /// The task has not reached a terminal state.
    #[error("task {0} is still active")]
    TaskActive(String),

    /// The scheduler was started outside a Tokio runtime.
    #[error("no Tokio runtime available to start the dispatcher")]
    NoRuntime,
}

/// Result type alias for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;
