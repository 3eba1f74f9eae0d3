//! Error types for illustration task validation and parsing.

use super::{TaskId, TaskStatus};
use thiserror::Error;

/// Errors returned by illustration task operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The requested status change is not an edge of the task state machine.
    #[error("invalid status transition for task {task_id}: {from} -> {to}")]
    InvalidStatusTransition {
        /// Task identifier.
        task_id: TaskId,
        /// Current status.
        from: TaskStatus,
        /// Requested status.
        to: TaskStatus,
    },

    /// Attempts can only be reset on a failed task.
    #[error("task {0} is not failed; attempts can only be reset after a failure")]
    NotFailed(TaskId),
}

/// Error returned while parsing task enums from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task {kind}: {value}")]
pub struct ParseTaskValueError {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The rejected raw value.
    pub value: String,
}
