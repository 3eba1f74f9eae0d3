//! Scheduler error types.

use crate::illustration::domain::{TaskDomainError, TaskId};
use thiserror::Error;

/// Result type for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Errors returned by the task queue and scheduler.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchedulerError {
    /// A task with the same identifier is already queued.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// A dependency refers to a task that is not queued.
    #[error("task {task_id} depends on unknown task {dependency}")]
    UnknownDependency {
        /// The task being enqueued.
        task_id: TaskId,
        /// The missing dependency.
        dependency: TaskId,
    },

    /// The task is not queued.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// A task state change was rejected.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),
}
