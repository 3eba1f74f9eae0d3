//! Observable scheduler state.

use crate::illustration::domain::{IllustrationTask, TaskId, TaskStatus};
use crate::story::domain::StoryId;
use serde::Serialize;
use std::time::Duration;

/// Notification published on every scheduler state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    /// A task entered a new status.
    StatusChanged {
        /// Task identifier.
        task_id: TaskId,
        /// Owning story.
        story_id: StoryId,
        /// The new status.
        status: TaskStatus,
        /// Attempts made so far.
        attempt_count: u32,
    },
    /// A failed attempt was re-queued.
    RetryScheduled {
        /// Task identifier.
        task_id: TaskId,
        /// Owning story.
        story_id: StoryId,
        /// Attempts made so far.
        attempt_count: u32,
        /// Time before the retry becomes eligible.
        delay: Duration,
    },
    /// A late result of an abandoned or forgotten task was dropped.
    ResultDiscarded {
        /// Task identifier.
        task_id: TaskId,
        /// Owning story.
        story_id: StoryId,
    },
}

impl TaskEvent {
    /// Builds a status event from a task snapshot.
    #[must_use]
    pub const fn status_changed(task: &IllustrationTask) -> Self {
        Self::StatusChanged {
            task_id: task.id(),
            story_id: task.story_id(),
            status: task.status(),
            attempt_count: task.attempt_count(),
        }
    }

    /// Returns the task the event refers to.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        match self {
            Self::StatusChanged { task_id, .. }
            | Self::RetryScheduled { task_id, .. }
            | Self::ResultDiscarded { task_id, .. } => *task_id,
        }
    }

    /// Returns the story the event refers to.
    #[must_use]
    pub const fn story_id(&self) -> StoryId {
        match self {
            Self::StatusChanged { story_id, .. }
            | Self::RetryScheduled { story_id, .. }
            | Self::ResultDiscarded { story_id, .. } => *story_id,
        }
    }
}

/// Per-story task counts for progress display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoryProgress {
    /// Tasks known for the story.
    pub total: usize,
    /// Tasks waiting to be scheduled.
    pub pending: usize,
    /// Tasks queued for dispatch, including backed-off retries.
    pub scheduled: usize,
    /// Tasks with a backend call in flight.
    pub generating: usize,
    /// Finished tasks.
    pub ready: usize,
    /// Tasks whose latest attempt failed.
    pub failed: usize,
    /// Cancelled tasks.
    pub abandoned: usize,
    /// Pending tasks that wait on a permanently failed or cancelled
    /// dependency.
    pub blocked: usize,
}

impl StoryProgress {
    /// Returns `true` when no task of the story can make progress on its
    /// own.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        self.scheduled == 0 && self.generating == 0 && self.pending == self.blocked
    }

    /// Returns `true` when every task of the story is ready.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.total > 0 && self.ready == self.total
    }
}
