//! Illustration task aggregate and its classification enums.

use super::{ParseTaskValueError, TaskDomainError, TaskId, TaskStatus};
use crate::story::domain::{PageId, StoryId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Dispatch priority among eligible tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    /// Dispatched before everything else.
    Critical,
    /// Dispatched before medium and low.
    High,
    /// Default priority.
    Medium,
    /// Dispatched last.
    Low,
}

impl TaskPriority {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Returns the dispatch rank; lower ranks are dispatched first.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }
}

impl TryFrom<&str> for TaskPriority {
    type Error = ParseTaskValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(ParseTaskValueError {
                kind: "priority",
                value: value.to_owned(),
            }),
        }
    }
}

/// Kind of artwork a task produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// The story's master character reference.
    GlobalReference,
    /// One page's illustration.
    PageIllustration,
}

impl TaskType {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GlobalReference => "global_reference",
            Self::PageIllustration => "page_illustration",
        }
    }
}

/// Why the latest attempt of a task failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    reason: String,
    retryable: bool,
}

impl TaskFailure {
    /// Creates a failure record.
    #[must_use]
    pub fn new(reason: impl Into<String>, retryable: bool) -> Self {
        Self {
            reason: reason.into(),
            retryable,
        }
    }

    /// Returns the failure description.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Returns `true` when automatic retries may follow.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.retryable
    }
}

/// A unit of scheduled illustration work.
///
/// Dependencies are fixed at creation. `attempt_count` only grows, except
/// through [`Self::reset_attempts`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IllustrationTask {
    id: TaskId,
    story_id: StoryId,
    page_id: Option<PageId>,
    page_index: Option<u32>,
    priority: TaskPriority,
    status: TaskStatus,
    task_type: TaskType,
    dependencies: BTreeSet<TaskId>,
    attempt_count: u32,
    last_failure: Option<TaskFailure>,
    created_at: DateTime<Utc>,
    last_updated_at: DateTime<Utc>,
}

impl IllustrationTask {
    /// Creates the master reference task for a story.
    #[must_use]
    pub fn global_reference(story_id: StoryId, clock: &impl Clock) -> Self {
        Self::build(
            story_id,
            None,
            None,
            TaskPriority::Critical,
            TaskType::GlobalReference,
            BTreeSet::new(),
            clock,
        )
    }

    /// Creates an illustration task for one page.
    #[must_use]
    pub fn page(
        story_id: StoryId,
        page_id: PageId,
        page_index: u32,
        priority: TaskPriority,
        dependencies: impl IntoIterator<Item = TaskId>,
        clock: &impl Clock,
    ) -> Self {
        Self::build(
            story_id,
            Some(page_id),
            Some(page_index),
            priority,
            TaskType::PageIllustration,
            dependencies.into_iter().collect(),
            clock,
        )
    }

    fn build(
        story_id: StoryId,
        page_id: Option<PageId>,
        page_index: Option<u32>,
        priority: TaskPriority,
        task_type: TaskType,
        dependencies: BTreeSet<TaskId>,
        clock: &impl Clock,
    ) -> Self {
        let timestamp = clock.utc();
        Self {
            id: TaskId::new(),
            story_id,
            page_id,
            page_index,
            priority,
            status: TaskStatus::Pending,
            task_type,
            dependencies,
            attempt_count: 0,
            last_failure: None,
            created_at: timestamp,
            last_updated_at: timestamp,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the owning story.
    #[must_use]
    pub const fn story_id(&self) -> StoryId {
        self.story_id
    }

    /// Returns the target page; `None` for reference tasks.
    #[must_use]
    pub const fn page_id(&self) -> Option<PageId> {
        self.page_id
    }

    /// Returns the target page's position in the story.
    #[must_use]
    pub const fn page_index(&self) -> Option<u32> {
        self.page_index
    }

    /// Returns the dispatch priority.
    #[must_use]
    pub const fn priority(&self) -> TaskPriority {
        self.priority
    }

    /// Returns the current status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the task kind.
    #[must_use]
    pub const fn task_type(&self) -> TaskType {
        self.task_type
    }

    /// Returns the tasks that must be ready before this one runs.
    #[must_use]
    pub const fn dependencies(&self) -> &BTreeSet<TaskId> {
        &self.dependencies
    }

    /// Returns the number of dispatch attempts made, including one in flight.
    #[must_use]
    pub const fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// Returns the latest failure, if the task has failed.
    #[must_use]
    pub const fn last_failure(&self) -> Option<&TaskFailure> {
        self.last_failure.as_ref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the timestamp of the latest status change.
    #[must_use]
    pub const fn last_updated_at(&self) -> DateTime<Utc> {
        self.last_updated_at
    }

    /// Returns `true` when the task is in a terminal status.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns `true` when the task failed and may run again automatically.
    #[must_use]
    pub fn can_retry(&self, max_attempts: u32) -> bool {
        self.status == TaskStatus::Failed
            && self.attempt_count < max_attempts
            && self
                .last_failure
                .as_ref()
                .is_some_and(TaskFailure::is_retryable)
    }

    /// Returns `true` when the task failed and will not run again without an
    /// explicit [`Self::reset_attempts`].
    #[must_use]
    pub fn is_permanently_failed(&self, max_attempts: u32) -> bool {
        self.status == TaskStatus::Failed && !self.can_retry(max_attempts)
    }

    /// Moves the task along a state machine edge.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStatusTransition`] when `next` is not
    /// a valid successor of the current status.
    pub fn transition_to(
        &mut self,
        next: TaskStatus,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        if !self.status.can_transition_to(next) {
            return Err(TaskDomainError::InvalidStatusTransition {
                task_id: self.id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.last_updated_at = clock.utc();
        Ok(())
    }

    /// Starts a dispatch attempt: counts it and enters `generating`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStatusTransition`] unless the task
    /// is `scheduled`.
    pub fn begin_attempt(&mut self, clock: &impl Clock) -> Result<(), TaskDomainError> {
        self.transition_to(TaskStatus::Generating, clock)?;
        self.attempt_count = self.attempt_count.saturating_add(1);
        Ok(())
    }

    /// Marks the in-flight attempt as successful.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStatusTransition`] unless the task
    /// is `generating`.
    pub fn complete(&mut self, clock: &impl Clock) -> Result<(), TaskDomainError> {
        self.transition_to(TaskStatus::Ready, clock)?;
        self.last_failure = None;
        Ok(())
    }

    /// Marks the in-flight attempt as failed.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStatusTransition`] unless the task
    /// is `generating`.
    pub fn record_failure(
        &mut self,
        failure: TaskFailure,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.transition_to(TaskStatus::Failed, clock)?;
        self.last_failure = Some(failure);
        Ok(())
    }

    /// Cancels the task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStatusTransition`] when the task is
    /// already terminal.
    pub fn abandon(&mut self, clock: &impl Clock) -> Result<(), TaskDomainError> {
        self.transition_to(TaskStatus::Abandoned, clock)
    }

    /// Clears the attempt counter of a failed task and re-queues it.
    ///
    /// This is the explicit operator retry; the scheduler never calls it on
    /// its own.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::NotFailed`] unless the task is `failed`.
    pub fn reset_attempts(&mut self, clock: &impl Clock) -> Result<(), TaskDomainError> {
        if self.status != TaskStatus::Failed {
            return Err(TaskDomainError::NotFailed(self.id));
        }
        self.transition_to(TaskStatus::Scheduled, clock)?;
        self.attempt_count = 0;
        self.last_failure = None;
        Ok(())
    }
}
