//! Eligibility and ordering engine.
//!
//! A task is eligible when its status permits dispatch and every dependency
//! is `ready`. Pending tasks qualify, scheduled tasks qualify once their
//! backoff deadline has passed, and failed tasks qualify while automatic
//! retries remain. Eligible tasks are ordered by priority, then creation
//! time, then enqueue order.
//!
//! Terminal tasks stay queued so dependency checks keep working until the
//! story is forgotten.
//!
//! Each claimed task holds a [`CommitPermit`]. Abandoning a story revokes
//! the permits of its in-flight tasks; a task whose write was already
//! admitted is left to finish and is abandoned only if that write fails.

use super::{BackoffPolicy, SchedulerError, SchedulerResult, StoryProgress};
use crate::illustration::{
    domain::{IllustrationTask, TaskFailure, TaskId, TaskStatus, TaskType},
    ports::{CommitPermit, DispatchContext},
};
use crate::story::domain::StoryId;
use mockable::Clock;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
struct QueueEntry {
    task: IllustrationTask,
    sequence: u64,
    not_before: Option<Instant>,
    permit: Option<CommitPermit>,
    cancel_requested: bool,
}

/// What happened to a task after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureOutcome {
    /// The task was re-queued as `scheduled` behind a backoff delay.
    Retrying {
        /// The re-queued task.
        task: IllustrationTask,
        /// Time before the retry becomes eligible.
        delay: Duration,
    },
    /// The task stays `failed` until an explicit retry.
    Exhausted(IllustrationTask),
    /// The story was cancelled while the write was in progress, so the
    /// task was abandoned instead of retried.
    Abandoned(IllustrationTask),
}

/// Shared set of illustration tasks.
#[derive(Debug)]
pub struct TaskQueue {
    entries: HashMap<TaskId, QueueEntry>,
    next_sequence: u64,
    max_attempts: u32,
}

impl TaskQueue {
    /// Creates an empty queue with the given attempt limit.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            entries: HashMap::new(),
            next_sequence: 0,
            max_attempts,
        }
    }

    /// Returns the number of queued tasks, terminal ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no task is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds a task.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::DuplicateTask`] when the identifier is
    /// already queued and [`SchedulerError::UnknownDependency`] when a
    /// dependency is not queued.
    pub fn enqueue(&mut self, task: IllustrationTask) -> SchedulerResult<()> {
        if self.entries.contains_key(&task.id()) {
            return Err(SchedulerError::DuplicateTask(task.id()));
        }
        if let Some(missing) = task
            .dependencies()
            .iter()
            .find(|dependency| !self.entries.contains_key(dependency))
        {
            return Err(SchedulerError::UnknownDependency {
                task_id: task.id(),
                dependency: *missing,
            });
        }
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.saturating_add(1);
        self.entries.insert(
            task.id(),
            QueueEntry {
                task,
                sequence,
                not_before: None,
                permit: None,
                cancel_requested: false,
            },
        );
        Ok(())
    }

    /// Returns a queued task.
    #[must_use]
    pub fn get(&self, task_id: TaskId) -> Option<&IllustrationTask> {
        self.entries.get(&task_id).map(|entry| &entry.task)
    }

    /// Returns a story's tasks in enqueue order.
    #[must_use]
    pub fn story_tasks(&self, story_id: StoryId) -> Vec<IllustrationTask> {
        let mut entries: Vec<&QueueEntry> = self
            .entries
            .values()
            .filter(|entry| entry.task.story_id() == story_id)
            .collect();
        entries.sort_by_key(|entry| entry.sequence);
        entries.into_iter().map(|entry| entry.task.clone()).collect()
    }

    fn dependencies_ready(&self, task: &IllustrationTask) -> bool {
        task.dependencies().iter().all(|dependency| {
            self.get(*dependency)
                .is_some_and(|found| found.status() == TaskStatus::Ready)
        })
    }

    fn is_blocked(&self, task: &IllustrationTask) -> bool {
        task.dependencies()
            .iter()
            .any(|dependency| match self.get(*dependency) {
                Some(found) => {
                    found.status() == TaskStatus::Abandoned
                        || found.is_permanently_failed(self.max_attempts)
                }
                None => true,
            })
    }

    fn entry_is_eligible(&self, entry: &QueueEntry, now: Instant) -> bool {
        let status_permits = match entry.task.status() {
            TaskStatus::Pending => true,
            TaskStatus::Scheduled => entry.not_before.is_none_or(|deadline| deadline <= now),
            TaskStatus::Failed => entry.task.can_retry(self.max_attempts),
            TaskStatus::Generating | TaskStatus::Ready | TaskStatus::Abandoned => false,
        };
        status_permits && self.dependencies_ready(&entry.task)
    }

    /// Returns `true` when the task may be dispatched at `now`.
    #[must_use]
    pub fn is_eligible(&self, task_id: TaskId, now: Instant) -> bool {
        self.entries
            .get(&task_id)
            .is_some_and(|entry| self.entry_is_eligible(entry, now))
    }

    /// Returns the eligible task that should run next.
    #[must_use]
    pub fn next_eligible(&self, now: Instant) -> Option<TaskId> {
        self.entries
            .values()
            .filter(|entry| self.entry_is_eligible(entry, now))
            .min_by_key(|entry| {
                (
                    entry.task.priority().rank(),
                    entry.task.created_at(),
                    entry.sequence,
                )
            })
            .map(|entry| entry.task.id())
    }

    /// Returns the earliest backoff deadline of a retry whose dependencies
    /// are ready.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries
            .values()
            .filter(|entry| entry.task.status() == TaskStatus::Scheduled)
            .filter(|entry| self.dependencies_ready(&entry.task))
            .filter_map(|entry| entry.not_before)
            .min()
    }

    /// Resolves the optional inputs for dispatching a task.
    ///
    /// A page task receives its predecessor only when the predecessor's
    /// task is `ready`; otherwise it proceeds without one.
    #[must_use]
    pub fn dispatch_context(&self, task: &IllustrationTask) -> DispatchContext {
        let predecessor_index = match (task.task_type(), task.page_index()) {
            (TaskType::PageIllustration, Some(index)) => index.checked_sub(1),
            _ => None,
        };
        let Some(wanted) = predecessor_index else {
            return DispatchContext::new();
        };
        self.entries
            .values()
            .map(|entry| &entry.task)
            .find(|candidate| {
                candidate.story_id() == task.story_id()
                    && candidate.task_type() == TaskType::PageIllustration
                    && candidate.page_index() == Some(wanted)
                    && candidate.status() == TaskStatus::Ready
            })
            .and_then(IllustrationTask::page_id)
            .map_or_else(DispatchContext::new, |page_id| {
                DispatchContext::new().with_previous_page(page_id)
            })
    }

    /// Takes the next eligible task and starts an attempt on it.
    ///
    /// Returns a snapshot of the task, now `generating`, together with its
    /// dispatch inputs.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Domain`] if the task rejects the state
    /// change.
    pub fn claim_next(
        &mut self,
        now: Instant,
        clock: &impl Clock,
    ) -> SchedulerResult<Option<(IllustrationTask, DispatchContext)>> {
        let Some(task_id) = self.next_eligible(now) else {
            return Ok(None);
        };
        let entry = self.entry_mut(task_id)?;
        if entry.task.status() != TaskStatus::Scheduled {
            entry.task.transition_to(TaskStatus::Scheduled, clock)?;
        }
        entry.task.begin_attempt(clock)?;
        entry.not_before = None;
        entry.permit = Some(CommitPermit::new());
        entry.cancel_requested = false;
        let task = entry.task.clone();
        let context = self.dispatch_context(&task);
        Ok(Some((task, context)))
    }

    /// Returns the write permit of an in-flight task.
    #[must_use]
    pub fn commit_permit(&self, task_id: TaskId) -> Option<CommitPermit> {
        self.entries
            .get(&task_id)
            .filter(|entry| entry.task.status() == TaskStatus::Generating)
            .and_then(|entry| entry.permit.clone())
    }

    /// Marks an in-flight task as ready.
    ///
    /// Returns `None` when the task was abandoned or removed while in
    /// flight.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Domain`] if the task rejects the state
    /// change.
    pub fn complete(
        &mut self,
        task_id: TaskId,
        clock: &impl Clock,
    ) -> SchedulerResult<Option<IllustrationTask>> {
        let Some(entry) = self.live_entry_mut(task_id) else {
            return Ok(None);
        };
        entry.task.complete(clock)?;
        entry.permit = None;
        entry.cancel_requested = false;
        Ok(Some(entry.task.clone()))
    }

    /// Records a failed attempt and applies the retry policy.
    ///
    /// Returns `None` when the task was abandoned or removed while in
    /// flight.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Domain`] if the task rejects the state
    /// change.
    pub fn fail(
        &mut self,
        task_id: TaskId,
        failure: TaskFailure,
        now: Instant,
        backoff: &BackoffPolicy,
        clock: &impl Clock,
    ) -> SchedulerResult<Option<FailureOutcome>> {
        let max_attempts = self.max_attempts;
        let Some(entry) = self.live_entry_mut(task_id) else {
            return Ok(None);
        };
        entry.permit = None;
        if entry.cancel_requested {
            entry.cancel_requested = false;
            entry.task.abandon(clock)?;
            return Ok(Some(FailureOutcome::Abandoned(entry.task.clone())));
        }
        entry.task.record_failure(failure, clock)?;
        if !entry.task.can_retry(max_attempts) {
            return Ok(Some(FailureOutcome::Exhausted(entry.task.clone())));
        }
        let delay = backoff.delay_for(entry.task.attempt_count());
        entry.task.transition_to(TaskStatus::Scheduled, clock)?;
        entry.not_before = Some(now + delay);
        Ok(Some(FailureOutcome::Retrying {
            task: entry.task.clone(),
            delay,
        }))
    }

    /// Abandons every non-terminal task of a story.
    ///
    /// In-flight tasks whose permit can still be revoked are abandoned at
    /// once. A task whose write was already admitted is marked for
    /// cancellation and left out of the returned list.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Domain`] if a task rejects the state
    /// change.
    pub fn abandon_story(
        &mut self,
        story_id: StoryId,
        clock: &impl Clock,
    ) -> SchedulerResult<Vec<IllustrationTask>> {
        let mut abandoned = Vec::new();
        for entry in self.entries.values_mut() {
            if entry.task.story_id() != story_id || entry.task.is_terminal() {
                continue;
            }
            if entry.permit.as_ref().is_some_and(|permit| !permit.revoke()) {
                entry.cancel_requested = true;
                continue;
            }
            entry.task.abandon(clock)?;
            entry.not_before = None;
            entry.permit = None;
            abandoned.push((entry.sequence, entry.task.clone()));
        }
        abandoned.sort_by_key(|(sequence, _)| *sequence);
        Ok(abandoned.into_iter().map(|(_, task)| task).collect())
    }

    /// Resets a failed task's attempts and re-queues it immediately.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::TaskNotFound`] when the task is not queued
    /// and [`SchedulerError::Domain`] when it is not `failed`.
    pub fn reset(
        &mut self,
        task_id: TaskId,
        clock: &impl Clock,
    ) -> SchedulerResult<IllustrationTask> {
        let entry = self.entry_mut(task_id)?;
        entry.task.reset_attempts(clock)?;
        entry.not_before = None;
        Ok(entry.task.clone())
    }

    /// Removes every task of a story, returning the removed identifiers.
    pub fn remove_story(&mut self, story_id: StoryId) -> Vec<TaskId> {
        let removed: Vec<TaskId> = self
            .entries
            .values()
            .filter(|entry| entry.task.story_id() == story_id)
            .map(|entry| entry.task.id())
            .collect();
        for task_id in &removed {
            if let Some(permit) = self
                .entries
                .remove(task_id)
                .and_then(|entry| entry.permit)
            {
                // An admitted write still lands; the task is gone either way.
                let _revoked = permit.revoke();
            }
        }
        removed
    }

    /// Counts a story's tasks by status.
    #[must_use]
    pub fn progress(&self, story_id: StoryId) -> StoryProgress {
        let mut progress = StoryProgress::default();
        for task in self
            .entries
            .values()
            .map(|entry| &entry.task)
            .filter(|task| task.story_id() == story_id)
        {
            progress.total += 1;
            match task.status() {
                TaskStatus::Pending => {
                    progress.pending += 1;
                    if self.is_blocked(task) {
                        progress.blocked += 1;
                    }
                }
                TaskStatus::Scheduled => progress.scheduled += 1,
                TaskStatus::Generating => progress.generating += 1,
                TaskStatus::Ready => progress.ready += 1,
                TaskStatus::Failed => progress.failed += 1,
                TaskStatus::Abandoned => progress.abandoned += 1,
            }
        }
        progress
    }

    fn entry_mut(&mut self, task_id: TaskId) -> SchedulerResult<&mut QueueEntry> {
        self.entries
            .get_mut(&task_id)
            .ok_or(SchedulerError::TaskNotFound(task_id))
    }

    fn live_entry_mut(&mut self, task_id: TaskId) -> Option<&mut QueueEntry> {
        self.entries
            .get_mut(&task_id)
            .filter(|entry| entry.task.status() == TaskStatus::Generating)
    }
}
