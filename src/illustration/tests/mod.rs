//! Unit tests for the illustration context.


use crate::generation::{domain::ImageData, ports::BackendError};
use crate::illustration::{
    domain::{IllustrationTask, TaskId, TaskPriority, TaskStatus},
    ports::{
        CommitPermit, DispatchContext, TaskExecutionError, TaskExecutionResult, TaskExecutor,
        TaskOutput,
    },
};
use crate::story::domain::{PageId, StoryId};
use async_trait::async_trait;
use mockable::DefaultClock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Observable step of a scripted dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Step {
    Started(TaskId),
    Committed(TaskId),
}

#[derive(Debug, Clone, Copy)]
struct ScriptedFailure {
    remaining: u32,
    retryable: bool,
}

#[derive(Debug, Default)]
struct ScriptState {
    failures: HashMap<TaskId, ScriptedFailure>,
    dispatched: Vec<(TaskId, DispatchContext)>,
    timeline: Vec<Step>,
    published: Vec<(TaskId, TaskStatus)>,
}

/// Executor with scripted latency and failures that records every call.
#[derive(Debug, Default)]
pub(super) struct ScriptedExecutor {
    state: Mutex<ScriptState>,
    latency: Duration,
    commit_latency: Duration,
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedExecutor {
    pub(super) fn new() -> Self {
        Self::default()
    }

    pub(super) fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Waits `commit_latency` inside every commit before taking its permit.
    pub(super) fn with_commit_latency(commit_latency: Duration) -> Self {
        Self {
            commit_latency,
            ..Self::default()
        }
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn fail(&self, task_id: TaskId, times: u32, retryable: bool) {
        self.lock().failures.insert(
            task_id,
            ScriptedFailure {
                remaining: times,
                retryable,
            },
        );
    }

    pub(super) fn fail_always(&self, task_id: TaskId) {
        self.fail(task_id, u32::MAX, true);
    }

    pub(super) fn heal(&self, task_id: TaskId) {
        self.lock().failures.remove(&task_id);
    }

    pub(super) fn dispatch_count(&self, task_id: TaskId) -> usize {
        self.lock()
            .dispatched
            .iter()
            .filter(|(dispatched, _)| *dispatched == task_id)
            .count()
    }

    pub(super) fn dispatched(&self) -> Vec<(TaskId, DispatchContext)> {
        self.lock().dispatched.clone()
    }

    pub(super) fn timeline(&self) -> Vec<Step> {
        self.lock().timeline.clone()
    }

    pub(super) fn committed(&self) -> Vec<TaskId> {
        self.lock()
            .timeline
            .iter()
            .filter_map(|step| match step {
                Step::Committed(task_id) => Some(*task_id),
                Step::Started(_) => None,
            })
            .collect()
    }

    pub(super) fn published(&self) -> Vec<(TaskId, TaskStatus)> {
        self.lock().published.clone()
    }

    pub(super) fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        task: &IllustrationTask,
        context: &DispatchContext,
    ) -> TaskExecutionResult<TaskOutput> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let failure = {
            let mut state = self.lock();
            state.dispatched.push((task.id(), *context));
            state.timeline.push(Step::Started(task.id()));
            state.failures.get_mut(&task.id()).and_then(|scripted| {
                (scripted.remaining > 0).then(|| {
                    scripted.remaining = scripted.remaining.saturating_sub(1);
                    scripted.retryable
                })
            })
        };
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.current.fetch_sub(1, Ordering::SeqCst);
        match failure {
            Some(true) => Err(BackendError::Unavailable("scripted outage".to_owned()).into()),
            Some(false) => Err(TaskExecutionError::MissingMasterReference(task.story_id())),
            None => Ok(TaskOutput::PageIllustration(ImageData::new(
                b"\x89PNG\r\n\x1a\nscripted".to_vec(),
            ))),
        }
    }

    async fn commit(
        &self,
        task: &IllustrationTask,
        _output: TaskOutput,
        permit: &CommitPermit,
    ) -> TaskExecutionResult<()> {
        if !self.commit_latency.is_zero() {
            tokio::time::sleep(self.commit_latency).await;
        }
        if !permit.admit() {
            return Err(TaskExecutionError::Cancelled(task.story_id()));
        }
        self.lock().timeline.push(Step::Committed(task.id()));
        Ok(())
    }

    async fn publish_status(&self, task: &IllustrationTask) -> TaskExecutionResult<()> {
        self.lock().published.push((task.id(), task.status()));
        Ok(())
    }
}

pub(super) fn page_task(
    story_id: StoryId,
    page_index: u32,
    priority: TaskPriority,
    dependencies: &[TaskId],
) -> IllustrationTask {
    IllustrationTask::page(
        story_id,
        PageId::new(),
        page_index,
        priority,
        dependencies.iter().copied(),
        &DefaultClock,
    )
}
