//! Bounded worker driver for illustration tasks.

use super::{
    FailureOutcome, SchedulerConfig, SchedulerResult, StoryProgress, TaskEvent,
    TaskQueue,
};
use crate::illustration::{
    domain::{IllustrationPlan, IllustrationTask, TaskFailure, TaskId, TaskStatus},
    ports::{CommitPermit, TaskExecutionError, TaskExecutionResult, TaskExecutor, TaskOutput},
};
use crate::story::domain::{Story, StoryId};
use mockable::Clock;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Notify, broadcast};
use tokio::task::{Id, JoinError, JoinSet};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 256;

type DispatchJoin = Result<(Id, TaskExecutionResult<TaskOutput>), JoinError>;
type InFlight = HashMap<Id, (IllustrationTask, CommitPermit)>;

/// Dispatches eligible tasks to a [`TaskExecutor`] on at most
/// `max_concurrent_generations` workers.
///
/// Each dispatch runs to success, failure or timeout. Failed attempts are
/// re-queued behind an exponential backoff until `max_attempts` is reached.
/// Clones share the same queue, so one handle can drive while another
/// enqueues, cancels or polls.
pub struct IllustrationScheduler<E, C>
where
    E: TaskExecutor + 'static,
    C: Clock + Send + Sync + 'static,
{
    queue: Arc<Mutex<TaskQueue>>,
    executor: Arc<E>,
    clock: Arc<C>,
    config: SchedulerConfig,
    events: broadcast::Sender<TaskEvent>,
    wake: Arc<Notify>,
}

impl<E, C> Clone for IllustrationScheduler<E, C>
where
    E: TaskExecutor + 'static,
    C: Clock + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            executor: Arc::clone(&self.executor),
            clock: Arc::clone(&self.clock),
            config: self.config,
            events: self.events.clone(),
            wake: Arc::clone(&self.wake),
        }
    }
}

impl<E, C> IllustrationScheduler<E, C>
where
    E: TaskExecutor + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a scheduler with an empty queue.
    #[must_use]
    pub fn new(executor: Arc<E>, clock: Arc<C>, config: SchedulerConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            queue: Arc::new(Mutex::new(TaskQueue::new(config.max_attempts))),
            executor,
            clock,
            config,
            events,
            wake: Arc::new(Notify::new()),
        }
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Subscribes to task events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.events.subscribe()
    }

    fn queue(&self) -> MutexGuard<'_, TaskQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: TaskEvent) {
        // Sending only fails when nobody is subscribed.
        self.events.send(event).ok();
    }

    async fn publish(&self, task: &IllustrationTask) {
        if let Err(err) = self.executor.publish_status(task).await {
            warn!(
                task_id = %task.id(),
                story_id = %task.story_id(),
                status = %task.status(),
                error = %err,
                "failed to publish task status"
            );
        }
    }

    /// Adds one task to the queue.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::DuplicateTask`](super::SchedulerError::DuplicateTask) or
    /// [`SchedulerError::UnknownDependency`](super::SchedulerError::UnknownDependency) when the task cannot be queued.
    pub fn enqueue(&self, task: IllustrationTask) -> SchedulerResult<TaskId> {
        let task_id = task.id();
        let event = TaskEvent::status_changed(&task);
        debug!(
            task_id = %task_id,
            story_id = %task.story_id(),
            task_type = task.task_type().as_str(),
            priority = task.priority().as_str(),
            "enqueued illustration task"
        );
        self.queue().enqueue(task)?;
        self.emit(event);
        self.wake.notify_one();
        Ok(task_id)
    }

    /// Adds every task of a plan, reference first.
    ///
    /// # Errors
    ///
    /// Returns the first enqueue error; tasks before it stay queued.
    pub fn enqueue_plan(&self, plan: IllustrationPlan) -> SchedulerResult<Vec<TaskId>> {
        plan.into_tasks()
            .into_iter()
            .map(|task| self.enqueue(task))
            .collect()
    }

    /// Plans and enqueues the illustration work for a story.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Self::enqueue_plan`].
    pub fn plan_story(&self, story: &Story) -> SchedulerResult<IllustrationPlan> {
        let plan = IllustrationPlan::for_story(story, &*self.clock);
        self.enqueue_plan(plan.clone())?;
        info!(
            story_id = %story.id(),
            pages = plan.page_tasks().len(),
            with_reference = plan.reference_task().is_some(),
            "planned story illustrations"
        );
        Ok(plan)
    }

    /// Returns a snapshot of a task.
    #[must_use]
    pub fn task(&self, task_id: TaskId) -> Option<IllustrationTask> {
        self.queue().get(task_id).cloned()
    }

    /// Returns snapshots of a story's tasks in enqueue order.
    #[must_use]
    pub fn story_tasks(&self, story_id: StoryId) -> Vec<IllustrationTask> {
        self.queue().story_tasks(story_id)
    }

    /// Returns per-status task counts for a story.
    #[must_use]
    pub fn story_progress(&self, story_id: StoryId) -> StoryProgress {
        self.queue().progress(story_id)
    }

    /// Abandons every non-terminal task of a story.
    ///
    /// Results of abandoned tasks still in flight are discarded when they
    /// arrive, and their commits are refused. A task whose write was already
    /// admitted finishes as `ready`, or is abandoned if the write fails.
    /// Returns the number of tasks abandoned now.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Domain`](super::SchedulerError::Domain) if a task rejects the change.
    pub async fn cancel_story(&self, story_id: StoryId) -> SchedulerResult<usize> {
        let abandoned = self.queue().abandon_story(story_id, &*self.clock)?;
        self.executor.forget_story(story_id);
        for task in &abandoned {
            self.emit(TaskEvent::status_changed(task));
            self.publish(task).await;
        }
        info!(story_id = %story_id, abandoned = abandoned.len(), "cancelled story illustrations");
        self.wake.notify_one();
        Ok(abandoned.len())
    }

    /// Resets a permanently failed task and re-queues it.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::TaskNotFound`](super::SchedulerError::TaskNotFound) when the task is unknown and
    /// [`SchedulerError::Domain`](super::SchedulerError::Domain) when it is not `failed`.
    pub async fn retry_task(&self, task_id: TaskId) -> SchedulerResult<()> {
        let task = self.queue().reset(task_id, &*self.clock)?;
        info!(task_id = %task_id, story_id = %task.story_id(), "operator retry requested");
        self.emit(TaskEvent::status_changed(&task));
        self.publish(&task).await;
        self.wake.notify_one();
        Ok(())
    }

    /// Removes every task of a story from the queue.
    ///
    /// Returns the number of tasks removed.
    pub fn forget_story(&self, story_id: StoryId) -> usize {
        let removed = self.queue().remove_story(story_id);
        self.executor.forget_story(story_id);
        debug!(story_id = %story_id, removed = removed.len(), "forgot story tasks");
        removed.len()
    }

    /// Dispatches work until nothing is running and nothing can become
    /// eligible without outside action.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError`](super::SchedulerError) when a task rejects a state change.
    pub async fn run_until_idle(&self) -> SchedulerResult<()> {
        self.drive(std::future::pending::<()>(), true).await
    }

    /// Dispatches work until `shutdown` resolves, then waits for in-flight
    /// dispatches to settle.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError`](super::SchedulerError) when a task rejects a state change.
    pub async fn run<F>(&self, shutdown: F) -> SchedulerResult<()>
    where
        F: Future<Output = ()> + Send,
    {
        self.drive(shutdown, false).await
    }

    async fn drive<F>(&self, shutdown: F, stop_when_idle: bool) -> SchedulerResult<()>
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);
        let mut running = JoinSet::new();
        let mut in_flight = HashMap::new();
        loop {
            self.dispatch_eligible(&mut running, &mut in_flight)?;
            let deadline = self.queue().next_deadline();
            if stop_when_idle && running.is_empty() && deadline.is_none() {
                break;
            }
            let backoff = async move {
                match deadline {
                    Some(at) => sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };
            tokio::select! {
                () = &mut shutdown => {
                    info!(in_flight = in_flight.len(), "scheduler shutting down");
                    break;
                }
                Some(joined) = running.join_next_with_id() => {
                    self.settle(joined, &mut in_flight).await?;
                }
                () = backoff => {}
                () = self.wake.notified() => {}
            }
        }
        while let Some(joined) = running.join_next_with_id().await {
            self.settle(joined, &mut in_flight).await?;
        }
        Ok(())
    }

    fn dispatch_eligible(
        &self,
        running: &mut JoinSet<TaskExecutionResult<TaskOutput>>,
        in_flight: &mut InFlight,
    ) -> SchedulerResult<()> {
        while running.len() < self.config.max_concurrent_generations.get() {
            let claimed = {
                let mut queue = self.queue();
                queue.claim_next(Instant::now(), &*self.clock)?.map(|(task, context)| {
                    let permit = queue.commit_permit(task.id()).unwrap_or_default();
                    (task, context, permit)
                })
            };
            let Some((task, context, permit)) = claimed else {
                break;
            };
            info!(
                task_id = %task.id(),
                story_id = %task.story_id(),
                task_type = task.task_type().as_str(),
                attempt = task.attempt_count(),
                with_previous_page = context.previous_page().is_some(),
                "dispatching illustration task"
            );
            self.emit(TaskEvent::status_changed(&task));

            let executor = Arc::clone(&self.executor);
            let timeout = self.config.dispatch_timeout;
            let dispatched = task.clone();
            let handle = running.spawn(async move {
                if let Err(err) = executor.publish_status(&dispatched).await {
                    warn!(task_id = %dispatched.id(), error = %err, "failed to publish task status");
                }
                tokio::time::timeout(timeout, executor.execute(&dispatched, &context))
                    .await
                    .unwrap_or(Err(TaskExecutionError::TimedOut(timeout)))
            });
            in_flight.insert(handle.id(), (task, permit));
        }
        Ok(())
    }

    async fn settle(
        &self,
        joined: DispatchJoin,
        in_flight: &mut InFlight,
    ) -> SchedulerResult<()> {
        let (handle_id, result) = match joined {
            Ok((handle_id, result)) => (handle_id, result),
            Err(err) => (err.id(), Err(TaskExecutionError::Aborted(err.to_string()))),
        };
        let Some((task, permit)) = in_flight.remove(&handle_id) else {
            warn!("finished dispatch has no matching task");
            return Ok(());
        };
        if !self.is_in_flight(task.id()) {
            self.discard(&task);
            return Ok(());
        }
        let outcome = match result {
            Ok(output) => self.executor.commit(&task, output, &permit).await,
            Err(err) => Err(err),
        };
        match outcome {
            Ok(()) => self.finish(&task),
            Err(err) => self.fail(&task, &err).await,
        }
    }

    fn is_in_flight(&self, task_id: TaskId) -> bool {
        self.queue()
            .get(task_id)
            .is_some_and(|task| task.status() == TaskStatus::Generating)
    }

    fn discard(&self, task: &IllustrationTask) {
        info!(
            task_id = %task.id(),
            story_id = %task.story_id(),
            "discarding result of cancelled task"
        );
        self.emit(TaskEvent::ResultDiscarded {
            task_id: task.id(),
            story_id: task.story_id(),
        });
    }

    fn finish(&self, task: &IllustrationTask) -> SchedulerResult<()> {
        let completed = self.queue().complete(task.id(), &*self.clock)?;
        let Some(completed) = completed else {
            self.discard(task);
            return Ok(());
        };
        info!(
            task_id = %completed.id(),
            story_id = %completed.story_id(),
            attempt = completed.attempt_count(),
            "illustration task ready"
        );
        self.emit(TaskEvent::status_changed(&completed));
        Ok(())
    }

    async fn fail(&self, task: &IllustrationTask, err: &TaskExecutionError) -> SchedulerResult<()> {
        let failure = TaskFailure::new(err.to_string(), err.is_retryable());
        let outcome = self.queue().fail(
            task.id(),
            failure,
            Instant::now(),
            &self.config.backoff,
            &*self.clock,
        )?;
        let updated = match outcome {
            None => {
                self.discard(task);
                return Ok(());
            }
            Some(FailureOutcome::Retrying { task: requeued, delay }) => {
                warn!(
                    task_id = %requeued.id(),
                    story_id = %requeued.story_id(),
                    attempt = requeued.attempt_count(),
                    retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "illustration attempt failed; retry scheduled"
                );
                self.emit(TaskEvent::RetryScheduled {
                    task_id: requeued.id(),
                    story_id: requeued.story_id(),
                    attempt_count: requeued.attempt_count(),
                    delay,
                });
                requeued
            }
            Some(FailureOutcome::Exhausted(failed)) => {
                warn!(
                    task_id = %failed.id(),
                    story_id = %failed.story_id(),
                    attempt = failed.attempt_count(),
                    retryable = err.is_retryable(),
                    error = %err,
                    "illustration task failed permanently"
                );
                failed
            }
            Some(FailureOutcome::Abandoned(abandoned)) => {
                info!(
                    task_id = %abandoned.id(),
                    story_id = %abandoned.story_id(),
                    error = %err,
                    "write of cancelled task failed; task abandoned"
                );
                self.executor.forget_story(abandoned.story_id());
                abandoned
            }
        };
        self.emit(TaskEvent::status_changed(&updated));
        self.publish(&updated).await;
        Ok(())
    }
}
