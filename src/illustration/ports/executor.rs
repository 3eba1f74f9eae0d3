//! Port through which the scheduler runs illustration tasks.
//!
//! Execution is split in two: [`TaskExecutor::execute`] produces a result
//! without side effects on stories or the cache, and
//! [`TaskExecutor::commit`] writes it back. Every commit carries a
//! [`CommitPermit`]; an executor writes only after [`CommitPermit::admit`]
//! succeeds, and cancelling the story revokes the permit of any commit not
//! yet admitted.

use crate::generation::{
    domain::{ImageData, InvalidImageError},
    ports::BackendError,
};
use crate::illustration::domain::IllustrationTask;
use crate::reference::domain::{CharacterReferenceError, MasterReferenceInfo};
use crate::story::{
    domain::{PageId, StoryId},
    ports::StoryRepositoryError,
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;

/// Result type for executor calls.
pub type TaskExecutionResult<T> = Result<T, TaskExecutionError>;

/// Inputs the scheduler resolves before a dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchContext {
    previous_page: Option<PageId>,
}

impl DispatchContext {
    /// Creates a context without a previous page.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            previous_page: None,
        }
    }

    /// Supplies the preceding page, whose task is ready.
    #[must_use]
    pub const fn with_previous_page(mut self, page_id: PageId) -> Self {
        self.previous_page = Some(page_id);
        self
    }

    /// Returns the preceding page whose image may guide continuity.
    #[must_use]
    pub const fn previous_page(&self) -> Option<PageId> {
        self.previous_page
    }
}

/// Artwork produced by one successful execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutput {
    /// A generated master reference.
    MasterReference(Box<MasterReferenceInfo>),
    /// A page illustration.
    PageIllustration(ImageData),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum PermitState {
    #[default]
    Open,
    Admitted,
    Revoked,
}

/// Write permission for one dispatch attempt.
///
/// Admission and revocation are decided under one lock, so exactly one of
/// them takes effect: either the result is written and the task completes,
/// or cancellation wins and nothing is written.
#[derive(Debug, Clone, Default)]
pub struct CommitPermit {
    state: Arc<Mutex<PermitState>>,
}

impl CommitPermit {
    /// Creates an open permit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, PermitState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims the right to write. Returns `false` once the permit is revoked.
    #[must_use]
    pub fn admit(&self) -> bool {
        let mut state = self.state();
        match *state {
            PermitState::Open | PermitState::Admitted => {
                *state = PermitState::Admitted;
                true
            }
            PermitState::Revoked => false,
        }
    }

    /// Withdraws the permit. Returns `false` when a write was already
    /// admitted.
    #[must_use]
    pub fn revoke(&self) -> bool {
        let mut state = self.state();
        match *state {
            PermitState::Open | PermitState::Revoked => {
                *state = PermitState::Revoked;
                true
            }
            PermitState::Admitted => false,
        }
    }

    /// Returns `true` once the permit has been revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        *self.state() == PermitState::Revoked
    }
}

/// Runs illustration tasks on behalf of the scheduler.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Produces the artwork for one dispatch attempt.
    ///
    /// # Errors
    ///
    /// Returns [`TaskExecutionError`]; [`TaskExecutionError::is_retryable`]
    /// decides whether the scheduler tries again.
    async fn execute(
        &self,
        task: &IllustrationTask,
        context: &DispatchContext,
    ) -> TaskExecutionResult<TaskOutput>;

    /// Writes a successful result back to the story and cache.
    ///
    /// Nothing may be written unless `permit` admits the write.
    ///
    /// # Errors
    ///
    /// Returns [`TaskExecutionError::Cancelled`] when the permit was revoked
    /// and any other [`TaskExecutionError`] when the write fails; the
    /// attempt then counts as failed.
    async fn commit(
        &self,
        task: &IllustrationTask,
        output: TaskOutput,
        permit: &CommitPermit,
    ) -> TaskExecutionResult<()>;

    /// Mirrors a task's status onto its page for display.
    ///
    /// # Errors
    ///
    /// Returns [`TaskExecutionError`] when the write fails. The scheduler
    /// logs these errors and carries on.
    async fn publish_status(&self, task: &IllustrationTask) -> TaskExecutionResult<()>;

    /// Drops any state kept for a story between attempts.
    ///
    /// Called when a story is cancelled or forgotten.
    fn forget_story(&self, _story_id: StoryId) {}
}

/// Errors returned by task executors.
#[derive(Debug, Clone, Error)]
pub enum TaskExecutionError {
    /// The reference subsystem failed.
    #[error(transparent)]
    Reference(#[from] CharacterReferenceError),

    /// The generation backend failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The dispatch exceeded its time budget.
    #[error("dispatch timed out after {0:?}")]
    TimedOut(Duration),

    /// The backend returned bytes that are not an image.
    #[error("invalid image data: {0}")]
    InvalidImageData(#[from] InvalidImageError),

    /// The owning story no longer exists.
    #[error("story not found: {0}")]
    StoryNotFound(StoryId),

    /// The target page no longer exists.
    #[error("page {page_id:?} not found in story {story_id}")]
    PageNotFound {
        /// Story identifier.
        story_id: StoryId,
        /// Page identifier, when the task carried one.
        page_id: Option<PageId>,
    },

    /// The story needs a master reference but none is cached.
    #[error("no master reference available for story {0}")]
    MissingMasterReference(StoryId),

    /// The page prompt template failed to render.
    #[error("failed to render page prompt: {0}")]
    PromptRender(String),

    /// Story persistence failed.
    #[error(transparent)]
    Repository(#[from] StoryRepositoryError),

    /// The dispatch ended abnormally.
    #[error("dispatch aborted: {0}")]
    Aborted(String),

    /// The story was cancelled before the result could be written.
    #[error("commit cancelled for task of story {0}")]
    Cancelled(StoryId),
}

impl TaskExecutionError {
    /// Returns `true` when the scheduler may retry the task.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Reference(err) => err.is_retryable(),
            Self::Repository(err) => matches!(err, StoryRepositoryError::Persistence(_)),
            Self::Backend(_) | Self::TimedOut(_) | Self::InvalidImageData(_) | Self::Aborted(_) => {
                true
            }
            Self::StoryNotFound(_)
            | Self::PageNotFound { .. }
            | Self::MissingMasterReference(_)
            | Self::PromptRender(_)
            | Self::Cancelled(_) => false,
        }
    }
}
