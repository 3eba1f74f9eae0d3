//! Repository port for story and page persistence.

use crate::generation::domain::ImageData;
use crate::story::domain::{Page, PageId, PageIllustrationUpdate, Story, StoryId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for story repository operations.
pub type StoryRepositoryResult<T> = Result<T, StoryRepositoryError>;

/// Story persistence contract.
///
/// The pipeline only reads copies and writes through these calls; the storage
/// format belongs to the implementation.
#[async_trait]
pub trait StoryRepository: Send + Sync {
    /// Stores a new story.
    ///
    /// # Errors
    ///
    /// Returns [`StoryRepositoryError::DuplicateStory`] when the story ID
    /// already exists.
    async fn store(&self, story: &Story) -> StoryRepositoryResult<()>;

    /// Replaces an existing story.
    ///
    /// # Errors
    ///
    /// Returns [`StoryRepositoryError::NotFound`] when the story does not
    /// exist.
    async fn update(&self, story: &Story) -> StoryRepositoryResult<()>;

    /// Finds a story by identifier.
    ///
    /// Returns `None` when the story does not exist.
    async fn find_by_id(&self, id: StoryId) -> StoryRepositoryResult<Option<Story>>;

    /// Finds a page of a story.
    ///
    /// Returns `None` when the story exists but has no such page.
    ///
    /// # Errors
    ///
    /// Returns [`StoryRepositoryError::NotFound`] when the story does not
    /// exist.
    async fn find_page(&self, story_id: StoryId, page_id: PageId)
    -> StoryRepositoryResult<Option<Page>>;

    /// Writes the story's master reference bytes and reconciled element names.
    ///
    /// # Errors
    ///
    /// Returns [`StoryRepositoryError::NotFound`] when the story does not
    /// exist.
    async fn update_character_reference(
        &self,
        story_id: StoryId,
        image: &ImageData,
        character_names: &[String],
    ) -> StoryRepositoryResult<()>;

    /// Writes a page's illustration status and, when present, its image.
    ///
    /// # Errors
    ///
    /// Returns [`StoryRepositoryError::NotFound`] or
    /// [`StoryRepositoryError::PageNotFound`] when the target is missing.
    async fn update_page_illustration(
        &self,
        story_id: StoryId,
        page_id: PageId,
        update: &PageIllustrationUpdate,
    ) -> StoryRepositoryResult<()>;
}

/// Errors returned by story repository implementations.
#[derive(Debug, Clone, Error)]
pub enum StoryRepositoryError {
    /// A story with the same identifier already exists.
    #[error("duplicate story identifier: {0}")]
    DuplicateStory(StoryId),

    /// The story was not found.
    #[error("story not found: {0}")]
    NotFound(StoryId),

    /// The page was not found in the story.
    #[error("page {page_id} not found in story {story_id}")]
    PageNotFound {
        /// Story identifier.
        story_id: StoryId,
        /// Page identifier.
        page_id: PageId,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl StoryRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
