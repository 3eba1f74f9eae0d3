//! In-memory story repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::generation::domain::ImageData;
use crate::story::{
    domain::{Page, PageId, PageIllustrationUpdate, Story, StoryDomainError, StoryId},
    ports::{StoryRepository, StoryRepositoryError, StoryRepositoryResult},
};

/// Thread-safe in-memory story repository.
///
/// Writes can be made to fail on demand, which lets tests exercise the
/// caching-failure paths of the reference service.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStoryRepository {
    state: Arc<RwLock<InMemoryStoryState>>,
}

#[derive(Debug, Default)]
struct InMemoryStoryState {
    stories: HashMap<StoryId, Story>,
    write_failure: Option<String>,
}

impl InMemoryStoryRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail with a persistence error.
    ///
    /// # Errors
    ///
    /// Returns a persistence error when lock acquisition fails.
    pub fn reject_writes(&self, reason: impl Into<String>) -> StoryRepositoryResult<()> {
        self.write()?.write_failure = Some(reason.into());
        Ok(())
    }

    /// Restores normal write behaviour.
    ///
    /// # Errors
    ///
    /// Returns a persistence error when lock acquisition fails.
    pub fn accept_writes(&self) -> StoryRepositoryResult<()> {
        self.write()?.write_failure = None;
        Ok(())
    }

    fn read(&self) -> StoryRepositoryResult<RwLockReadGuard<'_, InMemoryStoryState>> {
        self.state.read().map_err(|err| {
            StoryRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(&self) -> StoryRepositoryResult<RwLockWriteGuard<'_, InMemoryStoryState>> {
        self.state.write().map_err(|err| {
            StoryRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    /// Acquires the write lock and applies the configured write failure.
    fn guarded_write(&self) -> StoryRepositoryResult<RwLockWriteGuard<'_, InMemoryStoryState>> {
        let state = self.write()?;
        if let Some(reason) = &state.write_failure {
            return Err(StoryRepositoryError::persistence(std::io::Error::other(
                reason.clone(),
            )));
        }
        Ok(state)
    }
}

#[async_trait]
impl StoryRepository for InMemoryStoryRepository {
    async fn store(&self, story: &Story) -> StoryRepositoryResult<()> {
        let mut state = self.guarded_write()?;
        if state.stories.contains_key(&story.id()) {
            return Err(StoryRepositoryError::DuplicateStory(story.id()));
        }
        state.stories.insert(story.id(), story.clone());
        Ok(())
    }

    async fn update(&self, story: &Story) -> StoryRepositoryResult<()> {
        let mut state = self.guarded_write()?;
        let slot = state
            .stories
            .get_mut(&story.id())
            .ok_or(StoryRepositoryError::NotFound(story.id()))?;
        *slot = story.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: StoryId) -> StoryRepositoryResult<Option<Story>> {
        Ok(self.read()?.stories.get(&id).cloned())
    }

    async fn find_page(
        &self,
        story_id: StoryId,
        page_id: PageId,
    ) -> StoryRepositoryResult<Option<Page>> {
        let state = self.read()?;
        let story = state
            .stories
            .get(&story_id)
            .ok_or(StoryRepositoryError::NotFound(story_id))?;
        Ok(story.page(page_id).cloned())
    }

    async fn update_character_reference(
        &self,
        story_id: StoryId,
        image: &ImageData,
        character_names: &[String],
    ) -> StoryRepositoryResult<()> {
        let mut state = self.guarded_write()?;
        let story = state
            .stories
            .get_mut(&story_id)
            .ok_or(StoryRepositoryError::NotFound(story_id))?;
        story.set_character_reference(image.clone(), character_names);
        Ok(())
    }

    async fn update_page_illustration(
        &self,
        story_id: StoryId,
        page_id: PageId,
        update: &PageIllustrationUpdate,
    ) -> StoryRepositoryResult<()> {
        let mut state = self.guarded_write()?;
        let story = state
            .stories
            .get_mut(&story_id)
            .ok_or(StoryRepositoryError::NotFound(story_id))?;
        story
            .apply_page_update(page_id, update)
            .map_err(|err| match err {
                StoryDomainError::PageNotFound {
                    story_id: owner,
                    page_id: missing,
                } => StoryRepositoryError::PageNotFound {
                    story_id: owner,
                    page_id: missing,
                },
                other => StoryRepositoryError::persistence(other),
            })
    }
}
