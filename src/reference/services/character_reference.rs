//! Master reference generation and caching.
//!
//! Provides [`CharacterReferenceService`], which turns a story's visual guide
//! and element names into one reference-sheet image, writes it back to the
//! story and keeps it in the shared [`MasterReferenceCache`].

use crate::generation::{
    domain::{GenerationRequest, ImageData},
    ports::ImageGenerationBackend,
};
use crate::reference::{
    cache::MasterReferenceCache,
    domain::{
        CharacterReferenceError, MasterReferenceInfo, ReferencePrompt, ReferenceResult,
        VisualElementNames, descriptive_mapping,
    },
};
use crate::story::{
    domain::{Story, StoryId},
    ports::StoryRepository,
};
use mockable::Clock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

type ActivityMap = Arc<Mutex<HashMap<StoryId, usize>>>;

fn lock_activity(activity: &Mutex<HashMap<StoryId, usize>>) -> MutexGuard<'_, HashMap<StoryId, usize>> {
    activity.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks a story as generating until dropped.
struct GenerationActivity {
    activity: ActivityMap,
    story_id: StoryId,
}

impl GenerationActivity {
    fn enter(activity: &ActivityMap, story_id: StoryId) -> Self {
        *lock_activity(activity).entry(story_id).or_insert(0) += 1;
        Self {
            activity: Arc::clone(activity),
            story_id,
        }
    }
}

impl Drop for GenerationActivity {
    fn drop(&mut self) {
        let mut active = lock_activity(&self.activity);
        if let Some(count) = active.get_mut(&self.story_id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                active.remove(&self.story_id);
            }
        }
    }
}

/// Character-consistency orchestration service.
///
/// Generations for different stories run independently. The generating
/// flag is advisory state for display; it never blocks a caller.
pub struct CharacterReferenceService<B, R, C>
where
    B: ImageGenerationBackend,
    R: StoryRepository,
    C: Clock + Send + Sync,
{
    backend: Arc<B>,
    stories: Arc<R>,
    cache: MasterReferenceCache,
    clock: Arc<C>,
    activity: ActivityMap,
}

impl<B, R, C> Clone for CharacterReferenceService<B, R, C>
where
    B: ImageGenerationBackend,
    R: StoryRepository,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            stories: Arc::clone(&self.stories),
            cache: self.cache.clone(),
            clock: Arc::clone(&self.clock),
            activity: Arc::clone(&self.activity),
        }
    }
}

impl<B, R, C> CharacterReferenceService<B, R, C>
where
    B: ImageGenerationBackend,
    R: StoryRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new character reference service.
    #[must_use]
    pub fn new(
        backend: Arc<B>,
        stories: Arc<R>,
        cache: MasterReferenceCache,
        clock: Arc<C>,
    ) -> Self {
        Self {
            backend,
            stories,
            cache,
            clock,
            activity: Arc::default(),
        }
    }

    /// Returns the shared cache.
    #[must_use]
    pub const fn cache(&self) -> &MasterReferenceCache {
        &self.cache
    }

    /// Generates the master reference image for a story.
    ///
    /// Renders one consolidated prompt and calls the backend exactly once.
    /// Preconditions are checked before any backend call.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterReferenceError::InvalidStoryData`] when the story
    /// has no visual guide, [`CharacterReferenceError::NoVisualElementsFound`]
    /// or [`CharacterReferenceError::UnsupportedElementCount`] when the name
    /// list is outside 1 to 10 entries, and
    /// [`CharacterReferenceError::MasterReferenceGenerationFailed`] or
    /// [`CharacterReferenceError::InvalidImageData`] when the backend fails.
    pub async fn generate_master_reference(&self, story: &Story) -> ReferenceResult<ImageData> {
        let (image, _) = self.generate_with_names(story).await?;
        Ok(image)
    }

    async fn generate_with_names(
        &self,
        story: &Story,
    ) -> ReferenceResult<(ImageData, VisualElementNames)> {
        let guide = story
            .visual_guide()
            .ok_or_else(|| CharacterReferenceError::InvalidStoryData {
                story_id: story.id(),
                reason: "story has no visual guide".to_owned(),
            })?;
        let names = VisualElementNames::new(story.character_names())?;
        let prompt = ReferencePrompt::render(guide, &names, story.collection_context())?;

        let _activity = GenerationActivity::enter(&self.activity, story.id());
        info!(
            story_id = %story.id(),
            elements = names.len(),
            "generating master reference"
        );
        let request = GenerationRequest::new(prompt.into_text());
        let image = self
            .backend
            .generate_image(&request)
            .await
            .map_err(|err| {
                warn!(story_id = %story.id(), error = %err, "master reference generation failed");
                CharacterReferenceError::MasterReferenceGenerationFailed(err.to_string())
            })?;
        let format = image.validate()?;
        debug!(
            story_id = %story.id(),
            format = format.extension(),
            bytes = image.len(),
            "master reference generated"
        );
        Ok((image, names))
    }

    /// Derives `name: description` lines for the story's elements.
    #[must_use]
    pub fn get_descriptive_mapping(&self, story: &Story) -> Vec<String> {
        descriptive_mapping(story)
    }

    /// Returns the story's master reference bytes.
    ///
    /// Reads the story's own copy first and falls back to the cache.
    #[must_use]
    pub fn get_master_reference(&self, story: &Story) -> Option<ImageData> {
        story.character_reference().cloned().or_else(|| {
            self.cache
                .get(story.id())
                .map(|info| info.image_data().clone())
        })
    }

    /// Writes a generated reference into the story and the cache.
    ///
    /// The story's element names are replaced by the reference's names when
    /// they differ. Returns the updated story copy.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterReferenceError::InvalidStoryData`] when the
    /// reference belongs to another story, and
    /// [`CharacterReferenceError::CachingFailed`] carrying `info` when the
    /// write cannot complete.
    pub async fn cache_master_reference(
        &self,
        info: MasterReferenceInfo,
        story: &Story,
    ) -> ReferenceResult<Story> {
        if info.story_id() != story.id() {
            return Err(CharacterReferenceError::InvalidStoryData {
                story_id: story.id(),
                reason: format!("reference belongs to story {}", info.story_id()),
            });
        }
        let names = info.visual_element_names().as_slice();
        if let Err(err) = self
            .stories
            .update_character_reference(story.id(), info.image_data(), names)
            .await
        {
            warn!(story_id = %story.id(), error = %err, "failed to cache master reference");
            return Err(CharacterReferenceError::CachingFailed {
                reason: err.to_string(),
                info: Box::new(info),
            });
        }

        let mut updated = story.clone();
        if updated.set_character_reference(info.image_data().clone(), names) {
            debug!(story_id = %story.id(), "reconciled character names with master reference");
        }
        self.cache.store(info).await;
        Ok(updated)
    }

    /// Generates, describes and caches a story's master reference.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Self::generate_master_reference`] or
    /// [`Self::cache_master_reference`]. A caching failure carries the
    /// generated reference so only the write needs repeating.
    pub async fn generate_complete_master_reference(
        &self,
        story: &Story,
    ) -> ReferenceResult<MasterReferenceInfo> {
        let info = self.build_master_reference(story).await?;
        self.cache_master_reference(info.clone(), story).await?;
        Ok(info)
    }

    /// Generates a master reference and its descriptive mapping without
    /// writing anything.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Self::generate_master_reference`].
    pub async fn build_master_reference(
        &self,
        story: &Story,
    ) -> ReferenceResult<MasterReferenceInfo> {
        let (image, names) = self.generate_with_names(story).await?;
        Ok(MasterReferenceInfo::new(
            story.id(),
            image,
            names,
            descriptive_mapping(story),
            &*self.clock,
        ))
    }

    /// Returns `true` when master reference bytes are available for the
    /// story.
    #[must_use]
    pub fn has_character_references(&self, story: &Story) -> bool {
        story.character_reference().is_some() || self.cache.has(story.id())
    }

    /// Returns `true` while any generation is in flight on this service.
    #[must_use]
    pub fn is_generating(&self) -> bool {
        !lock_activity(&self.activity).is_empty()
    }

    /// Returns `true` while a generation for the story is in flight.
    #[must_use]
    pub fn is_generating_for(&self, story_id: StoryId) -> bool {
        lock_activity(&self.activity).contains_key(&story_id)
    }
}
