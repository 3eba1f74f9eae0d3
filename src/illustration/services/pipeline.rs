//! The executor that turns scheduled tasks into stored artwork.
//!
//! Provides [`IllustrationPipeline`], which binds the reference service,
//! the generation backend and the story repository behind the
//! [`TaskExecutor`] port.

use super::PagePrompt;
use crate::generation::{domain::GenerationRequest, ports::ImageGenerationBackend};
use crate::illustration::{
    domain::{IllustrationPlan, IllustrationTask, TaskType},
    ports::{
        CommitPermit, DispatchContext, TaskExecutionError, TaskExecutionResult, TaskExecutor,
        TaskOutput,
    },
};
use crate::reference::{
    cache::MasterReferenceCache,
    domain::{MasterReferenceInfo, VisualElementNames, descriptive_mapping},
    services::CharacterReferenceService,
};
use crate::story::{
    domain::{Page, PageId, PageIllustrationUpdate, Story, StoryId},
    ports::StoryRepository,
};
use async_trait::async_trait;
use mockable::Clock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Illustration executor over the reference service, backend and stories.
///
/// A master reference that was generated but could not be written is kept
/// per story, so the next attempt only repeats the write. It is reused only
/// while the story's element names and descriptions are unchanged, and it is
/// dropped when the story is cancelled or forgotten.
pub struct IllustrationPipeline<B, R, C>
where
    B: ImageGenerationBackend,
    R: StoryRepository,
    C: Clock + Send + Sync,
{
    references: CharacterReferenceService<B, R, C>,
    backend: Arc<B>,
    stories: Arc<R>,
    unsaved: Mutex<HashMap<StoryId, MasterReferenceInfo>>,
}

impl<B, R, C> IllustrationPipeline<B, R, C>
where
    B: ImageGenerationBackend,
    R: StoryRepository,
    C: Clock + Send + Sync,
{
    /// Creates a pipeline sharing `cache` with its reference service.
    #[must_use]
    pub fn new(
        backend: Arc<B>,
        stories: Arc<R>,
        cache: MasterReferenceCache,
        clock: Arc<C>,
    ) -> Self {
        let references = CharacterReferenceService::new(
            Arc::clone(&backend),
            Arc::clone(&stories),
            cache,
            clock,
        );
        Self {
            references,
            backend,
            stories,
            unsaved: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the reference service used for master references.
    #[must_use]
    pub const fn references(&self) -> &CharacterReferenceService<B, R, C> {
        &self.references
    }

    /// Returns `true` when a generated reference for the story awaits a
    /// successful write.
    #[must_use]
    pub fn has_unsaved_reference(&self, story_id: StoryId) -> bool {
        self.unsaved().contains_key(&story_id)
    }

    fn unsaved(&self) -> MutexGuard<'_, HashMap<StoryId, MasterReferenceInfo>> {
        self.unsaved.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn load_story(&self, story_id: StoryId) -> TaskExecutionResult<Story> {
        self.stories
            .find_by_id(story_id)
            .await?
            .ok_or(TaskExecutionError::StoryNotFound(story_id))
    }

    async fn execute_reference(&self, story: &Story) -> TaskExecutionResult<TaskOutput> {
        let retained = self.unsaved().remove(&story.id());
        if let Some(info) = retained {
            if still_describes(&info, story) {
                debug!(story_id = %story.id(), "reusing generated master reference for caching retry");
                return Ok(TaskOutput::MasterReference(Box::new(info)));
            }
            debug!(story_id = %story.id(), "story changed; regenerating master reference");
        }
        let info = self.references.build_master_reference(story).await?;
        Ok(TaskOutput::MasterReference(Box::new(info)))
    }

    async fn execute_page(
        &self,
        task: &IllustrationTask,
        story: &Story,
        context: &DispatchContext,
    ) -> TaskExecutionResult<TaskOutput> {
        let page_id = target_page(task)?;
        let page = story
            .page(page_id)
            .ok_or(TaskExecutionError::PageNotFound {
                story_id: story.id(),
                page_id: Some(page_id),
            })?;

        let master_reference = self.references.get_master_reference(story);
        if master_reference.is_none() && IllustrationPlan::requires_master_reference(story) {
            return Err(TaskExecutionError::MissingMasterReference(story.id()));
        }
        let previous_page = context
            .previous_page()
            .and_then(|previous_id| story.page(previous_id))
            .and_then(Page::illustration)
            .cloned();

        let prompt = PagePrompt::render(
            story,
            page,
            master_reference.is_some(),
            previous_page.is_some(),
        )?;
        let mut request = GenerationRequest::new(prompt.into_inner());
        if let Some(reference) = master_reference {
            request = request.with_master_reference(reference);
        }
        if let Some(previous) = previous_page {
            request = request.with_previous_page(previous);
        }

        let image = self.backend.generate_image(&request).await?;
        image.validate()?;
        Ok(TaskOutput::PageIllustration(image))
    }
}

fn still_describes(info: &MasterReferenceInfo, story: &Story) -> bool {
    VisualElementNames::new(story.character_names())
        .is_ok_and(|names| &names == info.visual_element_names())
        && info.descriptive_mapping() == descriptive_mapping(story).as_slice()
}

fn admit(permit: &CommitPermit, story_id: StoryId) -> TaskExecutionResult<()> {
    if permit.admit() {
        Ok(())
    } else {
        debug!(story_id = %story_id, "commit refused for cancelled story");
        Err(TaskExecutionError::Cancelled(story_id))
    }
}

fn target_page(task: &IllustrationTask) -> TaskExecutionResult<PageId> {
    task.page_id().ok_or(TaskExecutionError::PageNotFound {
        story_id: task.story_id(),
        page_id: None,
    })
}

#[async_trait]
impl<B, R, C> TaskExecutor for IllustrationPipeline<B, R, C>
where
    B: ImageGenerationBackend,
    R: StoryRepository,
    C: Clock + Send + Sync,
{
    async fn execute(
        &self,
        task: &IllustrationTask,
        context: &DispatchContext,
    ) -> TaskExecutionResult<TaskOutput> {
        let story = self.load_story(task.story_id()).await?;
        match task.task_type() {
            TaskType::GlobalReference => self.execute_reference(&story).await,
            TaskType::PageIllustration => self.execute_page(task, &story, context).await,
        }
    }

    async fn commit(
        &self,
        task: &IllustrationTask,
        output: TaskOutput,
        permit: &CommitPermit,
    ) -> TaskExecutionResult<()> {
        match output {
            TaskOutput::MasterReference(info) => {
                let story = self.load_story(task.story_id()).await?;
                admit(permit, story.id())?;
                match self.references.cache_master_reference(*info, &story).await {
                    Ok(_) => {
                        info!(story_id = %story.id(), "master reference stored");
                        Ok(())
                    }
                    Err(err) => {
                        if let Some(generated) = err.generated_info() {
                            self.unsaved().insert(story.id(), generated.clone());
                        }
                        Err(err.into())
                    }
                }
            }
            TaskOutput::PageIllustration(image) => {
                let page_id = target_page(task)?;
                admit(permit, task.story_id())?;
                self.stories
                    .update_page_illustration(
                        task.story_id(),
                        page_id,
                        &PageIllustrationUpdate::completed(image),
                    )
                    .await?;
                Ok(())
            }
        }
    }

    async fn publish_status(&self, task: &IllustrationTask) -> TaskExecutionResult<()> {
        let Some(page_id) = task.page_id() else {
            return Ok(());
        };
        self.stories
            .update_page_illustration(
                task.story_id(),
                page_id,
                &PageIllustrationUpdate::status(task.status().into()),
            )
            .await?;
        Ok(())
    }

    fn forget_story(&self, story_id: StoryId) {
        if self.unsaved().remove(&story_id).is_some() {
            debug!(story_id = %story_id, "dropped unsaved master reference");
        }
    }
}
