//! Shared test helpers for in-memory integration tests.

use picturebook::{
    generation::adapters::memory::InMemoryImageBackend,
    illustration::{
        scheduler::{IllustrationScheduler, SchedulerConfig},
        services::IllustrationPipeline,
    },
    reference::cache::{MasterReferenceCache, MasterReferenceCacheConfig},
    story::{
        adapters::memory::InMemoryStoryRepository,
        domain::{Story, VisualGuide},
    },
};
use mockable::DefaultClock;
use rstest::fixture;
use std::sync::Arc;

/// Pipeline over the in-memory adapters.
pub type TestPipeline =
    IllustrationPipeline<InMemoryImageBackend, InMemoryStoryRepository, DefaultClock>;

/// Scheduler driving a [`TestPipeline`].
pub type TestScheduler = IllustrationScheduler<TestPipeline, DefaultClock>;

/// In-memory adapters wired to a pipeline and scheduler.
pub struct Studio {
    pub backend: Arc<InMemoryImageBackend>,
    pub stories: Arc<InMemoryStoryRepository>,
    pub cache: MasterReferenceCache,
    pub pipeline: Arc<TestPipeline>,
    pub scheduler: TestScheduler,
}

impl Studio {
    /// Wires a studio around `backend` with the given scheduler settings.
    #[must_use]
    pub fn with_backend(image_backend: InMemoryImageBackend, config: SchedulerConfig) -> Self {
        let backend = Arc::new(image_backend);
        let stories = Arc::new(InMemoryStoryRepository::new());
        let cache = MasterReferenceCache::new(MasterReferenceCacheConfig::unbounded());
        let pipeline = Arc::new(IllustrationPipeline::new(
            Arc::clone(&backend),
            Arc::clone(&stories),
            cache.clone(),
            Arc::new(DefaultClock),
        ));
        let scheduler =
            IllustrationScheduler::new(Arc::clone(&pipeline), Arc::new(DefaultClock), config);
        Self {
            backend,
            stories,
            cache,
            pipeline,
            scheduler,
        }
    }
}

/// Provides a studio with an instant backend and no retry delay.
#[fixture]
pub fn studio() -> Studio {
    Studio::with_backend(InMemoryImageBackend::new(), SchedulerConfig::immediate())
}

/// Builds a story with a visual guide, two characters and a setting.
#[must_use]
pub fn guided_story(title: &str, pages: usize) -> Story {
    let guide = VisualGuide::new("Loose ink lines with flat autumn colours")
        .with_character("Tomas", "a tall boy in a green cap with a kite")
        .with_character("Juniper", "a small brown dog with one white ear")
        .with_setting("Windmill Hill", "a grassy hill crowned by a red windmill");
    let mut story = Story::new(title, &DefaultClock)
        .expect("valid story")
        .with_visual_guide(guide)
        .with_character_names(["Tomas", "Juniper", "Windmill Hill"].map(str::to_owned));
    for index in 0..pages {
        story = story.with_page(format!("Scene {index}: Tomas and Juniper fly the kite."));
    }
    story
}

/// Builds a story with pages only.
#[must_use]
pub fn plain_story(title: &str, pages: usize) -> Story {
    let mut story = Story::new(title, &DefaultClock).expect("valid story");
    for index in 0..pages {
        story = story.with_page(format!("Scene {index} of a quiet day."));
    }
    story
}
