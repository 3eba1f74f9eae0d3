//! Shared world state for story illustration BDD scenarios.

use std::sync::Arc;

use eyre::OptionExt;
use mockable::DefaultClock;
use picturebook::{
    generation::adapters::memory::InMemoryImageBackend,
    illustration::{
        domain::IllustrationPlan,
        scheduler::{IllustrationScheduler, SchedulerConfig},
        services::IllustrationPipeline,
    },
    reference::cache::{MasterReferenceCache, MasterReferenceCacheConfig},
    story::{adapters::memory::InMemoryStoryRepository, domain::Story},
};
use rstest::fixture;

/// Pipeline type used by the BDD world.
pub type TestPipeline =
    IllustrationPipeline<InMemoryImageBackend, InMemoryStoryRepository, DefaultClock>;

/// Scheduler type used by the BDD world.
pub type TestScheduler = IllustrationScheduler<TestPipeline, DefaultClock>;

/// Scenario world for story illustration behaviour tests.
pub struct IllustrationWorld {
    pub backend: Arc<InMemoryImageBackend>,
    pub stories: Arc<InMemoryStoryRepository>,
    pub scheduler: TestScheduler,
    pub story: Option<Story>,
    pub plan: Option<IllustrationPlan>,
}

impl IllustrationWorld {
    /// Creates a world with an instant backend and no retry delay.
    #[must_use]
    pub fn new() -> Self {
        let backend = Arc::new(InMemoryImageBackend::new());
        let stories = Arc::new(InMemoryStoryRepository::new());
        let pipeline = Arc::new(IllustrationPipeline::new(
            Arc::clone(&backend),
            Arc::clone(&stories),
            MasterReferenceCache::new(MasterReferenceCacheConfig::unbounded()),
            Arc::new(DefaultClock),
        ));
        let scheduler = IllustrationScheduler::new(
            pipeline,
            Arc::new(DefaultClock),
            SchedulerConfig::immediate(),
        );

        Self {
            backend,
            stories,
            scheduler,
            story: None,
            plan: None,
        }
    }

    /// Returns the story under test.
    ///
    /// # Errors
    ///
    /// Returns an error when no story was set up.
    pub fn story(&self) -> eyre::Result<&Story> {
        self.story
            .as_ref()
            .ok_or_eyre("missing story in scenario world")
    }

    /// Enqueues the story's plan unless it is already queued.
    ///
    /// # Errors
    ///
    /// Returns an error when no story was set up or planning fails.
    pub fn ensure_planned(&mut self) -> eyre::Result<&IllustrationPlan> {
        if self.plan.is_none() {
            let planned = self.scheduler.plan_story(self.story()?)?;
            self.plan = Some(planned);
        }
        self.plan.as_ref().ok_or_eyre("missing plan in scenario world")
    }
}

impl Default for IllustrationWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> IllustrationWorld {
    IllustrationWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
