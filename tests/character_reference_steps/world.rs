//! Shared world state for master character reference BDD scenarios.

use std::sync::Arc;

use eyre::OptionExt;
use mockable::DefaultClock;
use picturebook::{
    generation::adapters::memory::InMemoryImageBackend,
    reference::{
        cache::{MasterReferenceCache, MasterReferenceCacheConfig},
        domain::{MasterReferenceInfo, ReferenceResult},
        services::CharacterReferenceService,
    },
    story::{
        adapters::memory::InMemoryStoryRepository,
        domain::{Story, VisualGuide},
    },
};
use rstest::fixture;

/// Service type used by the BDD world.
pub type TestReferenceService =
    CharacterReferenceService<InMemoryImageBackend, InMemoryStoryRepository, DefaultClock>;

/// Scenario world for master reference behaviour tests.
pub struct ReferenceWorld {
    pub backend: Arc<InMemoryImageBackend>,
    pub stories: Arc<InMemoryStoryRepository>,
    pub service: TestReferenceService,
    pub guide: Option<VisualGuide>,
    pub story: Option<Story>,
    pub last_result: Option<ReferenceResult<MasterReferenceInfo>>,
}

impl ReferenceWorld {
    /// Creates a world with an instant backend and an empty cache.
    #[must_use]
    pub fn new() -> Self {
        let backend = Arc::new(InMemoryImageBackend::new());
        let stories = Arc::new(InMemoryStoryRepository::new());
        let service = CharacterReferenceService::new(
            Arc::clone(&backend),
            Arc::clone(&stories),
            MasterReferenceCache::new(MasterReferenceCacheConfig::unbounded()),
            Arc::new(DefaultClock),
        );

        Self {
            backend,
            stories,
            service,
            guide: None,
            story: None,
            last_result: None,
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
}

impl Default for ReferenceWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> ReferenceWorld {
    ReferenceWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
