//! In-memory integration tests for master reference generation and reuse.

use super::helpers::{Studio, guided_story, studio};
use camino::Utf8Path;
use eyre::{OptionExt, ensure};
use mockable::DefaultClock;
use picturebook::{
    generation::adapters::memory::InMemoryImageBackend,
    reference::{
        adapters::FileSystemSnapshotStore,
        cache::{MasterReferenceCache, MasterReferenceCacheConfig},
        domain::CharacterReferenceError,
        services::CharacterReferenceService,
    },
    story::{adapters::memory::InMemoryStoryRepository, ports::StoryRepository},
};
use rstest::rstest;
use std::sync::Arc;

type TestReferenceService =
    CharacterReferenceService<InMemoryImageBackend, InMemoryStoryRepository, DefaultClock>;

fn reference_service(
    backend: &Arc<InMemoryImageBackend>,
    stories: &Arc<InMemoryStoryRepository>,
    cache: MasterReferenceCache,
) -> TestReferenceService {
    CharacterReferenceService::new(
        Arc::clone(backend),
        Arc::clone(stories),
        cache,
        Arc::new(DefaultClock),
    )
}

#[rstest]
#[tokio::test]
async fn complete_reference_is_stored_and_cached(studio: Studio) -> eyre::Result<()> {
    let story = guided_story("Kite Day", 1);
    studio.stories.store(&story).await?;
    let references = studio.pipeline.references();

    let info = references.generate_complete_master_reference(&story).await?;
    ensure!(info.story_id() == story.id(), "reference must name its story");
    ensure!(
        info.descriptive_mapping()
            == [
                "Tomas: a tall boy in a green cap with a kite",
                "Juniper: a small brown dog with one white ear",
                "Windmill Hill: a grassy hill crowned by a red windmill",
            ],
        "unexpected mapping {:?}",
        info.descriptive_mapping()
    );

    let stored = studio
        .stories
        .find_by_id(story.id())
        .await?
        .ok_or_eyre("story should be stored")?;
    ensure!(
        stored.character_reference() == Some(info.image_data()),
        "story must hold the reference bytes"
    );
    ensure!(studio.cache.get(story.id()) == Some(info.clone()), "cache must hold the reference");
    ensure!(!references.is_generating(), "no generation may remain active");

    let prompt = studio
        .backend
        .requests()
        .first()
        .map(|request| request.prompt().to_owned())
        .ok_or_eyre("one backend request expected")?;
    for name in ["Tomas", "Juniper", "Windmill Hill"] {
        ensure!(prompt.contains(&format!("CHARACTER - {name}:")), "prompt misses {name}");
    }
    Ok(())
}

#[rstest]
#[tokio::test]
async fn undefined_element_never_reaches_backend(studio: Studio) -> eyre::Result<()> {
    let story = guided_story("Kite Day", 1)
        .with_character_names(["Tomas", "Grandma"].map(str::to_owned));
    studio.stories.store(&story).await?;

    let result = studio
        .pipeline
        .references()
        .generate_complete_master_reference(&story)
        .await;
    ensure!(
        result == Err(CharacterReferenceError::VisualElementNotFound("Grandma".to_owned())),
        "unexpected result {result:?}"
    );
    ensure!(studio.backend.request_count() == 0, "backend must not be called");
    Ok(())
}

#[rstest]
#[tokio::test]
async fn snapshot_survives_a_restart() -> eyre::Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let root = Utf8Path::from_path(temp_dir.path()).ok_or_eyre("utf-8 temp path")?;
    let snapshots = root.join("references");
    let backend = Arc::new(InMemoryImageBackend::new());
    let stories = Arc::new(InMemoryStoryRepository::new());
    let story = guided_story("Kite Day", 1);
    stories.store(&story).await?;

    let first_cache = MasterReferenceCache::new(MasterReferenceCacheConfig::unbounded())
        .with_snapshot_store(Arc::new(FileSystemSnapshotStore::open(&snapshots)?));
    let generated = reference_service(&backend, &stories, first_cache)
        .generate_complete_master_reference(&story)
        .await?;

    let restarted_cache = MasterReferenceCache::new(MasterReferenceCacheConfig::unbounded())
        .with_snapshot_store(Arc::new(FileSystemSnapshotStore::open(&snapshots)?));
    ensure!(restarted_cache.is_empty(), "a new cache starts cold");
    let restored = restarted_cache
        .get(story.id())
        .ok_or_eyre("snapshot should be reloaded")?;
    ensure!(restored == generated, "reloaded reference must match the original");

    let detached = guided_story("Kite Day", 1);
    let service = reference_service(&backend, &stories, restarted_cache);
    ensure!(
        service.get_master_reference(&detached).is_none(),
        "a different story must not see the reference"
    );
    ensure!(backend.request_count() == 1, "restart must not regenerate");
    Ok(())
}
