//! In-memory integration tests for illustrating whole stories.

use super::helpers::{Studio, guided_story, plain_story, studio};
use picturebook::{
    generation::adapters::memory::InMemoryImageBackend,
    illustration::scheduler::{SchedulerConfig, TaskEvent},
    story::{domain::IllustrationStatus, ports::StoryRepository},
};
use eyre::{OptionExt, ensure};
use rstest::rstest;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::time::Duration;

#[rstest]
#[tokio::test(start_paused = true)]
async fn slow_backend_never_exceeds_worker_limit() -> eyre::Result<()> {
    let workers = NonZeroUsize::new(3).ok_or_eyre("non-zero limit")?;
    let studio = Studio::with_backend(
        InMemoryImageBackend::new().with_latency(Duration::from_secs(4)),
        SchedulerConfig::immediate()
            .with_max_concurrent_generations(workers)
            .with_dispatch_timeout(Duration::from_secs(30)),
    );
    let story = guided_story("Kite Day", 8);
    studio.stories.store(&story).await?;
    studio.scheduler.plan_story(&story)?;

    studio.scheduler.run_until_idle().await?;
    ensure!(
        studio.backend.peak_concurrency() == 3,
        "peak concurrency {} must equal the worker limit",
        studio.backend.peak_concurrency()
    );
    ensure!(studio.scheduler.story_progress(story.id()).is_complete(), "story must complete");

    let stored = studio
        .stories
        .find_by_id(story.id())
        .await?
        .ok_or_eyre("story should be stored")?;
    let distinct: HashSet<Vec<u8>> = stored
        .pages()
        .iter()
        .filter_map(|page| page.illustration())
        .map(|image| image.as_bytes().to_vec())
        .collect();
    ensure!(distinct.len() == 8, "each page must get its own illustration");
    Ok(())
}

#[rstest]
#[tokio::test]
async fn stories_are_illustrated_independently(studio: Studio) -> eyre::Result<()> {
    let kept = guided_story("Kite Day", 3);
    let cancelled = guided_story("Rainy Day", 3);
    studio.stories.store(&kept).await?;
    studio.stories.store(&cancelled).await?;
    studio.scheduler.plan_story(&kept)?;
    studio.scheduler.plan_story(&cancelled)?;

    studio.scheduler.cancel_story(cancelled.id()).await?;
    studio.scheduler.run_until_idle().await?;

    ensure!(studio.scheduler.story_progress(kept.id()).is_complete(), "kept story must complete");
    let abandoned = studio.scheduler.story_progress(cancelled.id());
    ensure!(abandoned.abandoned == 4 && abandoned.ready == 0, "cancelled story must not run: {abandoned:?}");
    ensure!(studio.backend.request_count() == 4, "only the kept story reaches the backend");
    ensure!(studio.cache.has(kept.id()), "kept reference must be cached");
    ensure!(!studio.cache.has(cancelled.id()), "cancelled story has no reference");
    Ok(())
}

#[rstest]
#[tokio::test]
async fn story_without_guide_skips_master_reference(studio: Studio) -> eyre::Result<()> {
    let story = plain_story("Quiet Day", 2);
    studio.stories.store(&story).await?;
    let plan = studio.scheduler.plan_story(&story)?;
    ensure!(plan.reference_task().is_none(), "no reference task expected");

    studio.scheduler.run_until_idle().await?;
    ensure!(studio.scheduler.story_progress(story.id()).is_complete(), "story must complete");
    ensure!(
        studio
            .backend
            .requests()
            .iter()
            .all(|request| request.master_reference().is_none()),
        "plain pages carry no master reference"
    );
    ensure!(
        !studio.pipeline.references().has_character_references(&story),
        "no reference may be produced"
    );
    Ok(())
}

#[rstest]
#[tokio::test]
async fn page_statuses_follow_the_scheduler(studio: Studio) -> eyre::Result<()> {
    let story = guided_story("Kite Day", 2);
    studio.stories.store(&story).await?;
    let mut events = studio.scheduler.subscribe();
    studio.scheduler.plan_story(&story)?;

    studio.scheduler.run_until_idle().await?;
    let stored = studio
        .stories
        .find_by_id(story.id())
        .await?
        .ok_or_eyre("story should be stored")?;
    ensure!(
        stored
            .pages()
            .iter()
            .all(|page| page.illustration_status() == IllustrationStatus::Ready),
        "every page must show ready"
    );

    let mut ready = 0;
    while let Ok(event) = events.try_recv() {
        ensure!(event.story_id() == story.id(), "events must name the story");
        if let TaskEvent::StatusChanged { status, .. } = event
            && status.is_terminal()
        {
            ready += 1;
        }
    }
    ensure!(ready == 3, "reference and both pages must report completion, saw {ready}");

    ensure!(studio.scheduler.forget_story(story.id()) == 3, "forget removes every task");
    ensure!(studio.scheduler.story_tasks(story.id()).is_empty(), "forgotten story has no tasks");
    Ok(())
}

#[rstest]
#[tokio::test]
async fn backend_outage_fails_reference_and_blocks_pages() -> eyre::Result<()> {
    let backend = InMemoryImageBackend::new();
    backend.fail_always("service unavailable");
    let studio = Studio::with_backend(backend, SchedulerConfig::immediate().with_max_attempts(2));
    let story = guided_story("Kite Day", 3);
    studio.stories.store(&story).await?;
    let plan = studio.scheduler.plan_story(&story)?;
    let reference_id = plan.reference_task().ok_or_eyre("story needs a reference")?.id();

    studio.scheduler.run_until_idle().await?;
    let progress = studio.scheduler.story_progress(story.id());
    ensure!(progress.failed == 1 && progress.blocked == 3, "pages must be blocked: {progress:?}");
    ensure!(studio.backend.request_count() == 2, "reference tried twice");

    studio.backend.recover();
    studio.scheduler.retry_task(reference_id).await?;
    studio.scheduler.run_until_idle().await?;
    ensure!(studio.scheduler.story_progress(story.id()).is_complete(), "retry must finish the story");
    Ok(())
}
