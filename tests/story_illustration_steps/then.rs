//! Then steps for story illustration BDD scenarios.

use super::world::{IllustrationWorld, run_async};
use eyre::{OptionExt, ensure};
use picturebook::story::{domain::Story, ports::StoryRepository};
use rstest_bdd_macros::then;

fn stored_story(world: &IllustrationWorld) -> Result<Story, eyre::Report> {
    let story_id = world.story()?.id();
    run_async(world.stories.find_by_id(story_id))?.ok_or_eyre("story should be stored")
}

#[then("every page of the story has an illustration")]
fn every_page_illustrated(world: &IllustrationWorld) -> Result<(), eyre::Report> {
    let story = stored_story(world)?;
    for page in story.pages() {
        ensure!(
            page.illustration().is_some(),
            "page {} has no illustration ({})",
            page.page_index(),
            page.illustration_status()
        );
    }
    Ok(())
}

#[then("every page request carried the master reference")]
fn page_requests_carry_reference(world: &IllustrationWorld) -> Result<(), eyre::Report> {
    let story = stored_story(world)?;
    let reference = story
        .character_reference()
        .ok_or_eyre("story should hold a master reference")?;
    let requests = world.backend.requests();
    let page_requests = requests.get(1..).unwrap_or_default();
    ensure!(page_requests.len() == story.pages().len(), "one request per page expected");
    ensure!(
        page_requests
            .iter()
            .all(|request| request.master_reference() == Some(reference)),
        "every page request must carry the master reference"
    );
    Ok(())
}

#[then("the master reference task took {attempts:u32} attempts")]
fn reference_attempts(world: &IllustrationWorld, attempts: u32) -> Result<(), eyre::Report> {
    let plan = world.plan.as_ref().ok_or_eyre("missing plan")?;
    let reference_id = plan.reference_task().ok_or_eyre("plan has no reference")?.id();
    let task = world
        .scheduler
        .task(reference_id)
        .ok_or_eyre("reference task should stay queued")?;
    ensure!(
        task.attempt_count() == attempts,
        "expected {attempts} attempts, found {}",
        task.attempt_count()
    );
    Ok(())
}

#[then(r#"the master reference task is "{status}""#)]
fn reference_status(world: &IllustrationWorld, status: String) -> Result<(), eyre::Report> {
    let plan = world.plan.as_ref().ok_or_eyre("missing plan")?;
    let reference_id = plan.reference_task().ok_or_eyre("plan has no reference")?.id();
    let task = world
        .scheduler
        .task(reference_id)
        .ok_or_eyre("reference task should stay queued")?;
    ensure!(
        task.status().as_str() == status,
        "expected status {status}, found {}",
        task.status()
    );
    Ok(())
}

#[then(r#"every page of the story shows "{status}""#)]
fn every_page_shows(world: &IllustrationWorld, status: String) -> Result<(), eyre::Report> {
    let story = stored_story(world)?;
    for page in story.pages() {
        ensure!(
            page.illustration_status().as_str() == status,
            "page {} shows {}",
            page.page_index(),
            page.illustration_status()
        );
    }
    Ok(())
}

#[then("{count:usize} page tasks are blocked")]
fn page_tasks_blocked(world: &IllustrationWorld, count: usize) -> Result<(), eyre::Report> {
    let progress = world.scheduler.story_progress(world.story()?.id());
    ensure!(progress.blocked == count, "unexpected progress {progress:?}");
    Ok(())
}

#[then("the backend received {count:usize} requests")]
fn backend_requests(world: &IllustrationWorld, count: usize) -> Result<(), eyre::Report> {
    let received = world.backend.request_count();
    ensure!(received == count, "expected {count} requests, found {received}");
    Ok(())
}
