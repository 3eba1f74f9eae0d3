//! Then steps for master character reference BDD scenarios.

use super::world::{ReferenceWorld, run_async};
use eyre::{OptionExt, ensure};
use picturebook::{reference::domain::CharacterReferenceError, story::ports::StoryRepository};
use rstest_bdd_macros::then;

#[then("the story holds the master reference")]
fn story_holds_reference(world: &ReferenceWorld) -> Result<(), eyre::Report> {
    let story_id = world.story()?.id();
    let stored = run_async(world.stories.find_by_id(story_id))?
        .ok_or_eyre("story should be stored")?;
    let info = match world.last_result.as_ref() {
        Some(Ok(info)) => info,
        other => return Err(eyre::eyre!("expected a generated reference, got {other:?}")),
    };
    ensure!(
        stored.character_reference() == Some(info.image_data()),
        "stored story must hold the generated reference"
    );
    ensure!(world.service.cache().has(story_id), "reference must be cached");
    Ok(())
}

#[then(r#"the reference prompt names "{name}""#)]
fn prompt_names(world: &ReferenceWorld, name: String) -> Result<(), eyre::Report> {
    let requests = world.backend.requests();
    let request = requests.first().ok_or_eyre("no backend request recorded")?;
    ensure!(
        request.prompt().contains(&format!("CHARACTER - {name}:")),
        "prompt does not name {name}: {}",
        request.prompt()
    );
    Ok(())
}

#[then(r#"generation fails because "{name}" is undefined"#)]
fn fails_with_undefined(world: &ReferenceWorld, name: String) -> Result<(), eyre::Report> {
    match world.last_result.as_ref() {
        Some(Err(CharacterReferenceError::VisualElementNotFound(missing))) if *missing == name => {
            Ok(())
        }
        other => Err(eyre::eyre!("expected undefined element {name}, got {other:?}")),
    }
}

#[then("generation fails with a caching error")]
fn fails_with_caching_error(world: &ReferenceWorld) -> Result<(), eyre::Report> {
    match world.last_result.as_ref() {
        Some(Err(err @ CharacterReferenceError::CachingFailed { .. })) => {
            ensure!(err.is_retryable(), "caching failure must be retryable");
            Ok(())
        }
        other => Err(eyre::eyre!("expected a caching failure, got {other:?}")),
    }
}

#[then("the backend received {count:usize} requests")]
fn backend_requests(world: &ReferenceWorld, count: usize) -> Result<(), eyre::Report> {
    let received = world.backend.request_count();
    ensure!(received == count, "expected {count} requests, found {received}");
    Ok(())
}
