//! When steps for story illustration BDD scenarios.

use super::world::{IllustrationWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::when;

#[when("the story is illustrated")]
fn story_is_illustrated(world: &mut IllustrationWorld) -> Result<(), eyre::Report> {
    world.ensure_planned()?;
    run_async(world.scheduler.run_until_idle()).wrap_err("run scheduler until idle")?;
    Ok(())
}

#[when("the story is cancelled")]
fn story_is_cancelled(world: &mut IllustrationWorld) -> Result<(), eyre::Report> {
    world.ensure_planned()?;
    let story_id = world.story()?.id();
    run_async(world.scheduler.cancel_story(story_id)).wrap_err("cancel story")?;
    Ok(())
}
