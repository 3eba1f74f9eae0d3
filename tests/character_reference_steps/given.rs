//! Given steps for master character reference BDD scenarios.

use super::world::{ReferenceWorld, run_async};
use eyre::{OptionExt, WrapErr};
use mockable::DefaultClock;
use picturebook::story::{
    domain::{Story, VisualGuide},
    ports::StoryRepository,
};
use rstest_bdd_macros::given;

#[given(r#"a visual guide defining "{first}" and "{second}""#)]
fn visual_guide_defining(world: &mut ReferenceWorld, first: String, second: String) {
    world.guide = Some(
        VisualGuide::new("Loose ink lines with flat autumn colours")
            .with_character(first.clone(), format!("{first} in a green cap"))
            .with_character(second.clone(), format!("{second} with one white ear")),
    );
}

#[given(r#"a story listing "{first}" and "{second}""#)]
fn story_listing(
    world: &mut ReferenceWorld,
    first: String,
    second: String,
) -> Result<(), eyre::Report> {
    let guide = world
        .guide
        .clone()
        .ok_or_eyre("missing visual guide in scenario world")?;
    let story = Story::new("Kite Day", &DefaultClock)?
        .with_visual_guide(guide)
        .with_character_names([first, second])
        .with_page("Tomas and Juniper climb the hill.");
    run_async(world.stories.store(&story)).wrap_err("store story for scenario")?;
    world.story = Some(story);
    Ok(())
}

#[given("story writes are rejected")]
fn story_writes_rejected(world: &mut ReferenceWorld) -> Result<(), eyre::Report> {
    world.stories.reject_writes("disk full")?;
    Ok(())
}
