//! Given steps for story illustration BDD scenarios.

use super::world::{IllustrationWorld, run_async};
use eyre::WrapErr;
use mockable::DefaultClock;
use picturebook::story::{
    domain::{Story, VisualGuide},
    ports::StoryRepository,
};
use rstest_bdd_macros::given;

#[given(r#"a story "{title}" with {pages:usize} pages featuring "{first}" and "{second}""#)]
fn story_with_pages(
    world: &mut IllustrationWorld,
    title: String,
    pages: usize,
    first: String,
    second: String,
) -> Result<(), eyre::Report> {
    let guide = VisualGuide::new("Loose ink lines with flat autumn colours")
        .with_character(first.clone(), format!("{first}, drawn in a green cap"))
        .with_character(second.clone(), format!("{second}, drawn with a red scarf"));
    let mut story = Story::new(title, &DefaultClock)?
        .with_visual_guide(guide)
        .with_character_names([first, second]);
    for index in 0..pages {
        story = story.with_page(format!("Scene {index} of the adventure."));
    }
    run_async(world.stories.store(&story)).wrap_err("store story for scenario")?;
    world.story = Some(story);
    Ok(())
}

#[given("the backend fails the next {count:usize} calls")]
fn backend_fails_next(world: &mut IllustrationWorld, count: usize) {
    world.backend.fail_next(count, "rate limited");
}

#[given("the backend is unavailable")]
fn backend_unavailable(world: &mut IllustrationWorld) {
    world.backend.fail_always("service unavailable");
}
