//! When steps for master character reference BDD scenarios.

use super::world::{ReferenceWorld, run_async};
use eyre::OptionExt;
use rstest_bdd_macros::when;

#[when("the master reference is generated")]
fn master_reference_generated(world: &mut ReferenceWorld) -> Result<(), eyre::Report> {
    let story = world.story()?.clone();
    let result = run_async(world.service.generate_complete_master_reference(&story));
    world.last_result = Some(result);
    Ok(())
}

#[when("story writes are accepted")]
fn story_writes_accepted(world: &mut ReferenceWorld) -> Result<(), eyre::Report> {
    world.stories.accept_writes()?;
    Ok(())
}

#[when("the preserved reference is cached again")]
fn preserved_reference_cached(world: &mut ReferenceWorld) -> Result<(), eyre::Report> {
    let info = world
        .last_result
        .as_ref()
        .and_then(|result| result.as_ref().err())
        .and_then(|err| err.generated_info())
        .cloned()
        .ok_or_eyre("previous attempt preserved no reference")?;
    let story = world.story()?.clone();
    let updated = run_async(world.service.cache_master_reference(info.clone(), &story))?;
    world.story = Some(updated);
    world.last_result = Some(Ok(info));
    Ok(())
}
