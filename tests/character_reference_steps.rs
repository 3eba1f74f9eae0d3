//! Behaviour tests for master character reference generation.

#[path = "character_reference_steps/mod.rs"]
mod character_reference_steps_defs;

use character_reference_steps_defs::world::{ReferenceWorld, world};
use rstest_bdd_macros::scenario;

#[scenario(
    path = "tests/features/character_reference.feature",
    name = "Generate a master reference for defined characters"
)]
#[tokio::test(flavor = "multi_thread")]
async fn generate_reference_for_defined_characters(world: ReferenceWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/character_reference.feature",
    name = "Reject an undefined visual element"
)]
#[tokio::test(flavor = "multi_thread")]
async fn reject_undefined_visual_element(world: ReferenceWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/character_reference.feature",
    name = "Retry only the write after a caching failure"
)]
#[tokio::test(flavor = "multi_thread")]
async fn retry_write_after_caching_failure(world: ReferenceWorld) {
    let _ = world;
}
