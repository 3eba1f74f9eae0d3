//! Unit tests for the reference context.


use crate::generation::domain::ImageData;
use crate::reference::domain::{MasterReferenceInfo, VisualElementNames};
use crate::story::domain::{Story, StoryId, VisualGuide};
use mockable::DefaultClock;

pub(super) fn emma_guide() -> VisualGuide {
    VisualGuide::new("Soft watercolour with warm evening light")
        .with_character("Emma", "a curious seven-year-old with red braids and a yellow raincoat")
        .with_character("Dragon", "a small green dragon with round spectacles")
        .with_setting("Magic Wand", "a silver wand tipped with a glowing star")
}

pub(super) fn emma_story() -> Story {
    Story::new("Emma and the Dragon", &DefaultClock)
        .expect("valid story")
        .with_visual_guide(emma_guide())
        .with_character_names(["Emma", "Dragon", "Magic Wand"].map(str::to_owned))
        .with_page("Emma finds a dragon in the garden.")
        .with_page("The dragon shows Emma a magic wand.")
}

pub(super) fn sample_info(story_id: StoryId, marker: &[u8]) -> MasterReferenceInfo {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend_from_slice(marker);
    MasterReferenceInfo::new(
        story_id,
        ImageData::new(bytes),
        VisualElementNames::new(["Emma", "Dragon"]).expect("valid names"),
        vec!["Emma: a girl".to_owned(), "Dragon: a dragon".to_owned()],
        &DefaultClock,
    )
}
