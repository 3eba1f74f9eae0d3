//! Master reference record.

use super::VisualElementNames;
use crate::generation::domain::ImageData;
use crate::story::domain::StoryId;
use chrono::{DateTime, Utc};
use mockable::Clock;

/// A generated master reference and the metadata describing it.
///
/// Immutable once created; a newer generation for the same story replaces the
/// whole record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterReferenceInfo {
    story_id: StoryId,
    image_data: ImageData,
    visual_element_names: VisualElementNames,
    descriptive_mapping: Vec<String>,
    generated_at: DateTime<Utc>,
}

impl MasterReferenceInfo {
    /// Creates a record stamped with the current clock time.
    #[must_use]
    pub fn new(
        story_id: StoryId,
        image_data: ImageData,
        visual_element_names: VisualElementNames,
        descriptive_mapping: Vec<String>,
        clock: &impl Clock,
    ) -> Self {
        Self::restore(
            story_id,
            image_data,
            visual_element_names,
            descriptive_mapping,
            clock.utc(),
        )
    }

    /// Reconstructs a record from persisted storage.
    #[must_use]
    pub const fn restore(
        story_id: StoryId,
        image_data: ImageData,
        visual_element_names: VisualElementNames,
        descriptive_mapping: Vec<String>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            story_id,
            image_data,
            visual_element_names,
            descriptive_mapping,
            generated_at,
        }
    }

    /// Returns the owning story identifier.
    #[must_use]
    pub const fn story_id(&self) -> StoryId {
        self.story_id
    }

    /// Returns the reference image bytes.
    #[must_use]
    pub const fn image_data(&self) -> &ImageData {
        &self.image_data
    }

    /// Returns the names of the elements drawn on the sheet.
    #[must_use]
    pub const fn visual_element_names(&self) -> &VisualElementNames {
        &self.visual_element_names
    }

    /// Returns the `name: description` lines used to build the prompt.
    #[must_use]
    pub fn descriptive_mapping(&self) -> &[String] {
        &self.descriptive_mapping
    }

    /// Returns the generation timestamp.
    #[must_use]
    pub const fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }
}
