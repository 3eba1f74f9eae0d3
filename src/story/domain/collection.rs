//! Collection-level visual context shared by related stories.

use serde::{Deserialize, Serialize};

/// Visual context shared by every story in a collection.
///
/// Consistency at the collection level is expressed through prompt text only;
/// nothing verifies generated images against it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionVisualContext {
    /// Identifier of the owning collection.
    pub collection_id: String,
    /// Collection theme, such as "bedtime adventures".
    pub theme: String,
    /// Art style applied across the collection.
    pub unified_art_style: String,
    /// Characters that recur across the collection.
    pub shared_characters: Vec<String>,
    /// Props that recur across the collection.
    pub shared_props: Vec<String>,
    /// Whether recurring characters must look identical across stories.
    pub requires_character_consistency: bool,
    /// Whether individual stories may deviate from the unified style.
    pub allows_style_variation: bool,
}

impl CollectionVisualContext {
    /// Creates a context for the given collection, theme and art style.
    #[must_use]
    pub fn new(
        collection_id: impl Into<String>,
        theme: impl Into<String>,
        unified_art_style: impl Into<String>,
    ) -> Self {
        Self {
            collection_id: collection_id.into(),
            theme: theme.into(),
            unified_art_style: unified_art_style.into(),
            requires_character_consistency: true,
            ..Self::default()
        }
    }

    /// Returns the consistency instruction appended to prompts.
    #[must_use]
    pub const fn consistency_directive(&self) -> &'static str {
        match (
            self.requires_character_consistency,
            self.allows_style_variation,
        ) {
            (true, false) => "Keep recurring characters and the art style identical across the collection.",
            (true, true) => "Keep recurring characters identical; minor style variation is allowed.",
            (false, false) => "Keep the art style consistent across the collection.",
            (false, true) => "Style variation across the collection is allowed.",
        }
    }
}
