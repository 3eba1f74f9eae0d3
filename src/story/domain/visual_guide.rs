//! Per-story style and element descriptions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Style guide plus character and setting descriptions for one story.
///
/// A story without a visual guide opts out of the character-consistency
/// subsystem entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualGuide {
    style_guide: String,
    #[serde(default)]
    character_definitions: BTreeMap<String, String>,
    #[serde(default)]
    setting_definitions: BTreeMap<String, String>,
}

impl VisualGuide {
    /// Creates a guide with the given free-text style description.
    #[must_use]
    pub fn new(style_guide: impl Into<String>) -> Self {
        Self {
            style_guide: style_guide.into(),
            character_definitions: BTreeMap::new(),
            setting_definitions: BTreeMap::new(),
        }
    }

    /// Adds or replaces a character description.
    #[must_use]
    pub fn with_character(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.character_definitions
            .insert(name.into(), description.into());
        self
    }

    /// Adds or replaces a setting description.
    #[must_use]
    pub fn with_setting(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.setting_definitions.insert(name.into(), description.into());
        self
    }

    /// Returns the style guide text.
    #[must_use]
    pub fn style_guide(&self) -> &str {
        &self.style_guide
    }

    /// Returns character descriptions keyed by name.
    #[must_use]
    pub const fn character_definitions(&self) -> &BTreeMap<String, String> {
        &self.character_definitions
    }

    /// Returns setting descriptions keyed by name.
    #[must_use]
    pub const fn setting_definitions(&self) -> &BTreeMap<String, String> {
        &self.setting_definitions
    }

    /// Looks up the description of a visual element.
    ///
    /// Characters are searched before settings. Names compare
    /// case-insensitively after trimming, so `"magic wand"` finds a
    /// definition stored as `"Magic Wand"`.
    #[must_use]
    pub fn describe(&self, name: &str) -> Option<&str> {
        let wanted = name.trim();
        find_definition(&self.character_definitions, wanted)
            .or_else(|| find_definition(&self.setting_definitions, wanted))
    }
}

fn find_definition<'a>(definitions: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    definitions.get(name).map(String::as_str).or_else(|| {
        definitions
            .iter()
            .find(|(key, _)| key.trim().eq_ignore_ascii_case(name))
            .map(|(_, description)| description.as_str())
    })
}
