//! Consolidated reference-sheet prompt construction.

use super::{CharacterReferenceError, VisualElementNames};
use crate::story::domain::{CollectionVisualContext, Story, VisualGuide};
use minijinja::{Environment, context};
use serde::Serialize;

const REFERENCE_SHEET_TEMPLATE: &str = "\
Character reference sheet for a children's picture book.
Draw every element below once, full figure, side by side on a plain light background, clearly separated.
{% for element in elements %}CHARACTER - {{ element.name }}: {{ element.description }}
{% endfor %}STYLE GUIDE: {{ style_guide }}
{% if collection %}COLLECTION STYLE: {{ collection.unified_art_style }} (theme: {{ collection.theme }})
{{ collection.directive }}
{% endif %}";

#[derive(Debug, Serialize)]
struct PromptElement<'a> {
    name: &'a str,
    description: &'a str,
}

#[derive(Debug, Serialize)]
struct PromptCollection<'a> {
    unified_art_style: &'a str,
    theme: &'a str,
    directive: &'a str,
}

impl<'a> From<&'a CollectionVisualContext> for PromptCollection<'a> {
    fn from(context: &'a CollectionVisualContext) -> Self {
        Self {
            unified_art_style: &context.unified_art_style,
            theme: &context.theme,
            directive: context.consistency_directive(),
        }
    }
}

/// Rendered master reference prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencePrompt {
    text: String,
    descriptive_mapping: Vec<String>,
}

impl ReferencePrompt {
    /// Renders the single consolidated prompt for a story's reference sheet.
    ///
    /// Every element contributes one `CHARACTER - name: description` line.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterReferenceError::VisualElementNotFound`] when a name
    /// has no definition in the guide, or
    /// [`CharacterReferenceError::PromptRender`] when rendering fails.
    pub fn render(
        guide: &VisualGuide,
        names: &VisualElementNames,
        collection: Option<&CollectionVisualContext>,
    ) -> Result<Self, CharacterReferenceError> {
        let elements = names
            .iter()
            .map(|name| {
                guide
                    .describe(name)
                    .map(|description| PromptElement { name, description })
                    .ok_or_else(|| CharacterReferenceError::VisualElementNotFound(name.to_owned()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let descriptive_mapping = elements
            .iter()
            .map(|element| format!("{}: {}", element.name, element.description))
            .collect();

        let environment = Environment::new();
        let text = environment
            .render_str(
                REFERENCE_SHEET_TEMPLATE,
                context! {
                    elements => elements,
                    style_guide => guide.style_guide(),
                    collection => collection.map(PromptCollection::from),
                },
            )
            .map_err(|error| CharacterReferenceError::PromptRender(error.to_string()))?;

        Ok(Self {
            text,
            descriptive_mapping,
        })
    }

    /// Returns the prompt text sent to the backend.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the `name: description` lines embedded in the prompt.
    #[must_use]
    pub fn descriptive_mapping(&self) -> &[String] {
        &self.descriptive_mapping
    }

    /// Consumes the prompt, returning its text.
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }
}

/// Derives `name: description` lines for a story's visual elements.
///
/// Returns an empty list when the story has no visual guide or no element
/// names. Names without a definition are skipped.
#[must_use]
pub fn descriptive_mapping(story: &Story) -> Vec<String> {
    let Some(guide) = story.visual_guide() else {
        return Vec::new();
    };
    story
        .character_names()
        .iter()
        .filter_map(|name| {
            let trimmed = name.trim();
            guide
                .describe(trimmed)
                .map(|description| format!("{trimmed}: {description}"))
        })
        .collect()
}
