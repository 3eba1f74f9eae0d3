//! Page illustration prompt construction.

use crate::illustration::ports::TaskExecutionError;
use crate::reference::domain::descriptive_mapping;
use crate::story::domain::{Page, Story};
use minijinja::{Environment, context};

const PAGE_TEMPLATE: &str = "\
Illustration for page {{ page_number }} of \"{{ title }}\".
Scene: {{ scene }}
{% if style_guide %}STYLE GUIDE: {{ style_guide }}
{% endif %}{% for line in elements %}CHARACTER - {{ line }}
{% endfor %}{% if has_reference %}Draw every character exactly as on the attached master reference sheet.
{% endif %}{% if has_previous %}Keep continuity with the attached previous page.
{% endif %}{% if collection_style %}COLLECTION STYLE: {{ collection_style }}
{{ collection_directive }}
{% endif %}";

/// Rendered prompt for one page illustration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePrompt(String);

impl PagePrompt {
    /// Renders the prompt for `page` of `story`.
    ///
    /// The scene is the page's illustration prompt when set, otherwise its
    /// text. Reference and continuity instructions are included only when
    /// those images accompany the request.
    ///
    /// # Errors
    ///
    /// Returns [`TaskExecutionError::PromptRender`] when rendering fails.
    pub fn render(
        story: &Story,
        page: &Page,
        has_reference: bool,
        has_previous: bool,
    ) -> Result<Self, TaskExecutionError> {
        let collection = story.collection_context();
        let environment = Environment::new();
        let text = environment
            .render_str(
                PAGE_TEMPLATE,
                context! {
                    page_number => page.page_index().saturating_add(1),
                    title => story.title(),
                    scene => page.illustration_prompt().unwrap_or_else(|| page.content()),
                    style_guide => story.visual_guide().map(|guide| guide.style_guide()),
                    elements => descriptive_mapping(story),
                    has_reference => has_reference,
                    has_previous => has_previous,
                    collection_style => collection.map(|context| context.unified_art_style.as_str()),
                    collection_directive => collection.map(|context| context.consistency_directive()),
                },
            )
            .map_err(|err| TaskExecutionError::PromptRender(err.to_string()))?;
        Ok(Self(text))
    }

    /// Returns the prompt text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the prompt, returning its text.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}
