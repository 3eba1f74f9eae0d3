//! Story aggregate and its pages.

use super::{CollectionVisualContext, IllustrationStatus, PageId, StoryDomainError, StoryId, VisualGuide};
use crate::generation::domain::ImageData;
use chrono::{DateTime, Utc};
use mockable::Clock;

/// A page of a story.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    id: PageId,
    page_index: u32,
    content: String,
    illustration_prompt: Option<String>,
    illustration: Option<ImageData>,
    illustration_status: IllustrationStatus,
}

impl Page {
    /// Creates a page at the given ordinal position.
    #[must_use]
    pub fn new(page_index: u32, content: impl Into<String>) -> Self {
        Self {
            id: PageId::new(),
            page_index,
            content: content.into(),
            illustration_prompt: None,
            illustration: None,
            illustration_status: IllustrationStatus::Pending,
        }
    }

    /// Sets an authored illustration prompt that replaces the page text in
    /// the generation prompt.
    #[must_use]
    pub fn with_illustration_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.illustration_prompt = Some(prompt.into());
        self
    }

    /// Returns the page identifier.
    #[must_use]
    pub const fn id(&self) -> PageId {
        self.id
    }

    /// Returns the zero-based position of the page within the story.
    #[must_use]
    pub const fn page_index(&self) -> u32 {
        self.page_index
    }

    /// Returns the page text.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns the authored illustration prompt, if any.
    #[must_use]
    pub fn illustration_prompt(&self) -> Option<&str> {
        self.illustration_prompt.as_deref()
    }

    /// Returns the generated illustration, if any.
    #[must_use]
    pub const fn illustration(&self) -> Option<&ImageData> {
        self.illustration.as_ref()
    }

    /// Returns the page's illustration status.
    #[must_use]
    pub const fn illustration_status(&self) -> IllustrationStatus {
        self.illustration_status
    }

    fn apply(&mut self, update: &PageIllustrationUpdate) {
        self.illustration_status = update.status;
        if let Some(image) = &update.image {
            self.illustration = Some(image.clone());
        }
    }
}

/// Write-back payload for a page illustration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageIllustrationUpdate {
    status: IllustrationStatus,
    image: Option<ImageData>,
}

impl PageIllustrationUpdate {
    /// Updates only the page status, keeping any existing image.
    #[must_use]
    pub const fn status(status: IllustrationStatus) -> Self {
        Self {
            status,
            image: None,
        }
    }

    /// Stores a finished illustration and marks the page ready.
    #[must_use]
    pub const fn completed(image: ImageData) -> Self {
        Self {
            status: IllustrationStatus::Ready,
            image: Some(image),
        }
    }

    /// Returns the status written by this update.
    #[must_use]
    pub const fn illustration_status(&self) -> IllustrationStatus {
        self.status
    }

    /// Returns the image written by this update, if any.
    #[must_use]
    pub const fn image(&self) -> Option<&ImageData> {
        self.image.as_ref()
    }
}

/// Story aggregate root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Story {
    id: StoryId,
    title: String,
    visual_guide: Option<VisualGuide>,
    collection_context: Option<CollectionVisualContext>,
    character_names: Vec<String>,
    character_reference: Option<ImageData>,
    pages: Vec<Page>,
    created_at: DateTime<Utc>,
}

impl Story {
    /// Creates an empty story.
    ///
    /// # Errors
    ///
    /// Returns [`StoryDomainError::EmptyTitle`] when the title is blank.
    pub fn new(title: impl Into<String>, clock: &impl Clock) -> Result<Self, StoryDomainError> {
        let raw = title.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(StoryDomainError::EmptyTitle);
        }
        Ok(Self {
            id: StoryId::new(),
            title: trimmed.to_owned(),
            visual_guide: None,
            collection_context: None,
            character_names: Vec::new(),
            character_reference: None,
            pages: Vec::new(),
            created_at: clock.utc(),
        })
    }

    /// Attaches a visual guide.
    #[must_use]
    pub fn with_visual_guide(mut self, guide: VisualGuide) -> Self {
        self.visual_guide = Some(guide);
        self
    }

    /// Attaches collection-level visual context.
    #[must_use]
    pub fn with_collection_context(mut self, context: CollectionVisualContext) -> Self {
        self.collection_context = Some(context);
        self
    }

    /// Sets the ordered list of visual element names.
    #[must_use]
    pub fn with_character_names(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.character_names = names.into_iter().collect();
        self
    }

    /// Appends a page with the next ordinal index.
    #[must_use]
    pub fn with_page(mut self, content: impl Into<String>) -> Self {
        let index = u32::try_from(self.pages.len()).unwrap_or(u32::MAX);
        self.pages.push(Page::new(index, content));
        self
    }

    /// Appends a prepared page. The page keeps its own index.
    #[must_use]
    pub fn with_prepared_page(mut self, page: Page) -> Self {
        self.pages.push(page);
        self
    }

    /// Returns the story identifier.
    #[must_use]
    pub const fn id(&self) -> StoryId {
        self.id
    }

    /// Returns the story title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the visual guide, if any.
    #[must_use]
    pub const fn visual_guide(&self) -> Option<&VisualGuide> {
        self.visual_guide.as_ref()
    }

    /// Returns the collection context, if any.
    #[must_use]
    pub const fn collection_context(&self) -> Option<&CollectionVisualContext> {
        self.collection_context.as_ref()
    }

    /// Returns the ordered visual element names.
    #[must_use]
    pub fn character_names(&self) -> &[String] {
        &self.character_names
    }

    /// Returns the story's own copy of the master reference bytes.
    #[must_use]
    pub const fn character_reference(&self) -> Option<&ImageData> {
        self.character_reference.as_ref()
    }

    /// Returns the pages in insertion order.
    #[must_use]
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Finds a page by identifier.
    #[must_use]
    pub fn page(&self, page_id: PageId) -> Option<&Page> {
        self.pages.iter().find(|page| page.id == page_id)
    }

    /// Finds a page by ordinal index.
    #[must_use]
    pub fn page_at(&self, page_index: u32) -> Option<&Page> {
        self.pages.iter().find(|page| page.page_index == page_index)
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Stores master reference bytes and reconciles the element names.
    ///
    /// When `names` differ from the current list the new names replace it.
    /// Returns `true` when the name list changed.
    pub fn set_character_reference(&mut self, image: ImageData, names: &[String]) -> bool {
        self.character_reference = Some(image);
        if self.character_names.as_slice() == names {
            return false;
        }
        self.character_names = names.to_vec();
        true
    }

    /// Applies an illustration write-back to one of the story's pages.
    ///
    /// # Errors
    ///
    /// Returns [`StoryDomainError::PageNotFound`] when the page is not part of
    /// this story.
    pub fn apply_page_update(
        &mut self,
        page_id: PageId,
        update: &PageIllustrationUpdate,
    ) -> Result<(), StoryDomainError> {
        let story_id = self.id;
        let page = self
            .pages
            .iter_mut()
            .find(|page| page.id == page_id)
            .ok_or(StoryDomainError::PageNotFound { story_id, page_id })?;
        page.apply(update);
        Ok(())
    }
}
