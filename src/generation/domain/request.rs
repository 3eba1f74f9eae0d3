//! Backend request payload.

use super::ImageData;

/// A single image generation call.
///
/// The master reference and the previous page image are optional inputs that
/// bias the backend toward visual continuity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    prompt: String,
    master_reference: Option<ImageData>,
    previous_page: Option<ImageData>,
}

impl GenerationRequest {
    /// Creates a request carrying only a prompt.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            master_reference: None,
            previous_page: None,
        }
    }

    /// Attaches the story's master reference image.
    #[must_use]
    pub fn with_master_reference(mut self, image: ImageData) -> Self {
        self.master_reference = Some(image);
        self
    }

    /// Attaches the preceding page's generated image.
    #[must_use]
    pub fn with_previous_page(mut self, image: ImageData) -> Self {
        self.previous_page = Some(image);
        self
    }

    /// Returns the prompt text.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Returns the master reference image, if supplied.
    #[must_use]
    pub const fn master_reference(&self) -> Option<&ImageData> {
        self.master_reference.as_ref()
    }

    /// Returns the previous page image, if supplied.
    #[must_use]
    pub const fn previous_page(&self) -> Option<&ImageData> {
        self.previous_page.as_ref()
    }
}
