//! Error taxonomy for master reference generation and caching.

use super::MasterReferenceInfo;
use crate::generation::domain::InvalidImageError;
use crate::story::domain::StoryId;
use thiserror::Error;

/// Result type for character reference operations.
pub type ReferenceResult<T> = Result<T, CharacterReferenceError>;

/// Errors returned by the character-consistency subsystem.
///
/// Precondition failures are never retried automatically. Generation and
/// caching failures are retryable; a caching failure carries the generated
/// reference so only the write needs repeating.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CharacterReferenceError {
    /// Required story inputs are missing.
    #[error("invalid story data for {story_id}: {reason}")]
    InvalidStoryData {
        /// Story identifier.
        story_id: StoryId,
        /// Which input is missing.
        reason: String,
    },

    /// The story lists no visual elements.
    #[error("no visual elements found")]
    NoVisualElementsFound,

    /// The story lists more visual elements than one reference sheet holds.
    #[error("unsupported visual element count {count}, expected 1 to {max}")]
    UnsupportedElementCount {
        /// Number of elements supplied.
        count: usize,
        /// Maximum supported elements.
        max: usize,
    },

    /// A listed element has no definition in the visual guide.
    #[error("visual element not found in guide: {0}")]
    VisualElementNotFound(String),

    /// The reference prompt template failed to render.
    #[error("failed to render reference prompt: {0}")]
    PromptRender(String),

    /// The backend call failed.
    #[error("master reference generation failed: {0}")]
    MasterReferenceGenerationFailed(String),

    /// The backend returned bytes that are not an image.
    #[error("invalid image data: {0}")]
    InvalidImageData(#[from] InvalidImageError),

    /// Generation succeeded but the result could not be written.
    #[error("caching master reference for {} failed: {reason}", .info.story_id())]
    CachingFailed {
        /// Underlying write failure.
        reason: String,
        /// The generated reference, kept for a caching-only retry.
        info: Box<MasterReferenceInfo>,
    },
}

impl CharacterReferenceError {
    /// Returns `true` when the scheduler may retry the operation.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::MasterReferenceGenerationFailed(_)
                | Self::InvalidImageData(_)
                | Self::CachingFailed { .. }
        )
    }

    /// Returns the generated reference preserved by a caching failure.
    #[must_use]
    pub fn generated_info(&self) -> Option<&MasterReferenceInfo> {
        match self {
            Self::CachingFailed { info, .. } => Some(info),
            _ => None,
        }
    }
}
