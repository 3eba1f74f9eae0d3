//! Error types for story domain validation and status decoding.

use super::{PageId, StoryId};
use thiserror::Error;

/// Errors returned while constructing or mutating story records.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoryDomainError {
    /// The story title is empty after trimming.
    #[error("story title must not be empty")]
    EmptyTitle,

    /// The page does not belong to the story.
    #[error("page {page_id} not found in story {story_id}")]
    PageNotFound {
        /// Story identifier.
        story_id: StoryId,
        /// Missing page identifier.
        page_id: PageId,
    },
}

/// Error returned while decoding stored illustration statuses.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseIllustrationStatusError {
    /// The raw value has no mapping in the given schema version.
    #[error("unknown illustration status '{value}' for schema v{schema_version}")]
    Unknown {
        /// Raw stored value.
        value: String,
        /// Schema version the value was read with.
        schema_version: u32,
    },

    /// The schema version is not supported.
    #[error("unsupported illustration status schema v{0}")]
    UnsupportedSchema(u32),
}
