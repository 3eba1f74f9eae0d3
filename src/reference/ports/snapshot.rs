//! Port for persisted master reference snapshots.
//!
//! A snapshot store lets the in-memory cache survive restarts. Calls are
//! synchronous and short; the cache invokes them outside its own lock.

use crate::reference::domain::MasterReferenceInfo;
use crate::story::domain::StoryId;
use std::sync::Arc;
use thiserror::Error;

/// Result type for snapshot store operations.
pub type SnapshotStoreResult<T> = Result<T, SnapshotStoreError>;

/// Write-through persistence for master references.
pub trait ReferenceSnapshotStore: Send + Sync {
    /// Persists a reference, replacing any earlier snapshot for its story.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotStoreError::Io`] or [`SnapshotStoreError::Encoding`]
    /// when the snapshot cannot be written.
    fn save(&self, info: &MasterReferenceInfo) -> SnapshotStoreResult<()>;

    /// Loads the snapshot for a story.
    ///
    /// Returns `None` when no snapshot exists.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotStoreError::Corrupt`] when the stored bytes do not
    /// match their recorded digest or metadata.
    fn load(&self, story_id: StoryId) -> SnapshotStoreResult<Option<MasterReferenceInfo>>;

    /// Removes the snapshot for a story. Missing snapshots are not an error.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotStoreError::Io`] when removal fails.
    fn remove(&self, story_id: StoryId) -> SnapshotStoreResult<()>;

    /// Removes every snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotStoreError::Io`] when removal fails.
    fn clear(&self) -> SnapshotStoreResult<()>;
}

/// Errors returned by snapshot stores.
#[derive(Debug, Clone, Error)]
pub enum SnapshotStoreError {
    /// Underlying storage failure.
    #[error("snapshot storage error: {0}")]
    Io(Arc<std::io::Error>),

    /// The stored snapshot failed integrity checks.
    #[error("corrupt snapshot for story {story_id}: {reason}")]
    Corrupt {
        /// Story identifier.
        story_id: StoryId,
        /// What failed to verify.
        reason: String,
    },

    /// Snapshot metadata could not be encoded or decoded.
    #[error("snapshot metadata encoding error: {0}")]
    Encoding(Arc<serde_json::Error>),
}

impl From<std::io::Error> for SnapshotStoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for SnapshotStoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encoding(Arc::new(err))
    }
}
