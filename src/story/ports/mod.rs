//! Port contracts for story persistence.
//!
//! Ports define infrastructure-agnostic interfaces used by the illustration
//! pipeline.

pub mod repository;

pub use repository::{StoryRepository, StoryRepositoryError, StoryRepositoryResult};
