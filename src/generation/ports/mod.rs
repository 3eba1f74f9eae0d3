//! Port contracts for image generation.

pub mod backend;

pub use backend::{BackendError, BackendResult, ImageGenerationBackend};
