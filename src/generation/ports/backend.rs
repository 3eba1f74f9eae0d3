//! Generation backend port.

use crate::generation::domain::{GenerationRequest, ImageData};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for backend calls.
pub type BackendResult<T> = Result<T, BackendError>;

/// Asynchronous image generation capability.
///
/// Calls may take seconds and may fail transiently. Implementations must not
/// retry internally; retry policy belongs to the scheduler.
#[async_trait]
pub trait ImageGenerationBackend: Send + Sync {
    /// Generates one image for the request.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the backend cannot produce an image.
    async fn generate_image(&self, request: &GenerationRequest) -> BackendResult<ImageData>;
}

/// Errors returned by generation backends.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The backend is temporarily unreachable or overloaded.
    #[error("image backend unavailable: {0}")]
    Unavailable(String),

    /// The backend refused the request.
    #[error("image backend rejected the request: {0}")]
    Rejected(String),

    /// Transport or runtime failure.
    #[error("image backend runtime error: {0}")]
    Runtime(Arc<dyn std::error::Error + Send + Sync>),
}

impl BackendError {
    /// Wraps a runtime error from a backend adapter.
    pub fn runtime(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Runtime(Arc::new(err))
    }
}
