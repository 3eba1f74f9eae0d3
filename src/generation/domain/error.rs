//! Error types for image payload validation.

use thiserror::Error;

/// Errors returned when backend output fails basic image validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidImageError {
    /// The payload contains no bytes.
    #[error("image payload is empty")]
    Empty,

    /// The payload does not start with a known image signature.
    #[error("unrecognised image signature in {len}-byte payload")]
    UnrecognisedFormat {
        /// Payload length in bytes.
        len: usize,
    },
}
