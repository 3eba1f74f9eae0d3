//! Immutable image payloads.

use super::InvalidImageError;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_SIGNATURE: &[u8] = b"\xff\xd8\xff";
const GIF87_SIGNATURE: &[u8] = b"GIF87a";
const GIF89_SIGNATURE: &[u8] = b"GIF89a";
const RIFF_SIGNATURE: &[u8] = b"RIFF";
const WEBP_MARKER: &[u8] = b"WEBP";

/// Image container formats recognised by payload validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// Portable Network Graphics.
    Png,
    /// JPEG / JFIF.
    Jpeg,
    /// Graphics Interchange Format.
    Gif,
    /// `WebP` inside a RIFF container.
    WebP,
}

impl ImageFormat {
    /// Returns the conventional file extension for the format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::WebP => "webp",
        }
    }
}

/// Opaque image bytes returned by a generation backend.
///
/// Clones share the same allocation, so passing a master reference to many
/// page dispatches does not copy the image.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ImageData(Arc<[u8]>);

impl ImageData {
    /// Wraps raw image bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Arc::from(bytes.into()))
    }

    /// Returns the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when the payload holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sniffs the container format from the leading signature bytes.
    #[must_use]
    pub fn detect_format(&self) -> Option<ImageFormat> {
        let bytes = self.as_bytes();
        if bytes.starts_with(PNG_SIGNATURE) {
            Some(ImageFormat::Png)
        } else if bytes.starts_with(JPEG_SIGNATURE) {
            Some(ImageFormat::Jpeg)
        } else if bytes.starts_with(GIF87_SIGNATURE) || bytes.starts_with(GIF89_SIGNATURE) {
            Some(ImageFormat::Gif)
        } else if bytes.starts_with(RIFF_SIGNATURE) && bytes.get(8..12) == Some(WEBP_MARKER) {
            Some(ImageFormat::WebP)
        } else {
            None
        }
    }

    /// Performs basic validation of a backend payload.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidImageError::Empty`] for an empty payload and
    /// [`InvalidImageError::UnrecognisedFormat`] when no known image
    /// signature is present.
    pub fn validate(&self) -> Result<ImageFormat, InvalidImageError> {
        if self.is_empty() {
            return Err(InvalidImageError::Empty);
        }
        self.detect_format()
            .ok_or(InvalidImageError::UnrecognisedFormat { len: self.len() })
    }

    /// Returns the lowercase hexadecimal SHA-256 digest of the payload.
    #[must_use]
    pub fn digest_hex(&self) -> String {
        format!("{:x}", Sha256::digest(self.as_bytes()))
    }
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageData")
            .field("len", &self.len())
            .field("format", &self.detect_format())
            .finish()
    }
}

impl From<Vec<u8>> for ImageData {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for ImageData {
    fn from(bytes: &[u8]) -> Self {
        Self(Arc::from(bytes))
    }
}

impl AsRef<[u8]> for ImageData {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}
