//! Page illustration status and its versioned storage encoding.

use super::ParseIllustrationStatusError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Schema version written by [`IllustrationStatus::as_str`].
pub const CURRENT_STATUS_SCHEMA_VERSION: u32 = 2;

/// Fallback table for raw values written by schema v1 clients.
///
/// v1 stored camel-cased raw values and used `placeholder`, `inProgress`,
/// `success` and `error` for what are now pending, generating, ready and
/// failed. v1 had no cancellation state.
const LEGACY_V1_MAPPINGS: &[(&str, IllustrationStatus)] = &[
    ("placeholder", IllustrationStatus::Pending),
    ("pending", IllustrationStatus::Pending),
    ("scheduled", IllustrationStatus::Scheduled),
    ("inProgress", IllustrationStatus::Generating),
    ("generating", IllustrationStatus::Generating),
    ("success", IllustrationStatus::Ready),
    ("ready", IllustrationStatus::Ready),
    ("error", IllustrationStatus::Failed),
    ("failed", IllustrationStatus::Failed),
];

/// Illustration state of a page as shown to readers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IllustrationStatus {
    /// No illustration has been requested yet.
    #[default]
    Pending,
    /// An illustration task is queued.
    Scheduled,
    /// The backend is producing the illustration.
    Generating,
    /// The illustration is available.
    Ready,
    /// Generation failed; a manual retry may be offered.
    Failed,
    /// Generation was cancelled by the user.
    Abandoned,
}

impl IllustrationStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Scheduled => "scheduled",
            Self::Generating => "generating",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Abandoned => "abandoned",
        }
    }

    /// Decodes a stored raw value written under `schema_version`.
    ///
    /// Schema v1 values are resolved through an explicit fallback table;
    /// schema v2 values must use the canonical names.
    ///
    /// # Errors
    ///
    /// Returns [`ParseIllustrationStatusError::Unknown`] when the value has no
    /// mapping and [`ParseIllustrationStatusError::UnsupportedSchema`] for
    /// unknown schema versions.
    pub fn decode(raw: &str, schema_version: u32) -> Result<Self, ParseIllustrationStatusError> {
        let trimmed = raw.trim();
        let decoded = match schema_version {
            1 => LEGACY_V1_MAPPINGS
                .iter()
                .find(|(legacy, _)| *legacy == trimmed)
                .map(|(_, status)| *status),
            CURRENT_STATUS_SCHEMA_VERSION => Self::try_from(trimmed).ok(),
            other => return Err(ParseIllustrationStatusError::UnsupportedSchema(other)),
        };
        decoded.ok_or_else(|| ParseIllustrationStatusError::Unknown {
            value: raw.to_owned(),
            schema_version,
        })
    }
}

impl fmt::Display for IllustrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for IllustrationStatus {
    type Error = ParseIllustrationStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "scheduled" => Ok(Self::Scheduled),
            "generating" => Ok(Self::Generating),
            "ready" => Ok(Self::Ready),
            "failed" => Ok(Self::Failed),
            "abandoned" => Ok(Self::Abandoned),
            _ => Err(ParseIllustrationStatusError::Unknown {
                value: value.to_owned(),
                schema_version: CURRENT_STATUS_SCHEMA_VERSION,
            }),
        }
    }
}
