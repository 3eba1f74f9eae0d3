//! Validated visual element name lists.

use super::CharacterReferenceError;
use serde::Serialize;

/// Maximum number of elements drawn on one reference sheet.
pub const MAX_VISUAL_ELEMENTS: usize = 10;

/// Ordered list of 1 to [`MAX_VISUAL_ELEMENTS`] character or object names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct VisualElementNames(Vec<String>);

impl VisualElementNames {
    /// Validates a name list.
    ///
    /// Names are trimmed and blank entries dropped before counting. The
    /// bound is a hard precondition; lists are never truncated.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterReferenceError::NoVisualElementsFound`] for an empty
    /// list and [`CharacterReferenceError::UnsupportedElementCount`] for more
    /// than [`MAX_VISUAL_ELEMENTS`] names.
    pub fn new<I, S>(names: I) -> Result<Self, CharacterReferenceError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let cleaned: Vec<String> = names
            .into_iter()
            .map(|name| name.as_ref().trim().to_owned())
            .filter(|name| !name.is_empty())
            .collect();
        match cleaned.len() {
            0 => Err(CharacterReferenceError::NoVisualElementsFound),
            count if count > MAX_VISUAL_ELEMENTS => {
                Err(CharacterReferenceError::UnsupportedElementCount {
                    count,
                    max: MAX_VISUAL_ELEMENTS,
                })
            }
            _ => Ok(Self(cleaned)),
        }
    }

    /// Returns the names in order.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Returns the number of names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; present for API symmetry with [`Self::len`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the names.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}
