//! Domain model for master character references.

mod error;
mod info;
mod names;
mod prompt;

pub use error::{CharacterReferenceError, ReferenceResult};
pub use info::MasterReferenceInfo;
pub use names::{MAX_VISUAL_ELEMENTS, VisualElementNames};
pub use prompt::{ReferencePrompt, descriptive_mapping};
