//! Domain model for stories, pages and their visual descriptions.

mod collection;
mod error;
mod ids;
mod status;
mod story;
mod visual_guide;

pub use collection::CollectionVisualContext;
pub use error::{ParseIllustrationStatusError, StoryDomainError};
pub use ids::{PageId, StoryId};
pub use status::{CURRENT_STATUS_SCHEMA_VERSION, IllustrationStatus};
pub use story::{Page, PageIllustrationUpdate, Story};
pub use visual_guide::VisualGuide;
