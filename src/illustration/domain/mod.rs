//! Domain model for illustration tasks.

mod error;
mod ids;
mod plan;
mod status;
mod task;

pub use error::{ParseTaskValueError, TaskDomainError};
pub use ids::TaskId;
pub use plan::IllustrationPlan;
pub use status::TaskStatus;
pub use task::{IllustrationTask, TaskFailure, TaskPriority, TaskType};
