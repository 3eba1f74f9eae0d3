//! Dependency and priority engine for illustration tasks.
//!
//! [`TaskQueue`] decides which task may run next; [`IllustrationScheduler`]
//! runs them on a bounded set of workers with timeouts and retries.

mod config;
mod driver;
mod error;
mod events;
mod queue;

pub use config::{BackoffPolicy, SchedulerConfig};
pub use driver::IllustrationScheduler;
pub use error::{SchedulerError, SchedulerResult};
pub use events::{StoryProgress, TaskEvent};
pub use queue::{FailureOutcome, TaskQueue};
