//! Executor implementations for illustration tasks.

mod page_prompt;
pub mod pipeline;

pub use page_prompt::PagePrompt;
pub use pipeline::IllustrationPipeline;
