//! Port contracts for illustration dispatch.

pub mod executor;

pub use executor::{
    CommitPermit, DispatchContext, TaskExecutionError, TaskExecutionResult, TaskExecutor, TaskOutput,
};
