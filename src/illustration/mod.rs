//! Illustration task model, scheduler and generation pipeline.
//!
//! Each illustration request is an [`domain::IllustrationTask`] with a typed
//! status and attempt counter. The [`scheduler`] orders eligible tasks by
//! priority and dependencies, bounds concurrent generations and drives
//! retries; the [`services`] pipeline executes each dispatch against the
//! backend, the reference cache and the story repository:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - The dependency and priority engine in [`scheduler`]
//! - The executor implementation in [`services`]

pub mod domain;
pub mod ports;
pub mod scheduler;
pub mod services;

#[cfg(test)]
mod tests;
