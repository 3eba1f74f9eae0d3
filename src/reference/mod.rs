//! Character-consistency subsystem.
//!
//! Derives one master reference image per story from its characters and
//! visual guide, and keeps it available to every page dispatch of that story:
//!
//! - Domain types in [`domain`]
//! - The shared keyed store in [`cache`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod cache;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
