//! Story and page records consumed by the illustration pipeline.
//!
//! Stories are plain records referenced by identifier. The pipeline never
//! holds live object graphs; it reads copies through the [`ports`] contract
//! and writes results back through explicit accessor calls:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]

pub mod adapters;
pub mod domain;
pub mod ports;

#[cfg(test)]
mod tests;
