//! Image generation backend contract.
//!
//! The generation backend is an opaque, slow and unreliable asynchronous
//! capability. This module defines the bytes it produces, the request it
//! accepts and the port every concrete backend implements:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]

pub mod adapters;
pub mod domain;
pub mod ports;

#[cfg(test)]
mod tests;
