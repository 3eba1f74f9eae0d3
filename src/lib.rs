//! Picturebook: illustration pipeline for personalised children's stories.
//!
//! This crate produces sets of page illustrations that stay visually
//! consistent with each other while calling a slow, unreliable image
//! generation backend under retries, partial failures, bounded concurrency
//! and priority ordering.
//!
//! # Architecture
//!
//! Picturebook follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (in-memory, filesystem)
//!
//! # Modules
//!
//! - [`generation`]: Image generation backend contract
//! - [`story`]: Story and page records and their persistence port
//! - [`reference`]: Master character references and their cache
//! - [`illustration`]: Illustration tasks, scheduler and pipeline

pub mod generation;
pub mod illustration;
pub mod reference;
pub mod story;
