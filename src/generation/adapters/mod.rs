//! Adapter implementations for image generation ports.

pub mod memory;
