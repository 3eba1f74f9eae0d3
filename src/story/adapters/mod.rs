//! Adapter implementations for story persistence ports.

pub mod memory;
