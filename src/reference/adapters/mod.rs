//! Adapter implementations for reference persistence.

pub mod filesystem;

pub use filesystem::FileSystemSnapshotStore;
