//! Port contracts for master reference persistence.

pub mod snapshot;

pub use snapshot::{ReferenceSnapshotStore, SnapshotStoreError, SnapshotStoreResult};
