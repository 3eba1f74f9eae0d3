//! Shared keyed store of master references.
//!
//! Maps a story identifier to its latest [`MasterReferenceInfo`]. Every
//! operation may be called concurrently from scheduler workers; writes for
//! the same key are last-write-wins. When a capacity is configured the
//! least recently used entry is evicted on insert. An optional
//! [`ReferenceSnapshotStore`] receives every write and serves misses.
//!
//! Writes are serialised, so memory and snapshots agree on the last writer.
//! Snapshot writes run on the blocking pool.

use crate::reference::{domain::MasterReferenceInfo, ports::ReferenceSnapshotStore};
use crate::story::domain::StoryId;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::{self, JoinError};
use tracing::{debug, warn};

/// Sizing for a [`MasterReferenceCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MasterReferenceCacheConfig {
    /// Maximum number of stories kept in memory. `None` keeps every entry.
    pub capacity: Option<NonZeroUsize>,
}

impl MasterReferenceCacheConfig {
    /// Keeps one entry per story without eviction.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self { capacity: None }
    }

    /// Evicts the least recently used story beyond `capacity` entries.
    #[must_use]
    pub const fn bounded(capacity: NonZeroUsize) -> Self {
        Self {
            capacity: Some(capacity),
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    info: MasterReferenceInfo,
    last_used: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<StoryId, CacheEntry>,
    tick: u64,
}

impl CacheState {
    fn next_tick(&mut self) -> u64 {
        self.tick = self.tick.saturating_add(1);
        self.tick
    }

    fn insert(&mut self, info: MasterReferenceInfo, capacity: Option<NonZeroUsize>) -> Option<StoryId> {
        let last_used = self.next_tick();
        self.entries
            .insert(info.story_id(), CacheEntry { info, last_used });
        self.evict(capacity)
    }

    fn insert_if_absent(
        &mut self,
        info: MasterReferenceInfo,
        capacity: Option<NonZeroUsize>,
    ) -> Option<StoryId> {
        if self.entries.contains_key(&info.story_id()) {
            return None;
        }
        self.insert(info, capacity)
    }

    fn evict(&mut self, capacity: Option<NonZeroUsize>) -> Option<StoryId> {
        let limit = capacity?;
        if self.entries.len() <= limit.get() {
            return None;
        }
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(story_id, _)| *story_id)?;
        self.entries.remove(&victim);
        Some(victim)
    }

    fn touch(&mut self, story_id: StoryId) -> Option<MasterReferenceInfo> {
        let tick = self.next_tick();
        let entry = self.entries.get_mut(&story_id)?;
        entry.last_used = tick;
        Some(entry.info.clone())
    }
}

/// In-memory master reference cache with optional write-through snapshots.
///
/// Clones share the same underlying store.
#[derive(Clone, Default)]
pub struct MasterReferenceCache {
    state: Arc<Mutex<CacheState>>,
    writes: Arc<tokio::sync::Mutex<()>>,
    config: MasterReferenceCacheConfig,
    snapshots: Option<Arc<dyn ReferenceSnapshotStore>>,
}

impl fmt::Debug for MasterReferenceCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterReferenceCache")
            .field("config", &self.config)
            .field("len", &self.len())
            .field("persistent", &self.snapshots.is_some())
            .finish()
    }
}

impl MasterReferenceCache {
    /// Creates an empty in-memory cache.
    #[must_use]
    pub fn new(config: MasterReferenceCacheConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState::default())),
            writes: Arc::new(tokio::sync::Mutex::new(())),
            config,
            snapshots: None,
        }
    }

    /// Attaches a snapshot store for write-through persistence.
    #[must_use]
    pub fn with_snapshot_store(mut self, store: Arc<dyn ReferenceSnapshotStore>) -> Self {
        self.snapshots = Some(store);
        self
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, info: MasterReferenceInfo) {
        let story_id = info.story_id();
        let evicted = self.lock().insert(info, self.config.capacity);
        if let Some(victim) = evicted {
            debug!(story_id = %victim, "evicted least recently used master reference");
        }
        debug!(story_id = %story_id, "cached master reference");
    }

    /// Runs a snapshot operation on the blocking pool, logging failures.
    async fn on_snapshots<F, E>(&self, context: &'static str, operation: F)
    where
        F: FnOnce(&dyn ReferenceSnapshotStore) -> Result<(), E> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let Some(snapshots) = self.snapshots.as_ref().map(Arc::clone) else {
            return;
        };
        let outcome: Result<Result<(), E>, JoinError> =
            task::spawn_blocking(move || operation(snapshots.as_ref())).await;
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(error = %err, "{context}"),
            Err(err) => warn!(error = %err, "snapshot task did not finish: {context}"),
        }
    }

    /// Stores a reference under its story identifier, replacing any
    /// earlier entry.
    ///
    /// Snapshot failures are logged; the in-memory entry is kept.
    pub async fn store(&self, info: MasterReferenceInfo) {
        let _write = self.writes.lock().await;
        let snapshot = info.clone();
        self.on_snapshots("failed to persist master reference snapshot", move |store| {
            store.save(&snapshot)
        })
        .await;
        self.insert(info);
    }

    /// Returns the reference for a story and marks it recently used.
    ///
    /// A memory miss falls back to the snapshot store; an unreadable
    /// snapshot is treated as a miss.
    #[must_use]
    pub fn get(&self, story_id: StoryId) -> Option<MasterReferenceInfo> {
        if let Some(info) = self.lock().touch(story_id) {
            return Some(info);
        }
        let snapshots = self.snapshots.as_ref()?;
        match snapshots.load(story_id) {
            Ok(Some(info)) => {
                let mut state = self.lock();
                // A concurrent store may have landed since the miss.
                if let Some(victim) = state.insert_if_absent(info.clone(), self.config.capacity) {
                    debug!(story_id = %victim, "evicted least recently used master reference");
                }
                state.touch(story_id).or(Some(info))
            }
            Ok(None) => None,
            Err(err) => {
                warn!(story_id = %story_id, error = %err, "ignoring unreadable master reference snapshot");
                None
            }
        }
    }

    /// Returns `true` when a reference is available for the story.
    #[must_use]
    pub fn has(&self, story_id: StoryId) -> bool {
        if self.lock().entries.contains_key(&story_id) {
            return true;
        }
        self.get(story_id).is_some()
    }

    /// Invalidates the reference for one story.
    pub async fn clear(&self, story_id: StoryId) {
        let _write = self.writes.lock().await;
        self.lock().entries.remove(&story_id);
        self.on_snapshots("failed to remove master reference snapshot", move |store| {
            store.remove(story_id)
        })
        .await;
        debug!(story_id = %story_id, "cleared master reference");
    }

    /// Invalidates every reference.
    pub async fn clear_all(&self) {
        let _write = self.writes.lock().await;
        self.lock().entries.clear();
        self.on_snapshots("failed to clear master reference snapshots", |store| store.clear())
            .await;
    }

    /// Returns the number of references held in memory.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns `true` when no reference is held in memory.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Returns the configured capacity.
    #[must_use]
    pub const fn capacity(&self) -> Option<NonZeroUsize> {
        self.config.capacity
    }
}
