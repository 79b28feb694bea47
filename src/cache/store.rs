//! In-memory asset cache storage.
//!
//! Holds two maps keyed by [`LogicalKey`]: the identifier entries (key →
//! remote identifier + digest) and the digest baselines used by change
//! detection. The maps are deliberately separate: a baseline may be known
//! for a key that currently has no cached identifier.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::domain::{CacheEntry, ContentDigest, LogicalKey, RemoteIdentifier};

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// One row of a diagnostic snapshot. Values are full, untruncated; shortening
/// them for display is the caller's concern.
#[derive(Debug, Clone)]
pub struct SnapshotEntry {
    pub key: LogicalKey,
    pub identifier: RemoteIdentifier,
    pub digest: ContentDigest,
}

/// Process-wide store mapping logical keys to remote identifiers.
///
/// An entry exists for a key iff that key's content has been successfully
/// transmitted at least once since the key was last invalidated. Entry
/// replacement is atomic: identifier and digest are always written together.
///
/// Cold on every process start; nothing here persists.
pub struct AssetStore {
    entries: RwLock<BTreeMap<LogicalKey, CacheEntry>>,
    baselines: RwLock<BTreeMap<LogicalKey, ContentDigest>>,
}

impl AssetStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            baselines: RwLock::new(BTreeMap::new()),
        }
    }

    /// Look up the cached remote identifier for a key.
    pub fn get(&self, key: &LogicalKey) -> Option<RemoteIdentifier> {
        rw_read(&self.entries, SOURCE, "get")
            .get(key)
            .map(|entry| entry.identifier.clone())
    }

    /// Look up the full cache entry for a key.
    pub fn entry(&self, key: &LogicalKey) -> Option<CacheEntry> {
        rw_read(&self.entries, SOURCE, "entry").get(key).cloned()
    }

    /// Replace the entry for a key wholesale and record its digest as the
    /// change-detection baseline.
    ///
    /// Both locks are taken before either map is touched so no reader can see
    /// the new identifier paired with an old baseline.
    pub fn put(&self, key: LogicalKey, identifier: RemoteIdentifier, digest: ContentDigest) {
        let mut entries = rw_write(&self.entries, SOURCE, "put.entries");
        let mut baselines = rw_write(&self.baselines, SOURCE, "put.baselines");
        entries.insert(
            key.clone(),
            CacheEntry {
                identifier,
                digest: digest.clone(),
            },
        );
        baselines.insert(key, digest);
    }

    /// Remove the entry and the digest baseline for a key, forcing
    /// re-transmission on next use. Idempotent on an absent key.
    ///
    /// Returns whether an identifier entry was actually removed.
    pub fn invalidate(&self, key: &LogicalKey) -> bool {
        let mut entries = rw_write(&self.entries, SOURCE, "invalidate.entries");
        let mut baselines = rw_write(&self.baselines, SOURCE, "invalidate.baselines");
        let removed = entries.remove(key).is_some();
        baselines.remove(key);
        removed
    }

    /// Remove every entry and every baseline. Returns the number of
    /// identifier entries removed.
    pub fn clear_all(&self) -> usize {
        let mut entries = rw_write(&self.entries, SOURCE, "clear_all.entries");
        let mut baselines = rw_write(&self.baselines, SOURCE, "clear_all.baselines");
        let removed = entries.len();
        entries.clear();
        baselines.clear();
        removed
    }

    /// Read the recorded digest baseline for a key, if any.
    pub fn baseline(&self, key: &LogicalKey) -> Option<ContentDigest> {
        rw_read(&self.baselines, SOURCE, "baseline")
            .get(key)
            .cloned()
    }

    /// Record (or replace) the digest baseline for a key without touching the
    /// identifier entry.
    pub fn record_baseline(&self, key: LogicalKey, digest: ContentDigest) {
        rw_write(&self.baselines, SOURCE, "record_baseline").insert(key, digest);
    }

    /// Ordered read-only view of every identifier entry.
    pub fn snapshot(&self) -> Vec<SnapshotEntry> {
        rw_read(&self.entries, SOURCE, "snapshot")
            .iter()
            .map(|(key, entry)| SnapshotEntry {
                key: key.clone(),
                identifier: entry.identifier.clone(),
                digest: entry.digest.clone(),
            })
            .collect()
    }

    /// Number of identifier entries currently cached.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    /// Whether no identifier entries are cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of digest baselines currently recorded.
    pub fn baseline_count(&self) -> usize {
        rw_read(&self.baselines, SOURCE, "baseline_count").len()
    }
}

impl Default for AssetStore {
    fn default() -> Self {
        Self::new()
    }
}
