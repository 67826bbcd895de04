//! [ChunkManager]: the per-collection ordered chunk list (spec.md §4.7),
//! [ConfigStore]: the in-scope pieces of the config store this module
//! actually needs (`config.chunks`, `config.locks`, `config.changelog`,
//! spec.md §6), and [ShardVersionCache]: the router/shard-side
//! `setShardVersion` handshake.
//!
//! Grounded on `examples/original_source/s/chunk.cpp`'s `ChunkManager`
//! (`_chunks` vector, `findChunk`, `getChunksForQuery`, `save`) and on
//! DESIGN NOTES §9's "raw pointers and shared_ptr cycles (ChunkManager <->
//! Chunk) -> arena + index handles": chunks live as plain values in one
//! `Vec`, sorted by `min`, never handed out as long-lived references
//! across a save/reload boundary.

use std::{
    collections::{HashMap, HashSet},
    sync::{atomic::{AtomicU64, Ordering}, Mutex},
};

use crate::{
    bson::ObjectId,
    err_at,
    sharding::chunk::{Chunk, ChunkVersion, ShardKey},
    Error, Result,
};

/// One `config.changelog` row (spec.md §6): an append-only audit trail of
/// chunk mutations, used operationally rather than by routing itself.
#[derive(Clone, Debug)]
pub struct ChangelogEntry {
    pub ns: String,
    pub what: String,
    pub details: String,
}

/// Holds the distributed lock on a namespace for the lifetime of the
/// guard (spec.md §4.7 "Split" step 2, "Migrate" critical section);
/// released automatically on drop so a caller that returns early via `?`
/// can never leak the lock.
pub struct ConfigLockGuard<'a> {
    store: &'a ConfigStore,
    ns: String,
}

impl Drop for ConfigLockGuard<'_> {
    fn drop(&mut self) {
        self.store.locked.lock().unwrap().remove(&self.ns);
    }
}

/// The in-scope slice of spec.md §6's "Config store (sharding)": holds
/// `config.chunks` (the persisted chunk list per namespace),
/// `config.locks` (the distributed per-namespace lock used by split and
/// the migrate critical section) and `config.changelog`. Everything else
/// the real config store holds (`config.shards`, `config.databases`,
/// `config.collections`) is a catalog concern out of this module's scope.
pub struct ConfigStore {
    chunks: Mutex<HashMap<String, Vec<Chunk>>>,
    locked: Mutex<HashSet<String>>,
    changelog: Mutex<Vec<ChangelogEntry>>,
    epoch_source: AtomicU64,
}

impl ConfigStore {
    pub fn new() -> ConfigStore {
        ConfigStore {
            chunks: Mutex::new(HashMap::new()),
            locked: Mutex::new(HashSet::new()),
            changelog: Mutex::new(Vec::new()),
            epoch_source: AtomicU64::new(1),
        }
    }

    /// A fresh epoch, stamped once at `shardCollection` time (spec.md §4.7
    /// `ChunkVersion`'s `epoch` component) and never reused.
    pub fn next_epoch(&self) -> u64 {
        self.epoch_source.fetch_add(1, Ordering::Relaxed)
    }

    /// Acquire the distributed lock on `ns`. Fails `LockTimeout` rather
    /// than blocking — callers of this crate's sharding operations already
    /// run with the interrupt/yield-point discipline spec.md §5 describes,
    /// so a blocking acquire here would bypass it.
    pub fn lock_collection(&self, ns: &str) -> Result<ConfigLockGuard<'_>> {
        let mut locked = self.locked.lock().unwrap();
        if !locked.insert(ns.to_string()) {
            return err_at!(LockTimeout, msg: "collection {} is locked by a concurrent split/migrate", ns);
        }
        Ok(ConfigLockGuard { store: self, ns: ns.to_string() })
    }

    pub fn save_chunks(&self, ns: &str, chunks: Vec<Chunk>) {
        self.chunks.lock().unwrap().insert(ns.to_string(), chunks);
    }

    pub fn load_chunks(&self, ns: &str) -> Vec<Chunk> {
        self.chunks.lock().unwrap().get(ns).cloned().unwrap_or_default()
    }

    pub fn append_changelog(&self, ns: &str, what: impl Into<String>, details: impl Into<String>) {
        self.changelog.lock().unwrap().push(ChangelogEntry {
            ns: ns.to_string(),
            what: what.into(),
            details: details.into(),
        });
    }

    pub fn changelog(&self) -> Vec<ChangelogEntry> {
        self.changelog.lock().unwrap().clone()
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        ConfigStore::new()
    }
}

/// Per-collection ordered chunk list (spec.md §4.7 `ChunkManager`).
/// `chunks` is kept sorted by `min` at all times, so every lookup is a
/// binary search rather than a linear scan.
pub struct ChunkManager {
    pub ns: String,
    pub shard_key_pattern: Vec<(String, i32)>,
    chunks: Vec<Chunk>,
}

impl ChunkManager {
    /// A brand-new sharded collection: one chunk covering the whole
    /// key-space, owned by `initial_shard` (spec.md §4.7 "Chunks exactly
    /// partition the key space... first chunk's min = global-min
    /// sentinel, last chunk's max = global-max sentinel").
    pub fn new(ns: impl Into<String>, shard_key_pattern: Vec<(String, i32)>, initial_shard: impl Into<String>, epoch: u64) -> ChunkManager {
        let ns = ns.into();
        let width = shard_key_pattern.len();
        let version = ChunkVersion::initial(epoch);
        let chunk = Chunk::new(ns.clone(), ShardKey::global_min(width), ShardKey::global_max(width), initial_shard, version);
        ChunkManager { ns, shard_key_pattern, chunks: vec![chunk] }
    }

    /// Rebuild a manager from whatever `config.chunks` rows the config
    /// store holds for `ns`, re-sorting by `min` (a config store read
    /// makes no ordering guarantee).
    pub fn load(ns: impl Into<String>, shard_key_pattern: Vec<(String, i32)>, config: &ConfigStore) -> Result<ChunkManager> {
        let ns = ns.into();
        let mut chunks = config.load_chunks(&ns);
        if chunks.is_empty() {
            return err_at!(NamespaceNotFound, msg: "no chunks recorded for sharded collection {}", ns);
        }
        chunks.sort_by(|a, b| a.min.cmp(&b.min));
        Ok(ChunkManager { ns, shard_key_pattern, chunks })
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The collection-version: the maximum version over every chunk
    /// (spec.md §4.7 "`max(version)` over all chunks is the collection's
    /// *collection-version*").
    pub fn collection_version(&self) -> ChunkVersion {
        self.chunks.iter().map(|c| c.version).max().expect("a ChunkManager always holds at least one chunk")
    }

    /// `findChunk(key)` by binary search (spec.md §4.7).
    pub fn find_chunk(&self, key: &ShardKey) -> Option<&Chunk> {
        match self.chunks.binary_search_by(|c| c.min.cmp(key)) {
            Ok(i) => Some(&self.chunks[i]),
            Err(0) => None,
            Err(i) => Some(&self.chunks[i - 1]),
        }
    }

    fn find_chunk_idx(&self, key: &ShardKey) -> Option<usize> {
        match self.chunks.binary_search_by(|c| c.min.cmp(key)) {
            Ok(i) => Some(i),
            Err(0) => None,
            Err(i) => Some(i - 1),
        }
    }

    /// `getChunksForQuery(query)`: every chunk whose range intersects
    /// `[lo, hi)` (spec.md §4.7).
    pub fn chunks_for_range(&self, lo: &ShardKey, hi: &ShardKey) -> Vec<&Chunk> {
        self.chunks.iter().filter(|c| c.min < *hi && *lo < c.max).collect()
    }

    /// Extract the shard key from `doc` and route it to the owning chunk.
    pub fn route(&self, doc: &crate::bson::Document) -> Result<&Chunk> {
        let key = ShardKey::extract(doc, &self.shard_key_pattern)?;
        self.find_chunk(&key).ok_or_else(|| Error::Fatal(format!("chunk routing: no chunk owns key {:?}", key)))
    }

    /// Split the chunk containing `at` into two at that point (spec.md
    /// §4.7 "Split" steps 2-4; `medianKey`/`pickSplitPoint` — step 1 — is
    /// `autosplit::pick_split_point`'s job, since it needs a live
    /// document-count sample the manager itself doesn't hold).
    ///
    /// Bumps the collection-version's major component by one and stamps it
    /// onto the newly spawned upper half only; the lower half keeps the
    /// original chunk's identity and its pre-split version untouched
    /// (spec.md §8 scenario 6's "two chunks with versions (2,0) and (1,0)"
    /// — exactly one bumped sibling per split, the other "left intact" per
    /// spec.md §4.7, even though its max moved).
    pub fn split(&mut self, at: ShardKey, config: &ConfigStore) -> Result<(ObjectId, ObjectId)> {
        let _lock = config.lock_collection(&self.ns)?;

        let idx = match self.find_chunk_idx(&at) {
            Some(idx) => idx,
            None => return err_at!(BadValue, msg: "split point outside the collection's key-space"),
        };
        if !self.chunks[idx].is_interior_point(&at) {
            return err_at!(BadValue, msg: "split point equals chunk min or max; does it have only one distinct value?");
        }

        let bumped = self.collection_version().bump_major();

        // The low half keeps the chunk's identity and its pre-split
        // version untouched — spec.md §8 scenario 6's "two chunks with
        // versions (2,0) and (1,0)" names exactly one bumped sibling per
        // split, so only the freshly spawned high half is "affected" in
        // spec.md §4.7's sense; the low half is "left intact" even though
        // its max moved (Open Question resolution, see DESIGN.md).
        let mut left = self.chunks[idx].clone();
        let old_max = left.max.clone();
        left.max = at.clone();

        let right = Chunk::new(self.ns.clone(), at, old_max, left.shard.clone(), bumped);

        let (left_id, right_id) = (left.id, right.id);
        self.chunks[idx] = left;
        self.chunks.insert(idx + 1, right);

        config.save_chunks(&self.ns, self.chunks.clone());
        config.append_changelog(&self.ns, "split", format!("chunk {} split at a new version {:?}", idx, bumped));
        tracing::info!(ns = %self.ns, left = %left_id, right = %right_id, ?bumped, "chunk split");

        Ok((left_id, right_id))
    }

    /// Flip a chunk's ownership after a migration's commit phase (spec.md
    /// §4.7 "commit: donor calls the config store to flip ownership and
    /// bump versions"). Bumps the collection-version's major and stamps
    /// it onto the moved chunk only.
    pub fn commit_migrate(&mut self, chunk_id: ObjectId, to_shard: impl Into<String>, config: &ConfigStore) -> Result<ChunkVersion> {
        let _lock = config.lock_collection(&self.ns)?;

        let idx = match self.chunks.iter().position(|c| c.id == chunk_id) {
            Some(idx) => idx,
            None => return err_at!(NamespaceNotFound, msg: "chunk {} not found", chunk_id),
        };
        let to_shard = to_shard.into();
        if self.chunks[idx].shard == to_shard {
            return err_at!(BadValue, msg: "chunk is already on shard {}", to_shard);
        }

        let bumped = self.collection_version().bump_major();
        self.chunks[idx].shard = to_shard.clone();
        self.chunks[idx].version = bumped;
        self.chunks[idx].data_written = 0;

        config.save_chunks(&self.ns, self.chunks.clone());
        config.append_changelog(&self.ns, "moveChunk.commit", format!("chunk {} now on {} at {:?}", chunk_id, to_shard, bumped));
        tracing::info!(ns = %self.ns, chunk_id = %chunk_id, to = %to_shard, ?bumped, "moveChunk commit: ownership flipped");

        Ok(bumped)
    }

    pub fn chunk_mut(&mut self, chunk_id: ObjectId) -> Option<&mut Chunk> {
        self.chunks.iter_mut().find(|c| c.id == chunk_id)
    }
}

/// The `setShardVersion` handshake (spec.md §4.7 last paragraph): each
/// shard caches the last collection-version it observed per namespace; a
/// cached version behind the authoritative one must reload before
/// serving, a cached version ahead must refuse and tell the router to
/// refresh. Modeled as the shard side's cache — the router's own cache
/// follows the identical rule and can reuse the same type.
pub struct ShardVersionCache {
    cached: Mutex<HashMap<String, ChunkVersion>>,
}

impl ShardVersionCache {
    pub fn new() -> ShardVersionCache {
        ShardVersionCache { cached: Mutex::new(HashMap::new()) }
    }

    /// Compare the cached version for `ns` against `manager`'s current
    /// collection-version. `Ok(())` means the cache is current and the
    /// caller may proceed; `Err(StaleShardVersion)` means the caller must
    /// reload routing state from the config store and retry (spec.md §7
    /// "StaleShardVersion is caught by the router, which refreshes the
    /// routing table and retries").
    pub fn check(&self, manager: &ChunkManager) -> Result<()> {
        let current = manager.collection_version();
        let mut cached = self.cached.lock().unwrap();
        match cached.get(manager.ns.as_str()) {
            None => {
                cached.insert(manager.ns.clone(), current);
                Ok(())
            }
            Some(v) if *v == current => Ok(()),
            Some(v) => {
                let (cached_v, v) = (*v, current);
                tracing::warn!(ns = %manager.ns, ?cached_v, ?v, "shard version cache stale, caller must reload routing state");
                err_at!(StaleShardVersion, msg: "cached version {:?} does not match collection version {:?} for {}", cached_v, v, manager.ns)
            }
        }
    }

    pub fn refresh(&self, manager: &ChunkManager) {
        self.cached.lock().unwrap().insert(manager.ns.clone(), manager.collection_version());
    }
}

impl Default for ShardVersionCache {
    fn default() -> Self {
        ShardVersionCache::new()
    }
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod manager_test;
