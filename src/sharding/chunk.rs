//! [ShardKey], [ChunkVersion] and [Chunk]: the value types the chunk
//! routing table is built from (spec.md §4.7).
//!
//! Grounded on `examples/original_source/s/chunk.cpp`'s `Chunk` (min, max,
//! shard, `_lastmod`, `_dataWritten`, `jumbo`-equivalent problem logging)
//! and on the document model's own `MinKey`/`MaxKey` sentinels (spec.md §3)
//! for the "global-min sentinel" / "global-max sentinel" boundary values
//! spec.md §4.7 names, rather than introducing a separate `Bound<K>`
//! wrapper for this one case.

use cbordata::Cborize;

use crate::{bson::Document, bson::ObjectId, bson::Value, err_at, Result};

pub const SHARD_KEY_VER: u32 = 0x0001_0001;
pub const CHUNK_VERSION_VER: u32 = 0x0001_0001;
pub const CHUNK_VER: u32 = 0x0001_0001;

/// A shard key value: one component per field in the collection's shard
/// key pattern, in pattern order. Compared component-wise via [Value]'s
/// own canonical ordering (spec.md §3), which already defines `MinKey` /
/// `MaxKey` as the lowest/highest-ranked types.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Cborize)]
pub struct ShardKey(pub Vec<Value>);

impl ShardKey {
    pub const ID: u32 = SHARD_KEY_VER;

    /// The key below every possible document, for a shard key of `width`
    /// components (spec.md §4.7 "first chunk's min = global-min sentinel").
    pub fn global_min(width: usize) -> ShardKey {
        ShardKey(vec![Value::MinKey; width.max(1)])
    }

    /// The key above every possible document (spec.md §4.7 "last chunk's
    /// max = global-max sentinel").
    pub fn global_max(width: usize) -> ShardKey {
        ShardKey(vec![Value::MaxKey; width.max(1)])
    }

    pub fn is_global_min(&self) -> bool {
        self.0.iter().all(|v| matches!(v, Value::MinKey))
    }

    pub fn is_global_max(&self) -> bool {
        self.0.iter().all(|v| matches!(v, Value::MaxKey))
    }

    /// Extract the shard key value from a document per `pattern`'s
    /// field-paths, in pattern order. The shard key is immutable per
    /// document (GLOSSARY), so every component must be present; a missing
    /// component is `BadValue`, not an implicit null, to catch the
    /// "document doesn't carry its shard key" mistake at insert time
    /// rather than routing it to the wrong chunk silently.
    pub fn extract(doc: &Document, pattern: &[(String, i32)]) -> Result<ShardKey> {
        let mut components = Vec::with_capacity(pattern.len());
        for (path, _) in pattern {
            let matches = doc.get_path(path);
            match matches.as_slice() {
                [v] => components.push((*v).clone()),
                [] => return err_at!(BadValue, msg: "document missing shard key component {}", path),
                _ => return err_at!(BadValue, msg: "shard key component {} must not resolve through an array", path),
            }
        }
        Ok(ShardKey(components))
    }
}

/// Monotonic `(epoch, major, minor)` chunk/collection version (spec.md
/// §4.7, §2). `epoch` is stamped once at `shardCollection` time and never
/// changes thereafter; `major`/`minor` are the pair spec.md's invariants
/// and end-to-end scenario 6 describe incrementing on every split/migrate.
/// Kept as one type since every comparison needs all three fields: two
/// chunk managers with the same `(major, minor)` but different `epoch`
/// belong to two different shardings of the namespace and must never be
/// compared as if they were the same lineage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Cborize)]
pub struct ChunkVersion {
    pub epoch: u64,
    pub major: u64,
    pub minor: u64,
}

impl ChunkVersion {
    pub const ID: u32 = CHUNK_VERSION_VER;

    pub fn initial(epoch: u64) -> ChunkVersion {
        ChunkVersion { epoch, major: 1, minor: 0 }
    }

    /// The version assigned to a chunk a mutation just touched: major
    /// bumped by one, minor reset, same epoch (spec.md §4.7 "Every chunk
    /// mutation... increments `collection-version.major` by 1").
    pub fn bump_major(&self) -> ChunkVersion {
        ChunkVersion { epoch: self.epoch, major: self.major + 1, minor: 0 }
    }

    /// A second chunk produced by the same mutation (e.g. a split's new
    /// sibling) shares the bumped major but advances minor, so two chunks
    /// touched by one operation still compare distinctly.
    pub fn bump_minor(&self) -> ChunkVersion {
        ChunkVersion { epoch: self.epoch, major: self.major, minor: self.minor + 1 }
    }
}

/// A half-open `[min, max)` key range owned by one shard (spec.md §4.7
/// "Chunk").
#[derive(Clone, Debug, Cborize)]
pub struct Chunk {
    pub id: ObjectId,
    pub ns: String,
    pub min: ShardKey,
    pub max: ShardKey,
    pub shard: String,
    pub version: ChunkVersion,
    /// Best-effort byte counter the auto-split heuristic accumulates
    /// against (spec.md §4.7 "Auto-split trigger"; intentionally
    /// unsynchronized per DESIGN NOTES §9's open question — see
    /// `autosplit.rs`).
    pub data_written: u64,
    /// Set once a split was attempted and no interior split point exists
    /// (every document shares one shard-key value); stops the auto-split
    /// heuristic from retrying every cycle (SPEC_FULL.md §B.4).
    pub jumbo: bool,
}

impl Chunk {
    pub const ID: u32 = CHUNK_VER;

    pub fn new(ns: impl Into<String>, min: ShardKey, max: ShardKey, shard: impl Into<String>, version: ChunkVersion) -> Chunk {
        Chunk {
            id: ObjectId::new(),
            ns: ns.into(),
            min,
            max,
            shard: shard.into(),
            version,
            data_written: 0,
            jumbo: false,
        }
    }

    pub fn contains(&self, key: &ShardKey) -> bool {
        self.min <= *key && *key < self.max
    }

    /// Whether `key` falls strictly inside `(min, max)`, excluding both
    /// ends — a valid split point must satisfy this (spec.md §4.7 "Split"
    /// step 1, `chunk.cpp`'s `!m.isEmpty() && _min.woCompare(m) &&
    /// _max.woCompare(m)`).
    pub fn is_interior_point(&self, key: &ShardKey) -> bool {
        self.min < *key && *key < self.max
    }
}

#[cfg(test)]
#[path = "chunk_test.rs"]
mod chunk_test;
