//! A bucket: one sorted page of index entries (spec.md §4.3 "bucket
//! split"). Grounded on `robt_index.rs`'s `ZBlock` leaf-page shape
//! (sorted entries, `to_entry(index)` addressing), generalized from an
//! immutable on-disk block to a mutable in-memory one with unused-entry
//! marking rather than physical compaction on delete.

use crate::btree::key::IndexKey;
use crate::store::RecordLocation;

/// A bucket holds at most this many live-or-unused entries before an
/// insert triggers a split (spec.md §4.3 "bucket split... to avoid
/// rebalancing under mixed insert/delete workloads").
pub const BUCKET_CAPACITY: usize = 64;

/// Once the unused fraction of a bucket's entries crosses this ratio, the
/// next insert into the bucket compacts it first instead of risking an
/// avoidable split (spec.md §4.3 "physical compaction happens
/// opportunistically on subsequent inserts in the same bucket").
pub const COMPACT_UNUSED_RATIO: f64 = 0.5;

#[derive(Clone, Debug)]
pub struct Entry {
    pub key: IndexKey,
    pub loc: RecordLocation,
    pub unused: bool,
}

/// One page of the tree. Buckets form a doubly-linked chain across the
/// whole key range via `next`/`prev` (arena indices into
/// [crate::btree::tree::BTree::buckets]), independent of the routing
/// array that locates which bucket a key falls into.
#[derive(Clone, Debug, Default)]
pub struct Bucket {
    pub entries: Vec<Entry>,
    pub next: Option<usize>,
    pub prev: Option<usize>,
}

impl Bucket {
    pub fn new() -> Bucket {
        Bucket { entries: vec![], next: None, prev: None }
    }

    /// Position of `key` within this bucket: `Ok(i)` if an entry (live or
    /// unused) equals `key`, `Err(i)` for the insertion point otherwise.
    pub fn search(&self, key: &IndexKey) -> Result<usize, usize> {
        self.entries.binary_search_by(|e| e.key.cmp(key))
    }

    pub fn unused_count(&self) -> usize {
        self.entries.iter().filter(|e| e.unused).count()
    }

    pub fn needs_compaction(&self) -> bool {
        !self.entries.is_empty()
            && (self.unused_count() as f64 / self.entries.len() as f64) >= COMPACT_UNUSED_RATIO
    }

    /// Drop unused entries, preserving order.
    pub fn compact(&mut self) {
        self.entries.retain(|e| !e.unused);
    }

    pub fn min_key(&self) -> Option<&IndexKey> {
        self.entries.first().map(|e| &e.key)
    }

    /// Split this bucket in half by entry count, returning the upper-half
    /// entries for the caller to install as a new bucket.
    pub fn split_off(&mut self) -> Vec<Entry> {
        let mid = self.entries.len() / 2;
        self.entries.split_off(mid)
    }
}
