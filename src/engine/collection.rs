//! The write path spec.md §2 describes end to end: `store::Store`'s extent
//! allocator, the catalog's [CollectionHeader], and one `btree::BTree` per
//! index descriptor, composed so that an insert is never visible through a
//! scan without also being visible through every index that covers it
//! (spec.md §8: "for any index I and document D in the collection, every
//! key produced by I's key-extractor over D is present in I's B-tree and
//! maps back to D's record location").
//!
//! Grounded on `original_source/s/chunk.cpp`'s call sites against a
//! collection's indexes for shard-key extraction (the one pack file that
//! actually threads "extract keys, then look them up in an index" as a
//! single operation) and on spec.md §4.1's "capped-delete callback" /
//! §4.3's key-pattern walk, which this module is the first to wire
//! together rather than exercise in isolation.

use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    bson::Document,
    btree::{extract_keys, BTree, IndexKey},
    catalog::CollectionHeader,
    store::{Direction, RecordLocation, Store},
    Result,
};

/// One collection's storage plus its live indexes, kept in sync on every
/// mutation. `header` is the in-memory [CollectionHeader] the caller is
/// responsible for persisting back to the [crate::catalog::Catalog] after a
/// mutating call returns `Ok`.
pub struct Collection {
    db: String,
    store: Arc<Store>,
    header: CollectionHeader,
    indexes: HashMap<String, BTree>,
}

impl Collection {
    /// Build a `Collection` over an already-loaded [CollectionHeader],
    /// with a fresh (empty) `BTree` per index descriptor — the caller is
    /// responsible for rebuilding each tree from a [Collection::scan] when
    /// opening a collection that already holds records (spec.md §4.3
    /// "Background index build" covers the concurrent-build variant of the
    /// same rebuild).
    pub fn new(db: impl Into<String>, store: Arc<Store>, header: CollectionHeader) -> Collection {
        let indexes = header.indexes.iter().map(|ix| (ix.name.clone(), BTree::new(ix.unique))).collect();
        Collection { db: db.into(), store, header, indexes }
    }

    pub fn header(&self) -> &CollectionHeader {
        &self.header
    }

    pub fn index(&self, name: &str) -> Option<&BTree> {
        self.indexes.get(name)
    }

    /// Insert `doc`, writing the record then every index's entries for it,
    /// and relaying any capped eviction into index removal (spec.md §2's
    /// data-flow paragraph, in order). If any index rejects the document
    /// (`CannotIndex`, or `DuplicateKey` on a unique index), every key
    /// already inserted for this document is rolled back and the record
    /// itself is removed before the error is returned — spec.md §7: "no
    /// partial writes survive".
    pub fn insert(&mut self, doc: &Document) -> Result<RecordLocation> {
        // Extract every index's keys up front: a CannotIndex failure here
        // must never leave a half-indexed record behind.
        let mut per_index = Vec::with_capacity(self.header.indexes.len());
        for ix in &self.header.indexes {
            let (keys, is_multi_key) = extract_keys(doc, &ix.key_pattern, ix.sparse)?;
            per_index.push((ix.name.clone(), keys, is_multi_key));
        }

        let mut evicted: Vec<(RecordLocation, Document)> = vec![];
        let loc = {
            let mut on_evict = |loc: RecordLocation, evicted_doc: &Document| {
                evicted.push((loc, evicted_doc.clone()));
            };
            self.store.insert(&self.db, &mut self.header, doc, &mut on_evict)?
        };

        if let Err(e) = self.index_new_record(loc, per_index) {
            // Roll back: the record must not outlive a failed index update
            // (spec.md §7).
            let _ = self.store.remove(&self.db, &mut self.header, loc);
            return Err(e);
        }

        for (evicted_loc, evicted_doc) in &evicted {
            self.remove_from_indexes(*evicted_loc, evicted_doc);
        }

        Ok(loc)
    }

    fn index_new_record(
        &mut self,
        loc: RecordLocation,
        per_index: Vec<(String, Vec<IndexKey>, bool)>,
    ) -> Result<()> {
        let mut inserted: Vec<(String, IndexKey)> = vec![];

        for (slot, (name, keys, is_multi_key)) in per_index.into_iter().enumerate() {
            for key in keys {
                let tree = self.indexes.get_mut(&name).expect("index tree exists for every descriptor");
                match tree.insert(key.clone(), loc, false) {
                    Ok(()) => inserted.push((name.clone(), key)),
                    Err(e) => {
                        for (tree_name, key) in &inserted {
                            if let Some(t) = self.indexes.get_mut(tree_name) {
                                t.remove(key, loc);
                            }
                        }
                        return Err(e);
                    }
                }
            }
            if is_multi_key {
                self.header.flags.set_multi_key(slot);
            }
        }

        Ok(())
    }

    /// Update the record at `loc` (previously `old_doc`) to `new_doc`,
    /// recomputing every index's keys. `old_doc`'s entries are removed
    /// before `new_doc`'s are inserted, so a unique index's duplicate check
    /// runs as a plain insert — a live collision there is a genuine
    /// conflict with some other document, never the record's own prior
    /// entry (spec.md §4.3).
    ///
    /// If a new index entry collides, the record at the (possibly new)
    /// location is deleted rather than restored to `old_doc`: `store::Store`
    /// exposes no undo for a write it already committed, so the failure
    /// leaves the document gone instead of stale (spec.md §7's "no partial
    /// writes survive" — the document the caller asked for never fully
    /// existed, so removing it is the safe side to fail on).
    pub fn update(&mut self, loc: RecordLocation, old_doc: &Document, new_doc: &Document) -> Result<RecordLocation> {
        let mut per_index = Vec::with_capacity(self.header.indexes.len());
        for ix in &self.header.indexes {
            let (keys, is_multi_key) = extract_keys(new_doc, &ix.key_pattern, ix.sparse)?;
            per_index.push((ix.name.clone(), keys, is_multi_key));
        }

        self.remove_from_indexes(loc, old_doc);

        let mut evicted: Vec<(RecordLocation, Document)> = vec![];
        let new_loc = {
            let mut on_evict = |loc: RecordLocation, evicted_doc: &Document| {
                evicted.push((loc, evicted_doc.clone()));
            };
            match self.store.update(&self.db, &mut self.header, loc, new_doc, &mut on_evict) {
                Ok(new_loc) => new_loc,
                Err(e) => {
                    // The old index entries are gone; the old record is not
                    // (the store failed before committing to a new
                    // location). Re-index under the old document so the
                    // failed update leaves the collection exactly as it
                    // found it.
                    self.index_existing_record(loc, old_doc);
                    return Err(e);
                }
            }
        };

        let mut failure = None;
        for (slot, (name, keys, is_multi_key)) in per_index.into_iter().enumerate() {
            for key in keys {
                let tree = self.indexes.get_mut(&name).expect("index tree exists for every descriptor");
                // `old_doc`'s entries are already gone (removed above), so
                // this is a plain insert of `new_doc`'s keys, not a same-key
                // in-place swap — a live collision here is a genuine
                // duplicate against some other document.
                if let Err(e) = tree.insert(key, new_loc, false) {
                    failure = Some(e);
                    break;
                }
            }
            if is_multi_key {
                self.header.flags.set_multi_key(slot);
            }
            if failure.is_some() {
                break;
            }
        }

        if let Some(e) = failure {
            self.remove_from_indexes(new_loc, new_doc);
            let _ = self.store.remove(&self.db, &mut self.header, new_loc);
            return Err(e);
        }

        for (evicted_loc, evicted_doc) in &evicted {
            self.remove_from_indexes(*evicted_loc, evicted_doc);
        }

        Ok(new_loc)
    }

    /// Best-effort re-insertion of `doc`'s keys at `loc`, used only to
    /// restore index state after `store::Store::update` fails partway (the
    /// record itself was never moved in that case, so its old keys are
    /// still correct — `remove_from_indexes` already dropped them above).
    fn index_existing_record(&mut self, loc: RecordLocation, doc: &Document) {
        for ix in &self.header.indexes {
            let keys = match extract_keys(doc, &ix.key_pattern, ix.sparse) {
                Ok((keys, _)) => keys,
                Err(_) => continue,
            };
            if let Some(tree) = self.indexes.get_mut(&ix.name) {
                for key in keys {
                    let _ = tree.insert(key, loc, true);
                }
            }
        }
    }

    /// Remove a live record and its index entries together.
    pub fn remove(&mut self, loc: RecordLocation, doc: &Document) -> Result<()> {
        self.remove_from_indexes(loc, doc);
        self.store.remove(&self.db, &mut self.header, loc)
    }

    fn remove_from_indexes(&mut self, loc: RecordLocation, doc: &Document) {
        for ix in &self.header.indexes {
            let keys = match extract_keys(doc, &ix.key_pattern, ix.sparse) {
                Ok((keys, _)) => keys,
                // A document that could no longer produce keys for this
                // pattern (e.g. a field removed by the very update being
                // rolled back) has nothing to remove.
                Err(_) => continue,
            };
            if let Some(tree) = self.indexes.get_mut(&ix.name) {
                for key in keys {
                    tree.remove(&key, loc);
                }
            }
        }
    }

    pub fn scan(&self, direction: Direction) -> Result<Vec<(RecordLocation, Document)>> {
        self.store.scan(&self.db, &self.header, direction)
    }
}

#[cfg(test)]
#[path = "collection_test.rs"]
mod collection_test;
