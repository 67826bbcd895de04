//! Background index build: scans a collection snapshot concurrently with
//! ongoing writes, which mirror into the new tree as they land, and hands
//! back a finished [BTree] for the caller to swap in (spec.md §4.3
//! "Background index build").
//!
//! Grounded on `util::as_sharded_array` (written for exactly this: handing
//! each worker its own disjoint sub-range of the collection snapshot) and
//! on the teacher's `rayon`-based parallel map stages (`src/mq/map.rs`):
//! key extraction is embarrassingly parallel across documents, while the
//! tree itself is single-writer, so only the extraction fans out.

use std::sync::Mutex;

use rayon::prelude::*;

use crate::{
    bson::Document,
    btree::{extract_keys, BTree, IndexKey},
    store::RecordLocation,
    Result,
};

/// Drives one background index build from start to [BackgroundBuild::finish].
pub struct BackgroundBuild {
    key_pattern: Vec<(String, i32)>,
    sparse: bool,
    tree: Mutex<BTree>,
}

impl BackgroundBuild {
    pub fn start(unique: bool, key_pattern: Vec<(String, i32)>, sparse: bool) -> BackgroundBuild {
        tracing::info!(unique, sparse, "background index build started");
        BackgroundBuild { key_pattern, sparse, tree: Mutex::new(BTree::new(unique)) }
    }

    /// Extract keys from every `(loc, doc)` pair in `snapshot` in parallel,
    /// then insert the results into the background tree under one lock
    /// (spec.md §4.3 "scans the collection snapshot while concurrent
    /// writes proceed").
    pub fn scan(&self, snapshot: &[(RecordLocation, Document)]) -> Result<()> {
        let extracted: Vec<Result<Vec<(IndexKey, RecordLocation)>>> = snapshot
            .par_iter()
            .map(|(loc, doc)| {
                let (keys, _multi_key) = extract_keys(doc, &self.key_pattern, self.sparse)?;
                Ok(keys.into_iter().map(|k| (k, *loc)).collect())
            })
            .collect();

        let mut tree = self.tree.lock().unwrap();
        for batch in extracted {
            for (key, loc) in batch? {
                tree.insert(key, loc, false)?;
            }
        }
        tracing::debug!(documents = snapshot.len(), "background index build scanned a batch");
        Ok(())
    }

    /// Mirror one concurrent foreground write into the in-progress tree
    /// too, so it is indexed whether it landed before or after the
    /// snapshot scan reached it (spec.md §4.3 "each concurrent write
    /// inserts into both the old and new index").
    pub fn mirror_insert(&self, doc: &Document, loc: RecordLocation) -> Result<()> {
        let (keys, _multi_key) = extract_keys(doc, &self.key_pattern, self.sparse)?;
        let mut tree = self.tree.lock().unwrap();
        for key in keys {
            tree.insert(key, loc, true)?;
        }
        Ok(())
    }

    pub fn mirror_remove(&self, doc: &Document, loc: RecordLocation) -> Result<()> {
        let (keys, _multi_key) = extract_keys(doc, &self.key_pattern, self.sparse)?;
        let mut tree = self.tree.lock().unwrap();
        for key in keys {
            tree.remove(&key, loc);
        }
        Ok(())
    }

    /// Finish the build and hand back the tree. The caller is responsible
    /// for atomically flipping the catalog's `background_index_in_progress`
    /// bit and swapping this tree in as the live index (spec.md §4.3 "on
    /// completion the catalog bit flips atomically").
    pub fn finish(self) -> BTree {
        let tree = self.tree.into_inner().unwrap();
        tracing::info!(entries = tree.len(), "background index build finished");
        tree
    }
}

#[cfg(test)]
#[path = "background_test.rs"]
mod background_test;
