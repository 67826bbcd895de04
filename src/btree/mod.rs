//! The classical B-tree index core: keyed lookup, insertion, multi-key
//! (array) indexing, and cursor traversal (spec.md §4.3).
//!
//! Grounded on `src/llrb/` for the node/entry shape (an entry carries a
//! logical "unused" bit rather than being physically unlinked on delete)
//! and on `src/robt/` (`robt_index.rs`'s `ZBlock`) for the sorted-page,
//! index-by-position cursor shape. See `src/btree/tree.rs` for the
//! routing-array simplification this module documents.

mod background;
mod bucket;
mod key;
mod tree;

pub use background::BackgroundBuild;
pub use key::{extract_keys, IndexKey};
pub use tree::{BTree, Direction, Position};

#[cfg(test)]
#[path = "tree_test.rs"]
mod tree_test;
