//! Index-key extraction: turning a key-pattern (`{a:1, b:-1}`) and a source
//! document into the concatenated, direction-applied keys the tree stores
//! (spec.md §4.3).
//!
//! Grounded on `examples/original_source/db/index.h`'s key-pattern walk and
//! on `bson::document::Document::get_path`'s array fan-out, which fans out
//! when the path crosses an array on its way to a further segment.
//! `get_path` leaves a *terminal* array match unexpanded (one `Value::Array`
//! candidate, the way [crate::matcher::predicate]'s `expand()` needs it for
//! `$size`), so `extract_keys` below expands that case itself before
//! building the cross product.

use crate::{bson::Document, bson::Value, err_at, Result};

/// One component of a compound index key, after direction has been applied
/// (a descending component's comparison is a mirror of `Value::cmp`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexKey {
    pub components: Vec<Value>,
    pub directions: Vec<i32>,
}

impl IndexKey {
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl PartialOrd for IndexKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexKey {
    /// Lexicographic over components, each compared per its own direction.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use std::cmp::Ordering;

        for i in 0..self.components.len().min(other.components.len()) {
            let ord = self.components[i].cmp(&other.components[i]);
            let ord = if self.directions.get(i).copied().unwrap_or(1) < 0 { ord.reverse() } else { ord };
            match ord {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        self.components.len().cmp(&other.components.len())
    }
}

/// Extract every index key a document produces for `key_pattern`, applying
/// the multi-key fan-out and "≥2 array components" CannotIndex rule
/// (spec.md §4.3). `sparse` skips documents missing every component
/// entirely rather than indexing them under an explicit `Null` key
/// (SPEC_FULL.md §B.3).
///
/// Returns `(keys, is_multi_key)`.
pub fn extract_keys(doc: &Document, key_pattern: &[(String, i32)], sparse: bool) -> Result<(Vec<IndexKey>, bool)> {
    let directions: Vec<i32> = key_pattern.iter().map(|(_, d)| *d).collect();

    let mut per_component: Vec<Vec<Value>> = vec![];
    let mut array_components = 0;
    let mut any_present = false;

    for (path, _) in key_pattern {
        let matches = doc.get_path(path);
        if !matches.is_empty() {
            any_present = true;
        }
        let mut is_array_component = matches.len() > 1;
        let values: Vec<Value> = if matches.is_empty() {
            vec![Value::Null]
        } else if let [Value::Array(items)] = matches.as_slice() {
            // terminal array match: get_path returns it whole (see this
            // module's doc comment); fan out to its elements here, the
            // way predicate::expand() does for query matching.
            is_array_component = true;
            items.clone()
        } else {
            matches.into_iter().cloned().collect()
        };
        if is_array_component {
            array_components += 1;
        }
        per_component.push(values);
    }

    if array_components >= 2 {
        return err_at!(CannotIndex, msg: "parallel arrays across {} key-pattern components", array_components);
    }

    if sparse && !any_present {
        return Ok((vec![], false));
    }

    let is_multi_key = array_components == 1;

    let mut keys = vec![IndexKey { components: vec![], directions: directions.clone() }];
    for values in per_component {
        let mut next = Vec::with_capacity(keys.len() * values.len().max(1));
        for key in &keys {
            for v in &values {
                let mut components = key.components.clone();
                components.push(v.clone());
                next.push(IndexKey { components, directions: directions.clone() });
            }
        }
        keys = next;
    }

    Ok((keys, is_multi_key))
}

#[cfg(test)]
#[path = "key_test.rs"]
mod key_test;
