use std::sync::Arc;

use super::*;
use crate::{
    bson::Value,
    catalog::IndexDescriptor,
    durability::NullIntentSink,
    store::Store,
    Error,
};

fn tmp_dbpath(name: &str) -> std::path::PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("docstore-core-collection-test-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&p);
    std::fs::create_dir_all(&p).unwrap();
    p
}

fn doc(a: i32, b: &str) -> Document {
    let mut d = Document::new();
    d.set("a", Value::Int32(a));
    d.set("b", Value::String(b.to_string()));
    d
}

fn new_collection(name: &str, dbpath: &std::path::Path) -> Collection {
    let store = Arc::new(Store::new(dbpath.as_os_str(), Arc::new(NullIntentSink)));
    let mut header = CollectionHeader::new(name);
    header.indexes.push(IndexDescriptor::new("a_1", vec![("a".into(), 1)]).set_unique(true));
    Collection::new("test", store, header)
}

#[test]
fn insert_populates_every_index() {
    let dbpath = tmp_dbpath("insert");
    let mut coll = new_collection("test.idx", &dbpath);

    let loc = coll.insert(&doc(1, "x")).unwrap();

    let entries = coll.index("a_1").unwrap().iter_all();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].1, loc);
}

#[test]
fn unique_index_rejects_duplicate_and_the_record_does_not_survive() {
    let dbpath = tmp_dbpath("dup");
    let mut coll = new_collection("test.dup", &dbpath);

    coll.insert(&doc(1, "first")).unwrap();
    let err = coll.insert(&doc(1, "second")).unwrap_err();
    assert!(matches!(err, Error::DuplicateKey(_)));

    // The rejected document must not have left a record behind (spec.md §7).
    let scanned = coll.scan(Direction::Forward).unwrap();
    assert_eq!(scanned.len(), 1);
    assert_eq!(coll.index("a_1").unwrap().len(), 1);
}

#[test]
fn parallel_arrays_across_compound_index_are_rejected_as_cannot_index() {
    let dbpath = tmp_dbpath("multikey");
    let store = Arc::new(Store::new(dbpath.as_os_str(), Arc::new(NullIntentSink)));
    let mut header = CollectionHeader::new("test.multikey");
    header.indexes.push(IndexDescriptor::new("ab", vec![("a".into(), 1), ("b".into(), 1)]));
    let mut coll = Collection::new("test", store, header);

    let mut d = Document::new();
    d.set("a", Value::Array(vec![Value::Int32(1), Value::Int32(2)]));
    d.set("b", Value::Array(vec![Value::Int32(3), Value::Int32(4)]));

    let err = coll.insert(&d).unwrap_err();
    assert!(matches!(err, Error::CannotIndex(_)));
    assert_eq!(coll.scan(Direction::Forward).unwrap().len(), 0);
}

#[test]
fn single_array_field_sets_multi_key_and_indexes_every_element() {
    let dbpath = tmp_dbpath("singlearray");
    let store = Arc::new(Store::new(dbpath.as_os_str(), Arc::new(NullIntentSink)));
    let mut header = CollectionHeader::new("test.singlearray");
    header.indexes.push(IndexDescriptor::new("tags", vec![("tags".into(), 1)]));
    let mut coll = Collection::new("test", store, header);

    let mut d = Document::new();
    d.set("tags", Value::Array(vec![Value::Int32(1), Value::Int32(2), Value::Int32(3)]));
    coll.insert(&d).unwrap();

    assert!(coll.header().flags.is_multi_key(0));
    assert_eq!(coll.index("tags").unwrap().len(), 3);
}

#[test]
fn capped_eviction_removes_the_evicted_documents_index_entries() {
    let dbpath = tmp_dbpath("cappedidx");
    let store = Arc::new(Store::new(dbpath.as_os_str(), Arc::new(NullIntentSink)));
    let mut header = CollectionHeader::new("test.cappedidx");
    header.flags.capped = true;
    header.capped_max_docs = 3;
    header.capped_max_size = 1024 * 1024;
    header.indexes.push(IndexDescriptor::new("a_1", vec![("a".into(), 1)]).set_unique(true));
    let mut coll = Collection::new("test", store, header);

    for i in 0..5 {
        coll.insert(&doc(i, "v")).unwrap();
    }

    // Only the 3 surviving documents' keys remain indexed; the evicted
    // documents (a=0, a=1) must have been removed via the capped-delete
    // callback's reverse lookup, not merely aged out of the live record set.
    let mut keys: Vec<i32> = coll
        .index("a_1")
        .unwrap()
        .iter_all()
        .map(|(k, _)| match &k.components[0] {
            Value::Int32(v) => *v,
            _ => unreachable!(),
        })
        .collect();
    keys.sort();
    assert_eq!(keys, vec![2, 3, 4]);
}

#[test]
fn update_moves_index_entries_to_the_new_key() {
    let dbpath = tmp_dbpath("update");
    let mut coll = new_collection("test.update", &dbpath);

    let loc = coll.insert(&doc(1, "x")).unwrap();
    let new_loc = coll.update(loc, &doc(1, "x"), &doc(2, "y")).unwrap();

    let entries = coll.index("a_1").unwrap().iter_all();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].1, new_loc);
    match &entries[0].0.components[0] {
        Value::Int32(v) => assert_eq!(*v, 2),
        _ => unreachable!(),
    }
}

#[test]
fn update_rejected_by_unique_index_removes_the_updated_record() {
    let dbpath = tmp_dbpath("updatedup");
    let mut coll = new_collection("test.updatedup", &dbpath);

    let loc1 = coll.insert(&doc(1, "x")).unwrap();
    coll.insert(&doc(2, "y")).unwrap();

    let err = coll.update(loc1, &doc(1, "x"), &doc(2, "z")).unwrap_err();
    assert!(matches!(err, Error::DuplicateKey(_)));

    // The record that tried to take the conflicting key is gone rather
    // than left stale under its old key (see `Collection::update`'s doc
    // comment); only the document that legitimately owns key 2 survives.
    let scanned = coll.scan(Direction::Forward).unwrap();
    assert_eq!(scanned.len(), 1);

    let mut keys: Vec<i32> = coll
        .index("a_1")
        .unwrap()
        .iter_all()
        .map(|(k, _)| match &k.components[0] {
            Value::Int32(v) => *v,
            _ => unreachable!(),
        })
        .collect();
    keys.sort();
    assert_eq!(keys, vec![2]);
}
