use super::*;
use crate::bson::Value;

fn doc_with(fields: &[(&str, Value)]) -> Document {
    let mut doc = Document::new();
    for (name, value) in fields {
        doc.set(*name, value.clone());
    }
    doc
}

fn loc(n: i64) -> RecordLocation {
    RecordLocation { file_no: 0, offset: n }
}

#[test]
fn scan_indexes_every_document_in_the_snapshot() {
    let build = BackgroundBuild::start(false, vec![("a".into(), 1)], false);
    let snapshot: Vec<(RecordLocation, Document)> = (0..50)
        .map(|i| (loc(i), doc_with(&[("a", Value::Int32(i as i32))])))
        .collect();

    build.scan(&snapshot).unwrap();
    let tree = build.finish();
    assert_eq!(tree.len(), 50);
}

#[test]
fn mirrored_write_lands_in_the_in_progress_tree() {
    let build = BackgroundBuild::start(false, vec![("a".into(), 1)], false);
    build.mirror_insert(&doc_with(&[("a", Value::Int32(1))]), loc(0)).unwrap();
    let tree = build.finish();
    assert_eq!(tree.len(), 1);
}

#[test]
fn mirrored_remove_retracts_a_mirrored_write() {
    let build = BackgroundBuild::start(false, vec![("a".into(), 1)], false);
    let doc = doc_with(&[("a", Value::Int32(1))]);
    build.mirror_insert(&doc, loc(0)).unwrap();
    build.mirror_remove(&doc, loc(0)).unwrap();
    let tree = build.finish();
    assert_eq!(tree.len(), 0);
}

#[test]
fn sparse_build_skips_documents_missing_the_field() {
    let build = BackgroundBuild::start(false, vec![("missing".into(), 1)], true);
    let snapshot = vec![(loc(0), doc_with(&[("a", Value::Int32(1))]))];
    build.scan(&snapshot).unwrap();
    let tree = build.finish();
    assert_eq!(tree.len(), 0);
}
