use super::*;
use crate::bson::Document;

#[test]
fn global_sentinels_bound_every_real_key() {
    let lo = ShardKey::global_min(1);
    let hi = ShardKey::global_max(1);
    let mid = ShardKey(vec![Value::Int32(42)]);
    assert!(lo < mid);
    assert!(mid < hi);
    assert!(lo.is_global_min());
    assert!(hi.is_global_max());
}

#[test]
fn extract_pulls_components_in_pattern_order() {
    let mut doc = Document::new();
    doc.set("x", Value::Int32(5));
    doc.set("y", Value::from("east"));
    let pattern = vec![("x".to_string(), 1), ("y".to_string(), 1)];
    let key = ShardKey::extract(&doc, &pattern).unwrap();
    assert_eq!(key, ShardKey(vec![Value::Int32(5), Value::from("east")]));
}

#[test]
fn extract_fails_on_missing_component() {
    let mut doc = Document::new();
    doc.set("x", Value::Int32(5));
    let pattern = vec![("x".to_string(), 1), ("y".to_string(), 1)];
    assert!(ShardKey::extract(&doc, &pattern).is_err());
}

#[test]
fn chunk_contains_is_half_open() {
    let chunk = Chunk::new(
        "db.coll",
        ShardKey(vec![Value::Int32(0)]),
        ShardKey(vec![Value::Int32(10)]),
        "shard0",
        ChunkVersion::initial(1),
    );
    assert!(chunk.contains(&ShardKey(vec![Value::Int32(0)])));
    assert!(chunk.contains(&ShardKey(vec![Value::Int32(9)])));
    assert!(!chunk.contains(&ShardKey(vec![Value::Int32(10)])));
    assert!(!chunk.contains(&ShardKey(vec![Value::Int32(-1)])));
}

#[test]
fn interior_point_excludes_both_ends() {
    let chunk = Chunk::new(
        "db.coll",
        ShardKey(vec![Value::Int32(0)]),
        ShardKey(vec![Value::Int32(10)]),
        "shard0",
        ChunkVersion::initial(1),
    );
    assert!(!chunk.is_interior_point(&ShardKey(vec![Value::Int32(0)])));
    assert!(!chunk.is_interior_point(&ShardKey(vec![Value::Int32(10)])));
    assert!(chunk.is_interior_point(&ShardKey(vec![Value::Int32(5)])));
}

#[test]
fn bump_major_resets_minor_same_epoch() {
    let v = ChunkVersion::initial(7);
    let bumped = v.bump_major();
    assert_eq!(bumped, ChunkVersion { epoch: 7, major: 2, minor: 0 });
    let sibling = bumped.bump_minor();
    assert_eq!(sibling, ChunkVersion { epoch: 7, major: 2, minor: 1 });
    assert!(sibling > bumped);
    assert!(bumped > v);
}
