use super::*;
use crate::bson::{Document, Value};
use crate::sharding::manager::ChunkManager;

fn setup() -> (ChunkManager, ConfigStore, ObjectId) {
    let config = ConfigStore::new();
    let mgr = ChunkManager::new("db.coll", vec![("x".to_string(), 1)], "shard0", 1);
    let chunk_id = mgr.chunks()[0].id;
    (mgr, config, chunk_id)
}

fn doc(x: i32) -> Document {
    let mut d = Document::new();
    d.set("x", Value::Int32(x));
    d
}

#[test]
fn start_migrate_streams_every_document_and_advances_to_catch_up() {
    let (_mgr, _config, chunk_id) = setup();
    let mut coord = MigrateCoordinator::new("db.coll", chunk_id, "shard0", "shard1");

    let docs = vec![doc(1), doc(2), doc(3)];
    let mut sent = vec![];
    coord.start_migrate(&docs, |d| {
        sent.push(d.clone());
        Ok(())
    }).unwrap();

    assert_eq!(sent.len(), 3);
    assert_eq!(coord.phase, MigratePhase::CatchUp);
}

#[test]
fn start_migrate_aborts_when_the_recipient_rejects_a_document() {
    let (_mgr, _config, chunk_id) = setup();
    let mut coord = MigrateCoordinator::new("db.coll", chunk_id, "shard0", "shard1");

    let docs = vec![doc(1)];
    let err = coord.start_migrate(&docs, |_| crate::err_at!(Fatal, msg: "recipient unreachable"));
    assert!(err.is_err());
    assert_eq!(coord.phase, MigratePhase::Aborted);
}

#[test]
fn start_migrate_twice_is_rejected() {
    let (_mgr, _config, chunk_id) = setup();
    let mut coord = MigrateCoordinator::new("db.coll", chunk_id, "shard0", "shard1");
    coord.start_migrate(&[], |_| Ok(())).unwrap();
    assert!(coord.start_migrate(&[], |_| Ok(())).is_err());
}

#[test]
fn record_mod_is_tracked_during_cloning_and_catch_up_only() {
    let (_mgr, _config, chunk_id) = setup();
    let mut coord = MigrateCoordinator::new("db.coll", chunk_id, "shard0", "shard1");

    // before start_migrate the phase is NotStarted; record_mod is a no-op.
    coord.record_mod(ModsLogEntry::Upsert(doc(1)));
    assert_eq!(coord.pending_mods(), 0);

    coord.start_migrate(&[], |_| Ok(())).unwrap();
    coord.record_mod(ModsLogEntry::Upsert(doc(2)));
    coord.record_mod(ModsLogEntry::Remove(ShardKey(vec![Value::Int32(3)])));
    assert_eq!(coord.pending_mods(), 2);
}

#[test]
fn catch_up_drains_to_bound_then_flushes_the_rest_in_the_critical_section() {
    let (_mgr, _config, chunk_id) = setup();
    let mut coord = MigrateCoordinator::new("db.coll", chunk_id, "shard0", "shard1");
    coord.start_migrate(&[], |_| Ok(())).unwrap();

    for i in 0..5 {
        coord.record_mod(ModsLogEntry::Upsert(doc(i)));
    }
    assert_eq!(coord.pending_mods(), 5);

    let mut applied = vec![];
    coord.catch_up(2, |entry| {
        applied.push(entry.clone());
        Ok(())
    }).unwrap();

    assert_eq!(applied.len(), 5, "catch_up drains down to the bound, then flushes whatever remains in the critical section");
    assert_eq!(coord.pending_mods(), 0);
    assert_eq!(coord.phase, MigratePhase::Critical);
}

#[test]
fn catch_up_outside_its_phase_is_rejected() {
    let (_mgr, _config, chunk_id) = setup();
    let mut coord = MigrateCoordinator::new("db.coll", chunk_id, "shard0", "shard1");
    assert!(coord.catch_up(0, |_| Ok(())).is_err());
}

#[test]
fn catch_up_aborts_on_apply_failure() {
    let (_mgr, _config, chunk_id) = setup();
    let mut coord = MigrateCoordinator::new("db.coll", chunk_id, "shard0", "shard1");
    coord.start_migrate(&[], |_| Ok(())).unwrap();
    coord.record_mod(ModsLogEntry::Upsert(doc(1)));

    let err = coord.catch_up(0, |_| crate::err_at!(Fatal, msg: "recipient dropped connection"));
    assert!(err.is_err());
    assert_eq!(coord.phase, MigratePhase::Aborted);
}

#[test]
fn commit_flips_ownership_and_bumps_only_the_moved_chunk() {
    let (mut mgr, config, chunk_id) = setup();
    let mut coord = MigrateCoordinator::new("db.coll", chunk_id, "shard0", "shard1");
    coord.start_migrate(&[], |_| Ok(())).unwrap();
    coord.catch_up(0, |_| Ok(())).unwrap();

    let version = coord.commit(&mut mgr, &config).unwrap();
    assert_eq!(coord.phase, MigratePhase::Committed);
    assert_eq!(mgr.find_chunk(&mgr.chunks()[0].min.clone()).unwrap().shard, "shard1");
    assert_eq!(mgr.find_chunk(&mgr.chunks()[0].min.clone()).unwrap().version, version);
}

#[test]
fn commit_outside_critical_phase_is_rejected() {
    let (mut mgr, config, chunk_id) = setup();
    let mut coord = MigrateCoordinator::new("db.coll", chunk_id, "shard0", "shard1");
    assert!(coord.commit(&mut mgr, &config).is_err());
}

#[test]
fn abort_clears_the_mods_log_unless_already_committed() {
    let (_mgr, _config, chunk_id) = setup();
    let mut coord = MigrateCoordinator::new("db.coll", chunk_id, "shard0", "shard1");
    coord.start_migrate(&[], |_| Ok(())).unwrap();
    coord.record_mod(ModsLogEntry::Upsert(doc(1)));

    coord.abort();
    assert_eq!(coord.phase, MigratePhase::Aborted);
    assert_eq!(coord.pending_mods(), 0);
}

#[test]
fn reconcile_corrects_a_local_view_that_disagrees_with_the_config_store() {
    let (mut mgr, config, _chunk_id) = setup();
    let mut authoritative = mgr.chunks().to_vec();
    authoritative[0].shard = "shard1".to_string();
    authoritative[0].version = authoritative[0].version.bump_major();
    config.save_chunks(&mgr.ns.clone(), authoritative.clone());

    let corrected = reconcile(&mut mgr, &config);
    assert_eq!(corrected, vec![authoritative[0].id]);
    assert_eq!(mgr.chunks()[0].shard, "shard1");
    assert_eq!(mgr.chunks()[0].version, authoritative[0].version);
}

#[test]
fn reconcile_is_a_no_op_when_local_view_already_agrees() {
    let (mut mgr, config, _chunk_id) = setup();
    config.save_chunks(&mgr.ns.clone(), mgr.chunks().to_vec());
    assert!(reconcile(&mut mgr, &config).is_empty());
}
