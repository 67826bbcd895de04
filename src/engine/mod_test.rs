use super::*;

#[test]
fn collection_locks_are_scoped_by_db_and_name() {
    let mgr = LockManager::new();
    let a = mgr.collection("test", "a");
    let a_again = mgr.collection("test", "a");
    let b = mgr.collection("test", "b");
    assert!(Arc::ptr_eq(&a, &a_again));
    assert!(!Arc::ptr_eq(&a, &b));
}

#[test]
fn database_locks_are_scoped_by_name() {
    let mgr = LockManager::new();
    let d1 = mgr.database("db1");
    let d1_again = mgr.database("db1");
    let d2 = mgr.database("db2");
    assert!(Arc::ptr_eq(&d1, &d1_again));
    assert!(!Arc::ptr_eq(&d1, &d2));
}

#[test]
fn collection_lock_allows_concurrent_shared_readers() {
    let lock = CollectionLock::new();
    let g1 = lock.lock_shared();
    let g2 = lock.lock_shared();
    drop(g1);
    drop(g2);
}

#[test]
fn collection_lock_exclusive_excludes_after_shared_drops() {
    let lock = CollectionLock::new();
    {
        let _g = lock.lock_shared();
    }
    let _x = lock.lock_exclusive();
}

#[test]
fn global_intent_guards_do_not_block_each_other() {
    let global = GlobalLock::new();
    let g1 = global.acquire(LockMode::IntentShared);
    let g2 = global.acquire(LockMode::IntentExclusive);
    drop(g1);
    drop(g2);
}

#[test]
fn database_lock_exclusive_after_shared_release() {
    let lock = DatabaseLock::new();
    {
        let _s = lock.lock_shared();
    }
    let _x = lock.lock_exclusive();
}

#[test]
fn tickets_are_bounded_and_independent_pools() {
    let mgr = LockManager::with_tickets(1, 2);
    let _r = mgr.acquire_read_ticket();
    let _w1 = mgr.acquire_write_ticket();
    let _w2 = mgr.acquire_write_ticket();
}
