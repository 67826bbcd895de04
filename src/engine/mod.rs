//! The lock hierarchy spec.md §5 names (global → per-database →
//! per-collection → durability mutex → mapped-file interval-map mutex),
//! plus the [locks::TicketPool] bounded pools every operation must acquire
//! a ticket from before it may enter a database's critical section.
//!
//! Grounded on `util::spinlock::Spinlock`'s reader/writer bookkeeping for
//! the lock-mode shape, generalized from latch-and-spin (non-blocking) to
//! blocking acquisition via `std::sync::RwLock`, since spec.md §5 lists
//! "any of the above locks" as an explicit suspension point a thread may
//! block on — the opposite of the spinlock's non-blocking design brief.
//!
//! Only the leaf level (collection) takes a real `RwLock`; global and
//! per-database levels are *intent* locks recording who is about to touch
//! something beneath them, so a DDL operation's `X` request at a shallower
//! level can detect contention without walking every collection. This
//! mirrors the original's multi-granularity locking without reproducing
//! its full lock-manager: intent compatibility is enforced by acquisition
//! order (callers always request global, then database, then collection,
//! per spec.md §5's fixed hierarchy) rather than by a compatibility matrix.
//!
//! [collection::Collection] is the write-path composition point above this
//! lock hierarchy: it pairs one `store::Store` with the per-index
//! `btree::BTree`s a collection's [crate::catalog::CollectionHeader] names,
//! so a caller above the locks sees a single `insert`/`update`/`remove` that
//! keeps records and indexes consistent (spec.md §2, §8).

pub mod collection;
pub mod locks;

pub use collection::Collection;
pub use locks::{TicketGuard, TicketPool};

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

/// A lock mode requested at one level of the hierarchy (spec.md §5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Signals an intended shared acquisition further down the hierarchy.
    IntentShared,
    /// Signals an intended exclusive acquisition further down the hierarchy.
    IntentExclusive,
    /// Shared (read) access at this level.
    Shared,
    /// Exclusive (write) access at this level, e.g. DDL.
    Exclusive,
}

/// Per-level intent bookkeeping: counts of readers and writers that have
/// announced intent to lock something beneath this level, so an exclusive
/// request at *this* level can tell at a glance whether it must wait.
#[derive(Default)]
struct Intents {
    shared: usize,
    exclusive: usize,
}

/// The top of the hierarchy (spec.md §5, level 1): readers take
/// `IntentShared` then a collection lock; writers take `IntentExclusive`
/// then a collection lock; DDL (create/drop/rename/index-build-finish)
/// takes `Exclusive` directly, which blocks until all outstanding intents
/// at this level have drained.
pub struct GlobalLock {
    intents: Mutex<Intents>,
    exclusive: RwLock<()>,
}

impl Default for GlobalLock {
    fn default() -> GlobalLock {
        GlobalLock { intents: Mutex::new(Intents::default()), exclusive: RwLock::new(()) }
    }
}

impl GlobalLock {
    pub fn new() -> GlobalLock {
        GlobalLock::default()
    }

    /// Acquire `mode` at the global level. `IntentShared`/`IntentExclusive`
    /// register bookkeeping and return immediately (readers and writers are
    /// expected to block, if at all, at the collection level below);
    /// `Exclusive` blocks until the global write-lock is free, which in
    /// turn requires every extant intent guard to have dropped.
    pub fn acquire(&self, mode: LockMode) -> GlobalGuard<'_> {
        match mode {
            LockMode::IntentShared => {
                self.intents.lock().unwrap().shared += 1;
                GlobalGuard { lock: self, mode, exclusive: None }
            }
            LockMode::IntentExclusive => {
                self.intents.lock().unwrap().exclusive += 1;
                GlobalGuard { lock: self, mode, exclusive: None }
            }
            LockMode::Exclusive => {
                let guard = self.exclusive.write().unwrap();
                GlobalGuard { lock: self, mode, exclusive: Some(guard.into()) }
            }
            LockMode::Shared => {
                let guard = self.exclusive.read().unwrap();
                GlobalGuard { lock: self, mode, exclusive: Some(guard.into()) }
            }
        }
    }
}

pub struct GlobalGuard<'a> {
    lock: &'a GlobalLock,
    mode: LockMode,
    // Present only for Shared/Exclusive; borrows the inner RwLock so the
    // guard's lifetime ties the two together. Read and write guards differ
    // in type, so this is carried as a small enum instead.
    exclusive: Option<GlobalRwGuard<'a>>,
}

enum GlobalRwGuard<'a> {
    Read(RwLockReadGuard<'a, ()>),
    Write(RwLockWriteGuard<'a, ()>),
}

impl<'a> From<RwLockReadGuard<'a, ()>> for GlobalRwGuard<'a> {
    fn from(g: RwLockReadGuard<'a, ()>) -> Self {
        GlobalRwGuard::Read(g)
    }
}
impl<'a> From<RwLockWriteGuard<'a, ()>> for GlobalRwGuard<'a> {
    fn from(g: RwLockWriteGuard<'a, ()>) -> Self {
        GlobalRwGuard::Write(g)
    }
}

impl Drop for GlobalGuard<'_> {
    fn drop(&mut self) {
        match self.mode {
            LockMode::IntentShared => self.lock.intents.lock().unwrap().shared -= 1,
            LockMode::IntentExclusive => self.lock.intents.lock().unwrap().exclusive -= 1,
            LockMode::Shared | LockMode::Exclusive => {}
        }
    }
}

/// Per-database lock (spec.md §5, level 2): `Shared` or `Exclusive` only —
/// the original offers no intent mode at this level since the namespace
/// catalog's hash table is guarded wholesale by it (spec.md §5 "The
/// namespace catalog's hash table is guarded by the per-database X lock for
/// mutations; readers take S").
pub struct DatabaseLock {
    inner: RwLock<()>,
}

impl Default for DatabaseLock {
    fn default() -> DatabaseLock {
        DatabaseLock { inner: RwLock::new(()) }
    }
}

impl DatabaseLock {
    pub fn new() -> DatabaseLock {
        DatabaseLock::default()
    }

    pub fn lock_shared(&self) -> RwLockReadGuard<'_, ()> {
        self.inner.read().unwrap()
    }

    pub fn lock_exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        self.inner.write().unwrap()
    }
}

/// Per-collection lock (spec.md §5, level 3): `Shared`, `IntentExclusive`
/// (a writer that still allows other writers into *different* records of
/// the same collection — modeled here as shared access at this level,
/// since per-record exclusion is the B-tree/record-store's job, not the
/// lock hierarchy's), or `Exclusive` (index builds, collection drop).
pub struct CollectionLock {
    inner: RwLock<()>,
}

impl Default for CollectionLock {
    fn default() -> CollectionLock {
        CollectionLock { inner: RwLock::new(()) }
    }
}

impl CollectionLock {
    pub fn new() -> CollectionLock {
        CollectionLock::default()
    }

    pub fn lock_shared(&self) -> RwLockReadGuard<'_, ()> {
        self.inner.read().unwrap()
    }

    /// `IntentExclusive` and plain writer acquisition both map to the read
    /// side of this `RwLock`: concurrent writers to distinct records are
    /// allowed, matching spec.md §5's intent that only *DDL* takes a real
    /// exclusive collection lock.
    pub fn lock_intent_exclusive(&self) -> RwLockReadGuard<'_, ()> {
        self.inner.read().unwrap()
    }

    pub fn lock_exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        self.inner.write().unwrap()
    }
}

/// Registry mapping `db` and `db.collection` names onto their lock, created
/// lazily on first acquisition. One [GlobalLock] is shared process-wide,
/// alongside the read-ticket and write-ticket pools spec.md §5 names as a
/// second kind of suspension point, independent of the lock hierarchy.
pub struct LockManager {
    global: GlobalLock,
    databases: Mutex<HashMap<String, Arc<DatabaseLock>>>,
    collections: Mutex<HashMap<(String, String), Arc<CollectionLock>>>,
    read_tickets: TicketPool,
    write_tickets: TicketPool,
}

impl Default for LockManager {
    fn default() -> LockManager {
        LockManager::with_tickets(crate::config::DEFAULT_TICKETS, crate::config::DEFAULT_TICKETS)
    }
}

impl LockManager {
    pub fn new() -> LockManager {
        LockManager::default()
    }

    pub fn with_tickets(read_tickets: usize, write_tickets: usize) -> LockManager {
        LockManager {
            global: GlobalLock::new(),
            databases: Mutex::new(HashMap::new()),
            collections: Mutex::new(HashMap::new()),
            read_tickets: TicketPool::new("read", read_tickets),
            write_tickets: TicketPool::new("write", write_tickets),
        }
    }

    pub fn global(&self) -> &GlobalLock {
        &self.global
    }

    /// Acquire a read ticket (spec.md §5 suspension point (b)); held until
    /// the returned guard drops.
    pub fn acquire_read_ticket(&self) -> TicketGuard<'_> {
        self.read_tickets.acquire()
    }

    /// Acquire a write ticket (spec.md §5 suspension point (b)).
    pub fn acquire_write_ticket(&self) -> TicketGuard<'_> {
        self.write_tickets.acquire()
    }

    pub fn database(&self, db: &str) -> Arc<DatabaseLock> {
        let mut dbs = self.databases.lock().unwrap();
        Arc::clone(dbs.entry(db.to_string()).or_insert_with(|| Arc::new(DatabaseLock::new())))
    }

    pub fn collection(&self, db: &str, coll: &str) -> Arc<CollectionLock> {
        let mut colls = self.collections.lock().unwrap();
        let key = (db.to_string(), coll.to_string());
        Arc::clone(colls.entry(key).or_insert_with(|| Arc::new(CollectionLock::new())))
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
