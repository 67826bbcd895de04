//! [WriteIntent] and the [IntentSink] every storage mutation registers its
//! dirty byte-range with, plus [GroupCommit] — the process-wide collector
//! a group-commit tick drains (spec.md §4.5 steps 1-2).

use std::sync::Mutex;

use crate::durability::DurOp;

/// A `(db, file, offset, length)` dirty-region announcement (spec.md
/// "Write intent"). `file_no` stands in for the private-view pointer's
/// owning file; resolving a raw pointer to `(file-id, offset, length)` via
/// the mapped-file interval map (spec.md §4.5 step 2) is unnecessary here
/// since every caller already knows its file. `db` is carried explicitly
/// because one [GroupCommit] is shared by every database a process has
/// open, and the prepared log buffer needs it to emit the right
/// `db-context` entry (spec.md §4.5 step 3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteIntent {
    pub db: String,
    pub file_no: i32,
    pub offset: u64,
    pub len: u64,
}

/// Sink every storage mutation registers its dirty byte-range with.
/// `store::Store` is generic over this so tests can use a no-op sink
/// while the engine wires a real [GroupCommit].
pub trait IntentSink: Send + Sync {
    fn record(&self, intent: WriteIntent);
}

/// No-op sink for storage-layer tests that don't exercise durability.
pub struct NullIntentSink;

impl IntentSink for NullIntentSink {
    fn record(&self, _intent: WriteIntent) {}
}

/// Collects intents from every thread under one mutex. This crate's
/// "per-thread deferred lists" (spec.md §4.5) collapse to a single shared
/// list behind a short critical section, since the lock is only ever held
/// for a `push`; the merge itself happens outside the lock once drained.
#[derive(Default)]
pub struct GroupCommit {
    pending: Mutex<Vec<WriteIntent>>,
    /// Non-basic ops (file-create, database-drop) queued for the next tick,
    /// in the order they were recorded (spec.md §4.5 step 3 "For each
    /// non-basic op... a typed op-record").
    ops: Mutex<Vec<DurOp>>,
}

impl GroupCommit {
    pub fn new() -> GroupCommit {
        GroupCommit::default()
    }

    /// Drain the pending list and merge abutting/overlapping ranges per
    /// file (spec.md §4.5 step 1).
    pub fn drain_merged(&self) -> Vec<WriteIntent> {
        let mut intents: Vec<WriteIntent> = {
            let mut pending = self.pending.lock().unwrap();
            pending.drain(..).collect()
        };
        merge_intents(&mut intents);
        intents
    }

    /// Queue a non-basic op for the next group-commit tick to emit ahead
    /// of the basic writes (spec.md §4.5 step 3).
    pub fn record_op(&self, op: DurOp) {
        self.ops.lock().unwrap().push(op);
    }

    pub fn drain_ops(&self) -> Vec<DurOp> {
        self.ops.lock().unwrap().drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().unwrap().is_empty() && self.ops.lock().unwrap().is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

impl IntentSink for GroupCommit {
    fn record(&self, intent: WriteIntent) {
        self.pending.lock().unwrap().push(intent);
    }
}

fn merge_intents(intents: &mut Vec<WriteIntent>) {
    intents.sort_by(|a, b| (a.db.as_str(), a.file_no, a.offset).cmp(&(b.db.as_str(), b.file_no, b.offset)));
    let mut merged: Vec<WriteIntent> = vec![];
    for intent in intents.drain(..) {
        match merged.last_mut() {
            Some(last)
                if last.db == intent.db
                    && last.file_no == intent.file_no
                    && intent.offset <= last.offset + last.len =>
            {
                let end = (last.offset + last.len).max(intent.offset + intent.len);
                last.len = end - last.offset;
            }
            _ => merged.push(intent),
        }
    }
    *intents = merged;
}

#[cfg(test)]
mod intent_test {
    use super::*;

    fn intent(db: &str, file_no: i32, offset: u64, len: u64) -> WriteIntent {
        WriteIntent { db: db.to_string(), file_no, offset, len }
    }

    #[test]
    fn abutting_intents_merge() {
        let gc = GroupCommit::new();
        gc.record(intent("test", 0, 0, 16));
        gc.record(intent("test", 0, 16, 16));
        gc.record(intent("test", 0, 100, 4));

        let merged = gc.drain_merged();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0], intent("test", 0, 0, 32));
        assert_eq!(merged[1], intent("test", 0, 100, 4));
    }

    #[test]
    fn different_files_do_not_merge() {
        let gc = GroupCommit::new();
        gc.record(intent("test", 0, 0, 16));
        gc.record(intent("test", 1, 0, 16));
        assert_eq!(gc.drain_merged().len(), 2);
    }

    #[test]
    fn different_databases_do_not_merge() {
        let gc = GroupCommit::new();
        gc.record(intent("a", 0, 0, 16));
        gc.record(intent("b", 0, 0, 16));
        assert_eq!(gc.drain_merged().len(), 2);
    }

    #[test]
    fn ops_drain_in_order_and_are_independent_of_intents() {
        let gc = GroupCommit::new();
        gc.record_op(DurOp::FileCreated { db: "test".into(), file_no: 0, size: 4096 });
        gc.record_op(DurOp::DropDb { db: "old".into() });
        gc.record(intent("test", 0, 0, 16));

        assert!(!gc.is_empty());
        let ops = gc.drain_ops();
        assert_eq!(ops.len(), 2);
        assert!(matches!(ops[0], DurOp::FileCreated { .. }));
        assert!(matches!(ops[1], DurOp::DropDb { .. }));

        // draining ops leaves the intents untouched
        assert_eq!(gc.drain_merged().len(), 1);
    }
}
