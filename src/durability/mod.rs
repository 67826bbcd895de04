//! Per-thread write-intent tracking and the prepared log buffer that feeds
//! group commit (spec.md §4.5).
//!
//! Grounded on the teacher's `wral::batch` per-thread batching (collect →
//! flush into one buffer) and on
//! `examples/original_source/db/dur_preplogbuffer.cpp`'s
//! `prepBasicWrite_inlock`/`prepBasicWrites`/`PREPLOGBUFFER` for the
//! write-intent → journal-section sequencing this component performs
//! (`db/dur.h`'s own per-thread intent-list class is not present in the
//! retrieved pack). Per DESIGN NOTES §9, the polymorphic `DurOp` class
//! hierarchy becomes the closed [DurOp] enum.

mod driver;
mod intent;
mod logbuffer;

pub use driver::GroupCommitDriver;
pub use intent::{GroupCommit, IntentSink, NullIntentSink, WriteIntent};
pub use logbuffer::{BasicWrite, DurOp, Entry, PreparedSection};
