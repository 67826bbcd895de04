//! The write-ahead journal: `j._N` files holding back-to-back sections,
//! and crash recovery (spec.md §4.6).
//!
//! Grounded on the teacher's `wral::journal`/`wral::wral` file-rotation and
//! the shared `src/hash/mod.rs` digest, generalized from the teacher's
//! single log-entry-per-write shape to spec.md's section-of-entries shape;
//! and on `examples/original_source/db/dur_recover.cpp` for the file
//! naming (`str::startsWith(fileName, "j._")`, `getJournalDir`), the LSN
//! sidecar (`journalReadLSN`, `_lastDataSyncedFromLastRun`), and the
//! per-section replay loop (`db/dur_journal.cpp`, the writer-side
//! counterpart, is not present in the retrieved pack).

mod recovery;
mod writer;

pub use recovery::{recover, RecoveryOutcome};
pub use writer::JournalWriter;

use crate::{err_at, Error, Result};

pub const FILE_MAGIC: [u8; 8] = *b"DOCSJRNL";
pub const FORMAT_VERSION: u16 = 1;
pub const FILE_HEADER_SIZE: usize = 8 + 2 + 8;

/// A journal file's fixed header: magic, format version, file id
/// (spec.md §6 "Journal file layout").
pub struct FileHeader {
    pub file_id: u64,
}

impl FileHeader {
    pub fn to_bytes(&self) -> [u8; FILE_HEADER_SIZE] {
        let mut buf = [0u8; FILE_HEADER_SIZE];
        buf[0..8].copy_from_slice(&FILE_MAGIC);
        buf[8..10].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
        buf[10..18].copy_from_slice(&self.file_id.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<FileHeader> {
        if buf.len() < FILE_HEADER_SIZE {
            return err_at!(JournalCorrupt, msg: "truncated journal file header");
        }
        if buf[0..8] != FILE_MAGIC {
            return err_at!(JournalCorrupt, msg: "bad journal file magic");
        }
        let mut fid = [0u8; 8];
        fid.copy_from_slice(&buf[10..18]);
        Ok(FileHeader { file_id: u64::from_le_bytes(fid) })
    }
}

/// `j._<N>` file naming (spec.md §4.6).
pub fn journal_file_name(n: u64) -> String {
    format!("j._{}", n)
}

/// Parse the `N` suffix out of a `j._N` file name.
pub fn parse_journal_file_name(name: &str) -> Option<u64> {
    name.strip_prefix("j._").and_then(|n| n.parse().ok())
}
