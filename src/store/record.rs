//! [RecordLocation] (spec.md "RecordLocation": a `(file-number,
//! byte-offset)` pair) and the fixed-size [RecordHeader] prefixing every
//! record and deleted-record node.
//!
//! `db/diskloc.h` and `db/pdfile.h` (the original's `DiskLoc` and
//! `Record`/`DeletedRecord` definitions) are not present in the retrieved
//! pack; grounded instead on `examples/original_source/db/namespace.h`'s
//! `DiskLoc`-typed `firstExtent`/`capFirstNewRecord`/`deletedList` fields
//! and `addDeletedRec(DeletedRecord *d, DiskLoc dloc)` declaration, which
//! name the same (file, offset) location pair and deleted-record node this
//! module implements.

use cbordata::Cborize;

use crate::{err_at, Error, Result};

pub const RECORD_HEADER_SIZE: usize = 4 + 12 + 12;
pub const RECORD_LOCATION_VER: u32 = 0x0001_0001;

/// A `(file-number, byte-offset)` pair identifying a document's, extent's,
/// or deleted-record's physical position. `NULL` (`{-1, -1}`) terminates a
/// record chain or free-list bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Cborize)]
pub struct RecordLocation {
    pub file_no: i32,
    pub offset: i64,
}

impl RecordLocation {
    pub const ID: u32 = RECORD_LOCATION_VER;
    pub const NULL: RecordLocation = RecordLocation { file_no: -1, offset: -1 };
    /// Sentinel written into a [RecordHeader]'s `prev` field to mark a slot
    /// logically deleted. Distinct from `NULL` (`file_no: -1`) so that a
    /// live record's legitimate `NULL` `prev`/`next` chain terminators are
    /// never confused with "this slot is on a free list".
    pub const DELETED: RecordLocation = RecordLocation { file_no: -2, offset: -1 };

    pub fn is_null(&self) -> bool {
        self.file_no == -1
    }

    pub fn to_bytes(&self) -> [u8; 12] {
        let mut buf = [0u8; 12];
        buf[0..4].copy_from_slice(&self.file_no.to_le_bytes());
        buf[4..12].copy_from_slice(&self.offset.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<RecordLocation> {
        if buf.len() < 12 {
            return err_at!(DecodeFail, msg: "short record-location buffer {}", buf.len());
        }
        let mut fb = [0u8; 4];
        fb.copy_from_slice(&buf[0..4]);
        let mut ob = [0u8; 8];
        ob.copy_from_slice(&buf[4..12]);
        Ok(RecordLocation { file_no: i32::from_le_bytes(fb), offset: i64::from_le_bytes(ob) })
    }
}

/// Header shape shared by live records and deleted-record free-list nodes
/// (spec.md §3 "DeletedRecord: same header shape as Record"). `prev`/`next`
/// link the per-extent record chain for a live record, or the singly-used
/// `next` links the free-list bucket for a deleted one; `prev` is unused
/// (left `NULL`) on a deleted node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordHeader {
    /// Total slot length including this header and any padding.
    pub length: u64,
    pub prev: RecordLocation,
    pub next: RecordLocation,
}

impl RecordHeader {
    pub fn to_bytes(&self) -> [u8; RECORD_HEADER_SIZE] {
        let mut buf = [0u8; RECORD_HEADER_SIZE];
        buf[0..4].copy_from_slice(&(self.length as u32).to_le_bytes());
        buf[4..16].copy_from_slice(&self.prev.to_bytes());
        buf[16..28].copy_from_slice(&self.next.to_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<RecordHeader> {
        if buf.len() < RECORD_HEADER_SIZE {
            return err_at!(DecodeFail, msg: "short record header {}", buf.len());
        }
        let mut lb = [0u8; 4];
        lb.copy_from_slice(&buf[0..4]);
        Ok(RecordHeader {
            length: u32::from_le_bytes(lb) as u64,
            prev: RecordLocation::from_bytes(&buf[4..16])?,
            next: RecordLocation::from_bytes(&buf[16..28])?,
        })
    }

    /// Whether this slot has been relinked into a free-list bucket
    /// (`prev == RecordLocation::DELETED`) rather than holding a live
    /// record. `next` still carries the bucket's singly-linked chain in
    /// that case.
    pub fn is_deleted(&self) -> bool {
        self.prev == RecordLocation::DELETED
    }
}
