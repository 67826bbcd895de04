//! [ExtentHeader]: the fixed-size structure prefixing every extent,
//! linking it into its collection's extent list (spec.md §3 "Extent").
//!
//! `db/pdfile.h` (the original's `Extent` class) is not present in the
//! retrieved pack; this header's shape is grounded on spec.md §3's own
//! "Extent" field list plus `examples/original_source/db/namespace.h`'s
//! `firstExtent`/`lastExtent`/`firstRecord`/`lastRecord` declarations,
//! which name the same prev/next-extent and record-chain-head fields this
//! struct carries.

use crate::store::RecordLocation;
use crate::{err_at, Error, Result};

pub const EXTENT_MAGIC: u32 = 0x4154_5845; // ASCII "EXTA"
pub const EXTENT_HEADER_SIZE: usize = 4 + 8 + 12 + 12 + 12 + 12;

/// Header fields prefixing every extent: total extent length (header +
/// its one record slot, per this crate's single-record-per-extent
/// simplification — see `src/store/mod.rs`), and the four links spec.md
/// names.
#[derive(Clone, Copy, Debug)]
pub struct ExtentHeader {
    pub length: u64,
    pub prev: RecordLocation,
    pub next: RecordLocation,
    pub first_record: RecordLocation,
    pub last_record: RecordLocation,
}

impl ExtentHeader {
    pub fn to_bytes(&self) -> [u8; EXTENT_HEADER_SIZE] {
        let mut buf = [0u8; EXTENT_HEADER_SIZE];
        buf[0..4].copy_from_slice(&EXTENT_MAGIC.to_le_bytes());
        buf[4..12].copy_from_slice(&self.length.to_le_bytes());
        buf[12..24].copy_from_slice(&self.prev.to_bytes());
        buf[24..36].copy_from_slice(&self.next.to_bytes());
        buf[36..48].copy_from_slice(&self.first_record.to_bytes());
        buf[48..60].copy_from_slice(&self.last_record.to_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<ExtentHeader> {
        if buf.len() < EXTENT_HEADER_SIZE {
            return err_at!(DecodeFail, msg: "short extent header {}", buf.len());
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&buf[0..4]);
        if u32::from_le_bytes(magic) != EXTENT_MAGIC {
            return err_at!(Fatal, msg: "bad extent magic {:x}", u32::from_le_bytes(magic));
        }
        let mut len = [0u8; 8];
        len.copy_from_slice(&buf[4..12]);
        Ok(ExtentHeader {
            length: u64::from_le_bytes(len),
            prev: RecordLocation::from_bytes(&buf[12..24])?,
            next: RecordLocation::from_bytes(&buf[24..36])?,
            first_record: RecordLocation::from_bytes(&buf[36..48])?,
            last_record: RecordLocation::from_bytes(&buf[48..60])?,
        })
    }
}
