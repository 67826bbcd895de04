//! The prepared log buffer: serializes a group-commit tick's ops and
//! write-intents into one aligned, checksummed journal section (spec.md
//! §4.5 step 3).
//!
//! Wire shape (spec.md §6 "Journal file layout"): a 32-bit length, a
//! 64-bit sequence number, a 64-bit file id, then entries, then a footer
//! carrying a 128-bit digest. Every entry's first 32 bits is either an
//! opcode (`>= 0x8000_0000`) or a basic-write length. Per DESIGN NOTES §9
//! ("Polymorphic `DurOp` hierarchy → tagged variant with a fixed set of
//! ops"), [DurOp] is a closed enum instead of the original's class
//! hierarchy.

use crate::{err_at, hash, Error, Result};

const OPCODE_BIT: u32 = 0x8000_0000;
const OP_FOOTER: u32 = OPCODE_BIT | 1;
const OP_FILE_CREATED: u32 = OPCODE_BIT | 2;
const OP_DROP_DB: u32 = OPCODE_BIT | 3;
const OP_DB_CONTEXT: u32 = OPCODE_BIT | 4;

pub const SECTION_PREFIX_SIZE: usize = 4 + 8 + 8;
pub const FOOTER_DIGEST_SIZE: usize = 16;

/// A non-basic operation a section may carry (spec.md §4.5 step 3 "For
/// each non-basic op..."). The original's self-registering `DurOp`
/// subclasses (`FileCreatedOp`, `DropDbOp`) become this closed set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DurOp {
    /// A data file was created at `size` bytes (file-creation is itself a
    /// journaled op, spec.md §3 "Lifecycle").
    FileCreated { db: String, file_no: i32, size: u64 },
    /// A database's files were removed.
    DropDb { db: String },
}

/// A basic write entry: raw bytes destined for `(db, file_no, offset)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BasicWrite {
    pub db: String,
    pub file_no: i32,
    pub offset: u64,
    pub flags: u32,
    pub bytes: Vec<u8>,
}

/// A parsed section entry, as [PreparedSection::decode] hands them back
/// to the recovery replayer in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entry {
    Op(DurOp),
    DbContext(String),
    Write(BasicWrite),
}

/// One journal section: header fields plus the ordered entry list,
/// footer digest computed over everything preceding it.
#[derive(Clone, Debug)]
pub struct PreparedSection {
    pub seq: u64,
    pub journal_file_id: u64,
    pub entries: Vec<Entry>,
}

impl PreparedSection {
    pub fn new(seq: u64, journal_file_id: u64) -> PreparedSection {
        PreparedSection { seq, journal_file_id, entries: vec![] }
    }

    pub fn push_op(&mut self, op: DurOp) {
        self.entries.push(Entry::Op(op));
    }

    /// Append a basic-write, prefixing a db-context entry first if the
    /// active db differs from the previous write's (spec.md §4.5 step 3
    /// "A db-context record whenever the active relative path changes").
    pub fn push_write(&mut self, write: BasicWrite) {
        let needs_context = !matches!(
            self.entries.iter().rev().find_map(|e| match e {
                Entry::DbContext(db) => Some(db.clone()),
                Entry::Write(w) => Some(w.db.clone()),
                _ => None,
            }),
            Some(ref last_db) if *last_db == write.db
        );
        if needs_context {
            self.entries.push(Entry::DbContext(write.db.clone()));
        }
        self.entries.push(Entry::Write(write));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize header + entries + footer digest. Per SPEC_FULL.md's
    /// Open Question on empty sections (spec.md §9), an empty section
    /// (no entries) is rejected on the write path rather than ever
    /// emitted — recovery treats one as EOF instead, the stricter of the
    /// two behaviors the original mixes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.entries.is_empty() {
            return err_at!(Fatal, msg: "refusing to encode an empty journal section");
        }

        let mut body = vec![];
        for entry in &self.entries {
            encode_entry(entry, &mut body)?;
        }

        let mut buf = vec![];
        buf.extend_from_slice(&0u32.to_le_bytes()); // length placeholder
        buf.extend_from_slice(&self.seq.to_le_bytes());
        buf.extend_from_slice(&self.journal_file_id.to_le_bytes());
        buf.extend_from_slice(&body);

        let digest = hash::digest128(&buf);
        buf.extend_from_slice(&OP_FOOTER.to_le_bytes());
        buf.extend_from_slice(&digest);

        let total = buf.len() as u32;
        buf[0..4].copy_from_slice(&total.to_le_bytes());
        Ok(buf)
    }

    /// Parse one section starting at `buf[0]`. Returns the section along
    /// with the number of bytes consumed. Verifies the footer digest;
    /// callers treat a mismatch as the "crash mid-write" case (spec.md
    /// §4.6 recovery step 2).
    pub fn decode(buf: &[u8]) -> Result<(PreparedSection, usize)> {
        if buf.len() < SECTION_PREFIX_SIZE {
            return err_at!(JournalCorrupt, msg: "truncated section prefix");
        }
        let mut total_b = [0u8; 4];
        total_b.copy_from_slice(&buf[0..4]);
        let total = u32::from_le_bytes(total_b) as usize;
        if total < SECTION_PREFIX_SIZE + 4 + FOOTER_DIGEST_SIZE || total > buf.len() {
            return err_at!(JournalCorrupt, msg: "section length {} out of range", total);
        }

        let mut seq_b = [0u8; 8];
        seq_b.copy_from_slice(&buf[4..12]);
        let seq = u64::from_le_bytes(seq_b);
        let mut fid_b = [0u8; 8];
        fid_b.copy_from_slice(&buf[12..20]);
        let journal_file_id = u64::from_le_bytes(fid_b);

        let footer_start = total - 4 - FOOTER_DIGEST_SIZE;
        let expected_digest = hash::digest128(&buf[0..footer_start]);
        let footer_opcode = read_u32(&buf[footer_start..])?;
        if footer_opcode != OP_FOOTER {
            return err_at!(JournalCorrupt, msg: "missing footer opcode at section end");
        }
        let actual_digest = &buf[footer_start + 4..total];
        if actual_digest != expected_digest {
            return err_at!(JournalCorrupt, msg: "footer digest mismatch (seq {})", seq);
        }

        let mut entries = vec![];
        let mut cursor = SECTION_PREFIX_SIZE;
        while cursor < footer_start {
            let (entry, consumed) = decode_entry(&buf[cursor..footer_start])?;
            entries.push(entry);
            cursor += consumed;
        }

        Ok((PreparedSection { seq, journal_file_id, entries }, total))
    }
}

fn encode_entry(entry: &Entry, out: &mut Vec<u8>) -> Result<()> {
    match entry {
        Entry::Op(DurOp::FileCreated { db, file_no, size }) => {
            out.extend_from_slice(&OP_FILE_CREATED.to_le_bytes());
            encode_str(db, out);
            out.extend_from_slice(&file_no.to_le_bytes());
            out.extend_from_slice(&size.to_le_bytes());
        }
        Entry::Op(DurOp::DropDb { db }) => {
            out.extend_from_slice(&OP_DROP_DB.to_le_bytes());
            encode_str(db, out);
        }
        Entry::DbContext(db) => {
            out.extend_from_slice(&OP_DB_CONTEXT.to_le_bytes());
            encode_str(db, out);
        }
        Entry::Write(w) => {
            if w.bytes.len() as u64 >= OPCODE_BIT as u64 {
                return err_at!(Fatal, msg: "basic-write too large: {}", w.bytes.len());
            }
            out.extend_from_slice(&(w.bytes.len() as u32).to_le_bytes());
            out.extend_from_slice(&w.file_no.to_le_bytes());
            out.extend_from_slice(&w.offset.to_le_bytes());
            out.extend_from_slice(&w.flags.to_le_bytes());
            out.extend_from_slice(&w.bytes);
        }
    }
    Ok(())
}

fn decode_entry(buf: &[u8]) -> Result<(Entry, usize)> {
    let opcode_or_len = read_u32(buf)?;
    if opcode_or_len < OPCODE_BIT {
        let len = opcode_or_len as usize;
        check_remaining!(buf, 4 + 4 + 8 + 4 + len, "basic-write entry")?;
        let file_no = read_i32(&buf[4..])?;
        let offset = read_u64(&buf[8..])?;
        let flags = read_u32(&buf[16..])?;
        let bytes = buf[20..20 + len].to_vec();
        return Ok((
            Entry::Write(BasicWrite { db: String::new(), file_no, offset, flags, bytes }),
            20 + len,
        ));
    }

    match opcode_or_len {
        OP_FILE_CREATED => {
            let (db, n) = decode_str(&buf[4..])?;
            let mut off = 4 + n;
            let file_no = read_i32(&buf[off..])?;
            off += 4;
            let size = read_u64(&buf[off..])?;
            off += 8;
            Ok((Entry::Op(DurOp::FileCreated { db, file_no, size }), off))
        }
        OP_DROP_DB => {
            let (db, n) = decode_str(&buf[4..])?;
            Ok((Entry::Op(DurOp::DropDb { db }), 4 + n))
        }
        OP_DB_CONTEXT => {
            let (db, n) = decode_str(&buf[4..])?;
            Ok((Entry::DbContext(db), 4 + n))
        }
        other => err_at!(JournalCorrupt, msg: "unknown section opcode {:#x}", other),
    }
}

fn encode_str(s: &str, out: &mut Vec<u8>) {
    out.extend_from_slice(&(s.len() as u16).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

fn decode_str(buf: &[u8]) -> Result<(String, usize)> {
    check_remaining!(buf, 2, "string length")?;
    let len = u16::from_le_bytes([buf[0], buf[1]]) as usize;
    check_remaining!(buf, 2 + len, "string bytes")?;
    let s = err_at!(BadValue, String::from_utf8(buf[2..2 + len].to_vec()))?;
    Ok((s, 2 + len))
}

fn read_u32(buf: &[u8]) -> Result<u32> {
    check_remaining!(buf, 4, "u32")?;
    Ok(u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]))
}

fn read_i32(buf: &[u8]) -> Result<i32> {
    check_remaining!(buf, 4, "i32")?;
    Ok(i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]))
}

fn read_u64(buf: &[u8]) -> Result<u64> {
    check_remaining!(buf, 8, "u64")?;
    let mut b = [0u8; 8];
    b.copy_from_slice(&buf[0..8]);
    Ok(u64::from_le_bytes(b))
}

#[cfg(test)]
mod logbuffer_test {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let mut section = PreparedSection::new(7, 1);
        section.push_write(BasicWrite {
            db: "test".into(),
            file_no: 0,
            offset: 16,
            flags: 0,
            bytes: vec![1, 2, 3, 4],
        });
        section.push_op(DurOp::FileCreated { db: "test".into(), file_no: 1, size: 4096 });

        let bytes = section.encode().unwrap();
        let (decoded, consumed) = PreparedSection::decode(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded.seq, 7);
        assert_eq!(decoded.entries.len(), 3); // db-context + write + op
    }

    #[test]
    fn corrupt_footer_is_rejected() {
        let mut section = PreparedSection::new(1, 1);
        section.push_write(BasicWrite { db: "test".into(), file_no: 0, offset: 0, flags: 0, bytes: vec![9] });
        let mut bytes = section.encode().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        let err = PreparedSection::decode(&bytes).unwrap_err();
        assert!(matches!(err, Error::JournalCorrupt(_)));
    }

    #[test]
    fn empty_section_is_rejected_on_encode() {
        let section = PreparedSection::new(1, 1);
        assert!(section.encode().is_err());
    }
}
