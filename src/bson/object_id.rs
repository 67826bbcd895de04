//! A 12-byte, roughly-monotonic document identifier, shaped like the
//! original `mongo::OID`: a 4-byte seconds-since-epoch timestamp, a 5-byte
//! per-process random value, and a 3-byte per-process counter.

use cbordata::Cborize;

use std::{fmt, sync::atomic::{AtomicU32, Ordering}};

use crate::{err_at, Error, Result};

pub const OBJECT_ID_VER: u32 = 0x0001_0001;

lazy_static::lazy_static! {
    static ref PROCESS_UNIQUE: [u8; 5] = {
        let mut buf = [0u8; 5];
        rand::Rng::fill(&mut rand::thread_rng(), &mut buf);
        buf
    };
}

static COUNTER: AtomicU32 = AtomicU32::new(0);

/// 12-byte object id: `[4-byte secs][5-byte process-unique][3-byte counter]`.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Cborize)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    pub const ID: u32 = OBJECT_ID_VER;

    /// Generate a fresh id stamped with the current wall-clock second.
    pub fn new() -> ObjectId {
        let secs = chrono::Utc::now().timestamp() as u32;
        Self::new_at(secs)
    }

    /// Generate a fresh id stamped with an explicit second — used by tests
    /// that need deterministic ids.
    pub fn new_at(secs: u32) -> ObjectId {
        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&*PROCESS_UNIQUE);

        let n = COUNTER.fetch_add(1, Ordering::Relaxed) & 0x00FF_FFFF;
        bytes[9..12].copy_from_slice(&n.to_be_bytes()[1..4]);

        ObjectId(bytes)
    }

    pub fn from_bytes(bytes: [u8; 12]) -> ObjectId {
        ObjectId(bytes)
    }

    pub fn to_bytes(&self) -> [u8; 12] {
        self.0
    }

    /// Parse the canonical 24-character lowercase hex representation.
    pub fn parse_hex(s: &str) -> Result<ObjectId> {
        if s.len() != 24 {
            return err_at!(BadValue, msg: "object id must be 24 hex chars, got {}", s.len());
        }
        let mut bytes = [0u8; 12];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = err_at!(BadValue, u8::from_str_radix(&s[i * 2..i * 2 + 2], 16))?;
        }
        Ok(ObjectId(bytes))
    }

    pub fn seconds(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        ObjectId::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for byte in self.0.iter() {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ObjectId({})", self)
    }
}

#[cfg(test)]
#[path = "object_id_test.rs"]
mod object_id_test;
