//! The document value model: a small BSON-like type system with a
//! canonical total ordering, used uniformly by the record store, the B-tree
//! index (as index keys) and the matcher (as predicate operands).

use cbordata::Cborize;

use std::cmp::Ordering;

use crate::bson::{document::Document, object_id::ObjectId};

pub const VALUE_VER: u32 = 0x0001_0001;

/// One field's value inside a [Document], or an element of an [Value::Array].
///
/// Numeric variants are kept distinct (`Int32`/`Int64`/`Double`) rather than
/// collapsed into one, mirroring the wire-level distinction the matcher and
/// index need to preserve round-trip fidelity; [Value::cmp] still compares
/// across numeric variants by promoting to the widest representation, so
/// `Int32(4)` and `Double(4.0)` sort and match as equal.
#[derive(Clone, Debug, Cborize)]
pub enum Value {
    MinKey,
    Null,
    Double(f64),
    String(String),
    Document(Document),
    Array(Vec<Value>),
    Binary { subtype: u8, data: Vec<u8> },
    ObjectId(ObjectId),
    Bool(bool),
    UtcDateTime(i64), // millis since epoch
    Timestamp { seconds: u32, ordinal: u32 },
    Regex { pattern: String, options: String },
    Int32(i32),
    Int64(i64),
    Decimal128([u8; 16]),
    MaxKey,
}

impl Value {
    pub const ID: u32 = VALUE_VER;

    /// BSON-style type rank used as the primary key of [Value::cmp]. Numeric
    /// variants all share one rank so they compare across sub-types.
    fn type_rank(&self) -> u8 {
        use Value::*;
        match self {
            MinKey => 0,
            Null => 1,
            Double(_) | Int32(_) | Int64(_) | Decimal128(_) => 2,
            String(_) => 3,
            Document(_) => 4,
            Array(_) => 5,
            Binary { .. } => 6,
            ObjectId(_) => 7,
            Bool(_) => 8,
            UtcDateTime(_) => 9,
            Timestamp { .. } => 10,
            Regex { .. } => 11,
            MaxKey => 12,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Double(_) | Value::Int32(_) | Value::Int64(_) | Value::Decimal128(_))
    }

    /// Best-effort promotion to `f64`, used to compare across numeric
    /// sub-types and by the geo index's coordinate extraction.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Int32(v) => Some(*v as f64),
            Value::Int64(v) => Some(*v as f64),
            Value::Decimal128(bytes) => {
                // Low 8 bytes carry a sign-extended integer coefficient for
                // the ranges this crate's geo/matcher code actually needs;
                // full IEEE 754-2008 decimal128 parsing is out of scope.
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&bytes[0..8]);
                Some(i64::from_le_bytes(buf) as f64)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    /// Canonical BSON-style comparison: compare by [Value::type_rank] first,
    /// then by the type's natural ordering. Numeric variants compare by
    /// value across sub-types (`Int32(4) == Double(4.0)`).
    fn cmp(&self, other: &Self) -> Ordering {
        use Value::*;

        if self.is_numeric() && other.is_numeric() {
            return match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            };
        }

        match self.type_rank().cmp(&other.type_rank()) {
            Ordering::Equal => (),
            ord => return ord,
        }

        match (self, other) {
            (MinKey, MinKey) | (Null, Null) | (MaxKey, MaxKey) => Ordering::Equal,
            (String(a), String(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Document(a), Document(b)) => a.cmp(b),
            (Array(a), Array(b)) => a.cmp(b),
            (Binary { subtype: st1, data: d1 }, Binary { subtype: st2, data: d2 }) => {
                (d1.len(), st1, d1).cmp(&(d2.len(), st2, d2))
            }
            (ObjectId(a), ObjectId(b)) => a.cmp(b),
            (Bool(a), Bool(b)) => a.cmp(b),
            (UtcDateTime(a), UtcDateTime(b)) => a.cmp(b),
            (Timestamp { seconds: s1, ordinal: o1 }, Timestamp { seconds: s2, ordinal: o2 }) => {
                (s1, o1).cmp(&(s2, o2))
            }
            (Regex { pattern: p1, options: o1 }, Regex { pattern: p2, options: o2 }) => {
                (p1, o1).cmp(&(p2, o2))
            }
            _ => unreachable!("type_rank partitions variants"),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Value {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Value {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Value {
        Value::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::String(v.to_string())
    }
}

impl From<ObjectId> for Value {
    fn from(v: ObjectId) -> Value {
        Value::ObjectId(v)
    }
}

#[cfg(test)]
#[path = "value_test.rs"]
mod value_test;
