//! Common utility functions and macros shared across sub-systems.

use cbordata::{Cbor, FromCbor, IntoCbor};

use std::ops::{Bound, RangeBounds};

use crate::{err_at, Error, Result};

pub mod files;
pub mod spinlock;
pub mod thread;

pub use spinlock::Spinlock;
pub use thread::Thread;

/// Guard a decode against a truncated buffer before indexing into it.
#[macro_export]
macro_rules! check_remaining {
    ($buf:expr, $want:expr, $msg:expr) => {
        if $buf.len() < $want {
            err_at!(DecodeFail, msg: "insufficient input {}/{} ({})", $msg, $buf.len(), $want)
        } else {
            Ok(())
        }
    };
}

/// Helper function to serialize value `T` implementing IntoCbor, into a
/// byte-string. Used by the namespace catalog and chunk routing table to
/// persist their in-memory structures.
pub fn into_cbor_bytes<T>(val: T) -> Result<Vec<u8>>
where
    T: IntoCbor,
{
    let mut data: Vec<u8> = vec![];
    let n = err_at!(
        FailCbor,
        err_at!(FailCbor, val.into_cbor())?.encode(&mut data)
    )?;
    if n != data.len() {
        err_at!(Fatal, msg: "cbor encoding len mismatch {} {}", n, data.len())
    } else {
        Ok(data)
    }
}

/// Helper function to deserialize value `T` implementing FromCbor, from a
/// byte-string. Returns `(value, bytes-consumed)`.
pub fn from_cbor_bytes<T>(mut data: &[u8]) -> Result<(T, usize)>
where
    T: FromCbor,
{
    let (val, n) = err_at!(FailCbor, Cbor::decode(&mut data))?;
    Ok((err_at!(FailCbor, T::from_cbor(val))?, n))
}

/// Clone a generic range into owned `Bound<K>` endpoints.
pub fn to_start_end<G, K>(within: G) -> (Bound<K>, Bound<K>)
where
    K: Clone,
    G: RangeBounds<K>,
{
    let start = match within.start_bound() {
        Bound::Included(val) => Bound::Included(val.clone()),
        Bound::Excluded(val) => Bound::Excluded(val.clone()),
        Bound::Unbounded => Bound::Unbounded,
    };
    let end = match within.end_bound() {
        Bound::Included(val) => Bound::Included(val.clone()),
        Bound::Excluded(val) => Bound::Excluded(val.clone()),
        Bound::Unbounded => Bound::Unbounded,
    };
    (start, end)
}

/// Split `array` into `shards` contiguous, near-equal-sized slices. Used by
/// the background index builder to hand each worker thread a disjoint
/// sub-range of the collection snapshot to scan.
pub fn as_sharded_array<T>(array: &[T], mut shards: usize) -> Vec<&[T]> {
    let mut n = array.len();
    let mut begin = 0;
    let mut acc = vec![];
    while (begin < array.len()) && (shards > 0) {
        let m: usize = ((n as f64) / (shards as f64)).ceil() as usize;
        acc.push(&array[begin..(begin + m)]);
        begin += m;
        n -= m;
        shards -= 1;
    }

    (0..shards).for_each(|_| acc.push(&array[..0]));

    acc
}

/// Turn a sorted list of chunk high-keys into the half-open `[low, high)`
/// ranges they imply — the shape `ChunkManager::from_split_points` uses to
/// rebuild its ordered chunk list after a split (spec.md §4.7).
pub fn high_keys_to_ranges<K>(high_keys: Vec<Bound<K>>) -> Vec<(Bound<K>, Bound<K>)>
where
    K: Clone + Ord,
{
    let mut ranges = vec![];
    let mut low_key = Bound::<K>::Unbounded;
    for high_key in high_keys.into_iter() {
        let lk = high_key_to_low_key(&high_key);
        ranges.push((low_key, high_key));
        low_key = lk;
    }

    ranges
}

fn high_key_to_low_key<K>(hk: &Bound<K>) -> Bound<K>
where
    K: Clone,
{
    match hk {
        Bound::Unbounded => Bound::Unbounded,
        Bound::Excluded(hk) => Bound::Included(hk.clone()),
        _ => unreachable!(),
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
