//! The 2D geohash index backing `$near` / `$within circle` / `$within box`
//! (spec.md §4.4).
//!
//! Grounded on `examples/original_source/db/index_geo2d.cpp`'s `GeoHash`
//! (bit-interleave, `hasPrefix`, `up`/zoom-out) and `Geo2dType` (coordinate
//! scaling, `$near`/`$within` search loop), layered over [crate::btree]'s
//! cursor the way the original layers `Geo2dType` over the generic
//! `BtreeBasedAccessMethod`.

mod hash;
mod search;

pub use hash::{GeoHash, GeoHashConfig};
pub use search::{near, within_box, within_circle, GeoEntry, NearHit};
