use super::*;

fn config() -> GeoHashConfig {
    GeoHashConfig::new(-180.0, 180.0, GeoHashConfig::DEFAULT_BITS)
}

#[test]
fn hash_unhash_round_trips_within_one_cell() {
    let config = config();
    for (x, y) in [(0.0, 0.0), (1.0, 1.0), (10.0, 10.0), (-45.5, 12.25), (179.0, -179.0)] {
        let hash = config.hash(x, y).unwrap();
        let (ux, uy) = hash.unhash_coords(&config);
        let cell = config.cell_size(config.bits);
        assert!((ux - x).abs() <= cell, "x {} vs {}", ux, x);
        assert!((uy - y).abs() <= cell, "y {} vs {}", uy, y);
    }
}

#[test]
fn out_of_range_coordinate_errors() {
    let config = config();
    assert!(config.hash(200.0, 0.0).is_err());
}

#[test]
fn has_prefix_matches_self_and_truncation() {
    let config = config();
    let hash = config.hash(12.3, 45.6).unwrap();
    assert!(hash.has_prefix(&hash));
    let shorter = hash.truncate(10);
    assert!(hash.has_prefix(&shorter));
    assert!(!shorter.has_prefix(&hash));
}

#[test]
fn up_drops_one_level_and_widens_prefix_match() {
    let config = config();
    let hash = config.hash(12.3, 45.6).unwrap();
    let up = hash.up().unwrap();
    assert_eq!(up.bits(), hash.bits() - 1);
    assert!(hash.has_prefix(&up));

    let other = config.hash(12.30001, 45.60001).unwrap();
    // Two very close points always share some non-trivial prefix at a
    // coarse enough zoom level.
    let mut p = hash;
    while !other.has_prefix(&p) {
        p = p.up().expect("points this close must share a prefix before bits reach 0");
    }
    assert!(p.bits() > 0);
}

#[test]
fn up_at_zero_bits_is_none() {
    let zero = GeoHash::from_raw(0, 0);
    assert!(zero.up().is_none());
}

#[test]
fn from_raw_masks_insignificant_bits() {
    let built = GeoHash::from_xy(u32::MAX, u32::MAX, 10);
    let rebuilt = GeoHash::from_raw(built.raw(), 10);
    assert_eq!(built, rebuilt);
}

#[test]
fn truncate_to_same_or_more_bits_is_identity() {
    let config = config();
    let hash = config.hash(1.0, 1.0).unwrap();
    assert_eq!(hash.truncate(hash.bits()), hash);
    assert_eq!(hash.truncate(hash.bits() + 5), hash);
}
