use super::*;

fn config() -> GeoHashConfig {
    GeoHashConfig::new(-200.0, 200.0, GeoHashConfig::DEFAULT_BITS)
}

fn entries(config: &GeoHashConfig, points: &[(f64, f64, &'static str)]) -> Vec<GeoEntry<&'static str>> {
    points
        .iter()
        .map(|(x, y, name)| GeoEntry { hash: config.hash(*x, *y).unwrap(), x: *x, y: *y, item: *name })
        .collect()
}

#[test]
fn near_returns_closest_first() {
    let config = config();
    let points = entries(&config, &[(0.0, 0.0, "origin"), (1.0, 1.0, "near"), (10.0, 10.0, "far")]);

    let hits = near(&points, &config, (0.0, 0.0), 3, None).unwrap();
    let order: Vec<&str> = hits.iter().map(|h| h.item).collect();
    assert_eq!(order, vec!["origin", "near", "far"]);
}

#[test]
fn near_truncates_to_n() {
    let config = config();
    let points = entries(&config, &[(0.0, 0.0, "a"), (1.0, 1.0, "b"), (10.0, 10.0, "c")]);
    let hits = near(&points, &config, (0.0, 0.0), 1, None).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].item, "a");
}

#[test]
fn near_respects_max_distance() {
    let config = config();
    let points = entries(&config, &[(0.0, 0.0, "a"), (1.0, 1.0, "b"), (10.0, 10.0, "c")]);
    let hits = near(&points, &config, (0.0, 0.0), 10, Some(2.0)).unwrap();
    let order: Vec<&str> = hits.iter().map(|h| h.item).collect();
    assert_eq!(order, vec!["a", "b"]);
}

#[test]
fn near_with_zero_n_returns_empty() {
    let config = config();
    let points = entries(&config, &[(0.0, 0.0, "a")]);
    assert!(near(&points, &config, (0.0, 0.0), 0, None).unwrap().is_empty());
}

#[test]
fn within_box_is_inclusive_of_corners() {
    let config = config();
    let points = entries(&config, &[(0.0, 0.0, "a"), (5.0, 5.0, "b"), (11.0, 11.0, "c")]);
    let mut hits = within_box(&points, (0.0, 0.0), (10.0, 10.0));
    hits.sort();
    assert_eq!(hits, vec!["a", "b"]);
}

#[test]
fn within_circle_accepts_boundary_within_epsilon() {
    let config = config();
    let points = entries(&config, &[(0.0, 0.0, "center"), (3.0, 4.0, "edge"), (100.0, 100.0, "far")]);
    let hits = within_circle(&points, &config, (0.0, 0.0), 5.0);
    let mut hits = hits;
    hits.sort();
    assert_eq!(hits, vec!["center", "edge"]);
}
