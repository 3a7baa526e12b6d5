//! Tests for the distance oracle

use tracesegment::synthetic::TraceScenario;
use tracesegment::{index_at_distance, last_valid_start};

#[test]
fn test_index_at_distance_accumulates_lane_positions() {
    // 1 m per tick along the road chain.
    let runs = TraceScenario::straight(50).runs().unwrap();
    let ticks = &runs[0].ticks;

    let (index, covered) = index_at_distance(ticks, 0, 10.0).unwrap();
    assert_eq!(index, 10);
    assert!((covered - 10.0).abs() < 1e-9);

    let (index, covered) = index_at_distance(ticks, 20, 5.0).unwrap();
    assert_eq!(index, 25);
    assert!((covered - 5.0).abs() < 1e-9);
}

#[test]
fn test_index_at_distance_across_road_boundary() {
    // Roads are 100 m; a budget spanning the boundary mixes lane-position
    // steps with the euclidean fallback and still lands on the right tick.
    let runs = TraceScenario::straight(150).runs().unwrap();
    let ticks = &runs[0].ticks;

    let (index, covered) = index_at_distance(ticks, 95, 10.0).unwrap();
    assert_eq!(index, 105);
    assert!((covered - 10.0).abs() < 1e-9);
}

#[test]
fn test_index_at_distance_clamps_at_run_end() {
    let runs = TraceScenario::straight(20).runs().unwrap();
    let ticks = &runs[0].ticks;

    let (index, covered) = index_at_distance(ticks, 15, 1000.0).unwrap();
    assert_eq!(index, 19);
    assert!((covered - 4.0).abs() < 1e-9);
}

#[test]
fn test_last_valid_start() {
    let runs = TraceScenario::straight(50).runs().unwrap();
    let ticks = &runs[0].ticks;

    // 1 m per tick: ten metres of remaining path exist from index 39.
    assert_eq!(last_valid_start(ticks, 10.0).unwrap(), 39);
    // A budget longer than the whole run is impossible.
    assert_eq!(last_valid_start(ticks, 1000.0).unwrap(), 0);
}

#[test]
fn test_last_valid_start_degenerate_runs() {
    let runs = TraceScenario::straight(1).runs().unwrap();
    assert_eq!(last_valid_start(&runs[0].ticks, 5.0).unwrap(), 0);
}
