//! Tests for the road-network index

use tracesegment::synthetic::TraceScenario;
use tracesegment::SegmentationError;

fn junction_scenario() -> TraceScenario {
    let mut scenario = TraceScenario::straight(10);
    scenario.road_count = 3;
    scenario.junction_roads = vec![1];
    scenario.junction_lane_count = 3;
    scenario
}

#[test]
fn test_find_lane() {
    let network = junction_scenario().network();
    let lane = network.find_lane(0, 1).unwrap();
    assert_eq!(network.lane(lane).lane_id, 1);
    assert_eq!(network.road_of_lane(lane).road_id, 0);
}

#[test]
fn test_find_lane_unknown() {
    let network = junction_scenario().network();
    assert!(matches!(
        network.find_lane(0, 9),
        Err(SegmentationError::UnknownLane {
            road_id: 0,
            lane_id: 9
        })
    ));
    assert!(matches!(
        network.find_lane(77, 1),
        Err(SegmentationError::UnknownLane { .. })
    ));
}

#[test]
fn test_is_junction() {
    let network = junction_scenario().network();
    assert!(!network.is_junction(0).unwrap());
    assert!(network.is_junction(1).unwrap());
    assert!(matches!(
        network.is_junction(99),
        Err(SegmentationError::UnknownRoad { road_id: 99 })
    ));
}

#[test]
fn test_successor_resolution() {
    let network = junction_scenario().network();
    let first = network.find_lane(0, 1).unwrap();
    let successors = network.successors(first);
    assert_eq!(successors.len(), 1);
    assert_eq!(network.lane_key(successors[0]).road_id, 1);
    assert_eq!(network.lane_key(successors[0]).lane_id, 1);

    // Dangling internal junction lanes connect nothing.
    let internal = network.find_lane(1, 2).unwrap();
    assert!(network.successors(internal).is_empty());
    assert!(network.predecessors(internal).is_empty());
}

#[test]
fn test_block_identity() {
    let network = junction_scenario().network();
    let first = network.find_lane(0, 1).unwrap();
    let second = network.find_lane(1, 1).unwrap();
    assert_eq!(network.block_id(first.road_ref()), "block_0");
    assert!(!first.road_ref().same_block(second.road_ref()));
}
