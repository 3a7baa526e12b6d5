//! Tests for the junction cleaner

use tracesegment::synthetic::TraceScenario;
use tracesegment::{
    clean_junction_labels, Block, Lane, LaneKey, LaneType, RawActor, RawActorPosition, RawTick,
    Road, RoadNetwork, Vec3,
};

/// One ego vehicle, one tick per label.
fn ticks_for(labels: &[(i64, i32)]) -> Vec<RawTick> {
    labels
        .iter()
        .enumerate()
        .map(|(i, (road_id, lane_id))| RawTick {
            current_tick: i as f64 * 0.1,
            actor_positions: vec![RawActorPosition {
                actor: RawActor::Vehicle {
                    id: 1,
                    ego_vehicle: true,
                },
                road_id: *road_id,
                lane_id: *lane_id,
                position_on_lane: i as f64,
                location: Vec3::new(i as f64, 0.0, 0.0),
            }],
        })
        .collect()
}

fn labels_of(ticks: &[RawTick]) -> Vec<(i64, i32)> {
    ticks
        .iter()
        .map(|t| {
            let p = t.vehicle_position(1).unwrap();
            (p.road_id, p.lane_id)
        })
        .collect()
}

/// Roads 0 - 1 - 2 with road 1 a junction carrying internal lanes 1, 2, 3;
/// only internal lane 1 connects road 0 to road 2.
fn junction_network() -> std::sync::Arc<RoadNetwork> {
    let mut scenario = TraceScenario::straight(10);
    scenario.road_count = 3;
    scenario.junction_roads = vec![1];
    scenario.junction_lane_count = 3;
    scenario.network()
}

#[test]
fn test_outlier_between_identical_multilanes() {
    // The vehicle never leaves road 0 but five ticks get junction labels
    // A,B,A,A,A; with identical surrounding lanes the traversal is an
    // outlier and collapses onto the surrounding lane.
    let mut labels = vec![(0, 1); 10];
    labels.extend([(1, 1), (1, 2), (1, 1), (1, 1), (1, 1)]);
    labels.extend(vec![(0, 1); 5]);
    let mut ticks = ticks_for(&labels);

    clean_junction_labels(&mut ticks, &junction_network()).unwrap();

    let cleaned = labels_of(&ticks);
    for i in 10..15 {
        assert_eq!(cleaned[i], (0, 1), "tick {} not rewritten", i);
    }
    assert_eq!(&cleaned[..10], &vec![(0, 1); 10][..]);
}

#[test]
fn test_connecting_lane_between_different_multilanes() {
    let mut labels = vec![(0, 1); 5];
    labels.extend([(1, 1), (1, 2), (1, 1), (1, 2), (1, 3)]);
    labels.extend(vec![(2, 1); 5]);
    let mut ticks = ticks_for(&labels);

    clean_junction_labels(&mut ticks, &junction_network()).unwrap();

    let cleaned = labels_of(&ticks);
    for i in 5..10 {
        assert_eq!(cleaned[i], (1, 1), "tick {} not rewritten", i);
    }
}

#[test]
fn test_majority_vote_at_run_start() {
    let mut labels = vec![(1, 2), (1, 1), (1, 2), (1, 2), (1, 3)];
    labels.extend(vec![(2, 1); 5]);
    let mut ticks = ticks_for(&labels);

    clean_junction_labels(&mut ticks, &junction_network()).unwrap();

    let cleaned = labels_of(&ticks);
    for i in 0..5 {
        assert_eq!(cleaned[i], (1, 2), "tick {} not rewritten", i);
    }
}

#[test]
fn test_majority_vote_tie_prefers_first_seen() {
    let mut labels = vec![(1, 1), (1, 2), (1, 2), (1, 1)];
    labels.extend(vec![(2, 1); 5]);
    let mut ticks = ticks_for(&labels);

    clean_junction_labels(&mut ticks, &junction_network()).unwrap();

    let cleaned = labels_of(&ticks);
    for i in 0..4 {
        assert_eq!(cleaned[i], (1, 1));
    }
}

#[test]
fn test_trailing_traversal_flushed() {
    let mut labels = vec![(0, 1); 5];
    labels.extend([(1, 1), (1, 2), (1, 2)]);
    let mut ticks = ticks_for(&labels);

    clean_junction_labels(&mut ticks, &junction_network()).unwrap();

    let cleaned = labels_of(&ticks);
    for i in 5..8 {
        assert_eq!(cleaned[i], (1, 2), "tick {} not rewritten", i);
    }
}

#[test]
fn test_consistent_traversal_untouched() {
    let mut labels = vec![(0, 1); 5];
    labels.extend(vec![(1, 2); 4]);
    labels.extend(vec![(2, 1); 5]);
    let mut ticks = ticks_for(&labels);
    let before = labels_of(&ticks);

    clean_junction_labels(&mut ticks, &junction_network()).unwrap();

    assert_eq!(labels_of(&ticks), before);
}

#[test]
fn test_unconnected_junction_left_alone() {
    // A map whose junction lanes connect nothing: no repair is plausible,
    // labels stay as recorded.
    let lane = |lane_id| Lane {
        lane_id,
        lane_type: LaneType::Driving,
        speed_limit: None,
        successor_lanes: Vec::new(),
        predecessor_lanes: Vec::new(),
    };
    let blocks = vec![
        Block {
            id: "a".into(),
            roads: vec![Road {
                road_id: 0,
                is_junction: false,
                lanes: vec![lane(1)],
            }],
        },
        Block {
            id: "j".into(),
            roads: vec![Road {
                road_id: 1,
                is_junction: true,
                lanes: vec![lane(1), lane(2)],
            }],
        },
        Block {
            id: "b".into(),
            roads: vec![Road {
                road_id: 2,
                is_junction: false,
                lanes: vec![lane(1)],
            }],
        },
    ];
    let network = RoadNetwork::build(blocks);

    let mut labels = vec![(0, 1); 3];
    labels.extend([(1, 1), (1, 2)]);
    labels.extend(vec![(2, 1); 3]);
    let mut ticks = ticks_for(&labels);
    let before = labels_of(&ticks);

    clean_junction_labels(&mut ticks, &network).unwrap();

    assert_eq!(labels_of(&ticks), before);
}

#[test]
fn test_absence_closes_traversal() {
    // The vehicle disappears right after a junction traversal; the pending
    // ticks are resolved by majority against the open end.
    let mut labels = vec![(0, 1); 5];
    labels.extend([(1, 2), (1, 3), (1, 2)]);
    let mut ticks = ticks_for(&labels);
    ticks.push(RawTick {
        current_tick: 0.8,
        actor_positions: vec![],
    });
    ticks.extend(ticks_for(&[(2, 1)]).into_iter().map(|mut t| {
        t.current_tick = 0.9;
        t
    }));

    clean_junction_labels(&mut ticks, &junction_network()).unwrap();

    let cleaned: Vec<_> = ticks[5..8]
        .iter()
        .map(|t| {
            let p = t.vehicle_position(1).unwrap();
            (p.road_id, p.lane_id)
        })
        .collect();
    assert_eq!(cleaned, vec![(1, 2), (1, 2), (1, 2)]);
}

#[test]
fn test_other_vehicles_untouched() {
    let mut labels = vec![(0, 1); 4];
    labels.extend([(1, 1), (1, 2)]);
    labels.extend(vec![(2, 1); 4]);
    let mut ticks = ticks_for(&labels);
    // A second vehicle that stays cleanly on road 0 throughout.
    for (i, tick) in ticks.iter_mut().enumerate() {
        tick.actor_positions.push(RawActorPosition {
            actor: RawActor::Vehicle {
                id: 2,
                ego_vehicle: false,
            },
            road_id: 0,
            lane_id: 1,
            position_on_lane: i as f64,
            location: Vec3::new(i as f64, 2.0, 0.0),
        });
    }

    clean_junction_labels(&mut ticks, &junction_network()).unwrap();

    for tick in &ticks {
        let other = tick
            .actor_positions
            .iter()
            .find(|p| p.actor.id() == 2)
            .unwrap();
        assert_eq!((other.road_id, other.lane_id), (0, 1));
    }
    // The mislabelled traversal of vehicle 1 was still repaired.
    let repaired = ticks[4].vehicle_position(1).unwrap();
    assert_eq!((repaired.road_id, repaired.lane_id), (1, 1));
}

#[test]
fn test_lane_key_display() {
    assert_eq!(LaneKey::new(4, -2).to_string(), "4/-2");
}
