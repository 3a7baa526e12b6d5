//! Junction label repair.
//!
//! Inside a junction the raw labeller may attribute a vehicle to different
//! internal lanes on successive ticks, which downstream reads as spurious
//! lane changes. The cleaner walks every vehicle's lane progression and
//! rewrites the labels of each junction traversal so the whole traversal
//! commits to one plausible internal lane.
//!
//! Runs on the raw tick list, before conversion; this is the only place that
//! mutates raw actor positions.

use std::collections::BTreeSet;

use crate::error::{Result, SegmentationError};
use crate::input::RawTick;
use crate::network::{LaneKey, RoadNetwork};

/// One entry of a vehicle's lane progression: the lane it occupies on a tick
/// (absent when the vehicle is not present) and whether that lane's road is a
/// junction road.
#[derive(Debug, Clone, Copy)]
enum ProgressionEntry {
    Absent,
    On { lane: LaneKey, junction: bool },
}

/// Rewrite junction-internal lane labels for every vehicle in the tick list.
///
/// For each vehicle the progression is walked tracking the last non-junction
/// lane and accumulating consecutive junction ticks; each completed
/// accumulator is resolved against the surrounding multilane roads and, when
/// a plausible internal lane is found, the raw `(road_id, lane_id)` labels of
/// the accumulated ticks are overwritten with it.
pub fn clean_junction_labels(ticks: &mut [RawTick], network: &RoadNetwork) -> Result<()> {
    let vehicle_ids: BTreeSet<u64> = ticks
        .iter()
        .flat_map(|t| t.actor_positions.iter())
        .filter(|p| p.actor.is_vehicle())
        .map(|p| p.actor.id())
        .collect();

    for vehicle_id in vehicle_ids {
        clean_vehicle(ticks, network, vehicle_id)?;
    }
    Ok(())
}

fn clean_vehicle(ticks: &mut [RawTick], network: &RoadNetwork, vehicle_id: u64) -> Result<()> {
    let progression = lane_progression(ticks, network, vehicle_id)?;

    let mut previous_multilane: Option<LaneKey> = None;
    // Tick indices and labels of the junction traversal currently being walked.
    let mut pending: Vec<(usize, LaneKey)> = Vec::new();

    for (idx, entry) in progression.iter().enumerate() {
        match *entry {
            ProgressionEntry::On {
                lane,
                junction: true,
            } => pending.push((idx, lane)),
            ProgressionEntry::On {
                lane,
                junction: false,
            } => {
                if !pending.is_empty() {
                    resolve_junction(
                        ticks,
                        network,
                        vehicle_id,
                        &pending,
                        previous_multilane,
                        Some(lane),
                    )?;
                    pending.clear();
                }
                previous_multilane = Some(lane);
            }
            ProgressionEntry::Absent => {
                if !pending.is_empty() {
                    resolve_junction(ticks, network, vehicle_id, &pending, previous_multilane, None)?;
                    pending.clear();
                }
                previous_multilane = None;
            }
        }
    }

    // A run may end mid-junction; flush the trailing traversal.
    if !pending.is_empty() {
        resolve_junction(ticks, network, vehicle_id, &pending, previous_multilane, None)?;
    }
    Ok(())
}

fn lane_progression(
    ticks: &[RawTick],
    network: &RoadNetwork,
    vehicle_id: u64,
) -> Result<Vec<ProgressionEntry>> {
    ticks
        .iter()
        .map(|tick| match tick.vehicle_position(vehicle_id) {
            Some(position) => Ok(ProgressionEntry::On {
                lane: LaneKey::new(position.road_id, position.lane_id),
                junction: network.is_junction(position.road_id)?,
            }),
            None => Ok(ProgressionEntry::Absent),
        })
        .collect()
}

/// Choose one internal lane for a junction traversal and overwrite the
/// accumulated raw labels with it. Leaves the labels untouched when no
/// plausible lane can be determined.
fn resolve_junction(
    ticks: &mut [RawTick],
    network: &RoadNetwork,
    vehicle_id: u64,
    pending: &[(usize, LaneKey)],
    previous_multilane: Option<LaneKey>,
    next_multilane: Option<LaneKey>,
) -> Result<()> {
    let first = pending[0].1;
    if pending.iter().all(|(_, lane)| *lane == first) {
        return Ok(());
    }

    let new_lane = match (previous_multilane, next_multilane) {
        // Traversal at the start or end of the run: commit to the label the
        // labeller produced most often.
        (None, _) | (_, None) => Some(most_frequent_lane(pending)),
        (Some(prev), Some(next)) if prev == next => Some(prev),
        (Some(prev), Some(next)) => connecting_lane(network, prev, next)?,
    };

    let new_lane = match new_lane {
        Some(lane) => lane,
        None => {
            log::debug!(
                "[Cleaner] no plausible internal lane for vehicle {} over ticks {}..{}, labels kept",
                vehicle_id,
                pending[0].0,
                pending[pending.len() - 1].0
            );
            return Ok(());
        }
    };

    for (idx, _) in pending {
        let position = ticks[*idx]
            .vehicle_position_mut(vehicle_id)
            .ok_or_else(|| SegmentationError::InconsistentTrace {
                detail: format!(
                    "vehicle {} has a lane progression entry but no raw position at tick index {}",
                    vehicle_id, idx
                ),
            })?;
        position.road_id = new_lane.road_id;
        position.lane_id = new_lane.lane_id;
    }
    Ok(())
}

/// The lane internal to the junction that connects `prev` to `next`:
/// the unique element of `successors(prev) ∩ predecessors(next)`, or - for
/// intra-junction detours such as roundabout exits - the first element of
/// `successors(successors(prev)) ∩ predecessors(next)`.
fn connecting_lane(
    network: &RoadNetwork,
    prev: LaneKey,
    next: LaneKey,
) -> Result<Option<LaneKey>> {
    let prev_ref = network.find_lane(prev.road_id, prev.lane_id)?;
    let next_ref = network.find_lane(next.road_id, next.lane_id)?;
    let entering: BTreeSet<_> = network
        .predecessors(next_ref)
        .iter()
        .map(|l| network.lane_key(*l))
        .collect();

    let direct: Vec<LaneKey> = network
        .successors(prev_ref)
        .iter()
        .map(|l| network.lane_key(*l))
        .filter(|k| entering.contains(k))
        .collect();
    if direct.len() == 1 {
        return Ok(Some(direct[0]));
    }

    let two_step = network
        .successors(prev_ref)
        .iter()
        .flat_map(|l| network.successors(*l).iter())
        .map(|l| network.lane_key(*l))
        .find(|k| entering.contains(k));
    Ok(two_step)
}

/// The most frequently recorded lane of a traversal; ties resolve to the lane
/// encountered first.
fn most_frequent_lane(pending: &[(usize, LaneKey)]) -> LaneKey {
    let mut counts: Vec<(LaneKey, usize)> = Vec::new();
    for (_, lane) in pending {
        match counts.iter_mut().find(|(l, _)| l == lane) {
            Some((_, n)) => *n += 1,
            None => counts.push((*lane, 1)),
        }
    }
    let mut best = pending[0].1;
    let mut best_count = 0;
    for (lane, count) in counts {
        if count > best_count {
            best = lane;
            best_count = count;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(lanes: &[(i64, i32)]) -> Vec<(usize, LaneKey)> {
        lanes
            .iter()
            .enumerate()
            .map(|(i, (r, l))| (i, LaneKey::new(*r, *l)))
            .collect()
    }

    #[test]
    fn test_most_frequent_lane_majority() {
        let p = pending(&[(1, 1), (1, 2), (1, 1), (1, 1)]);
        assert_eq!(most_frequent_lane(&p), LaneKey::new(1, 1));
    }

    #[test]
    fn test_most_frequent_lane_tie_prefers_first_seen() {
        let p = pending(&[(1, 2), (1, 1), (1, 1), (1, 2)]);
        assert_eq!(most_frequent_lane(&p), LaneKey::new(1, 2));
    }
}
