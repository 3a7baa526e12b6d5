//! Tick conversion and kinematics derivation.
//!
//! Conversion turns cleaned raw ticks into [`TickData`] timelines: lane
//! references are resolved against the road-network index, actors become
//! typed, and one independently mutable timeline is cloned per selected ego
//! vehicle. The kinematics filler then derives per-vehicle velocity and
//! acceleration from successive recorded positions.

use std::sync::Arc;

use crate::error::{Result, SegmentationError};
use crate::input::{RawActor, RawTick};
use crate::network::RoadNetwork;
use crate::{
    Actor, Pedestrian, SimulationRun, TickData, TrafficLight, TrafficSign, Vec3, Vehicle,
};

/// Convert a cleaned raw tick list into one [`SimulationRun`] per selected
/// ego vehicle.
///
/// Ego selection looks at the vehicles of the first tick: with
/// `use_every_vehicle_as_ego` every one of them anchors a run; otherwise the
/// pre-tagged ego vehicles are kept, falling back to the first vehicle when
/// none is tagged. A run whose ego disappears mid-timeline is aborted and
/// skipped, never emitted partially.
pub fn convert_to_runs(
    raw: &[RawTick],
    network: &Arc<RoadNetwork>,
    use_every_vehicle_as_ego: bool,
    simulation_run_id: &str,
) -> Result<Vec<SimulationRun>> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    // The reference timeline is converted once and cloned per ego.
    let reference: Vec<TickData> = raw
        .iter()
        .map(|tick| convert_tick(tick, network))
        .collect::<Result<_>>()?;

    let first_vehicles: Vec<&Vehicle> = reference[0].vehicles().collect();
    let selected: Vec<u64> = if use_every_vehicle_as_ego {
        first_vehicles.iter().map(|v| v.id).collect()
    } else if first_vehicles.iter().any(|v| v.is_ego) {
        first_vehicles
            .iter()
            .filter(|v| v.is_ego)
            .map(|v| v.id)
            .collect()
    } else {
        first_vehicles.first().map(|v| v.id).into_iter().collect()
    };

    let mut runs = Vec::with_capacity(selected.len());
    'egos: for ego_id in selected {
        let mut timeline = reference.clone();
        if use_every_vehicle_as_ego {
            for tick in &mut timeline {
                for actor in &mut tick.actors {
                    if let Some(vehicle) = actor.as_vehicle_mut() {
                        vehicle.is_ego = false;
                    }
                }
            }
        }
        for (idx, tick) in timeline.iter_mut().enumerate() {
            let ego = tick
                .actors
                .iter_mut()
                .filter_map(Actor::as_vehicle_mut)
                .find(|v| v.id == ego_id);
            match ego {
                Some(vehicle) => vehicle.is_ego = true,
                None => {
                    log::warn!(
                        "[Converter] ego vehicle {} missing at tick index {}, skipping run {}",
                        ego_id,
                        idx,
                        simulation_run_id
                    );
                    continue 'egos;
                }
            }
        }
        runs.push(SimulationRun::new(simulation_run_id, timeline));
    }
    Ok(runs)
}

fn convert_tick(raw: &RawTick, network: &Arc<RoadNetwork>) -> Result<TickData> {
    let mut actors = Vec::with_capacity(raw.actor_positions.len());
    for position in &raw.actor_positions {
        let actor = match &position.actor {
            RawActor::Vehicle { id, ego_vehicle } => Actor::Vehicle(Vehicle {
                id: *id,
                is_ego: *ego_vehicle,
                location: position.location,
                velocity: Vec3::ZERO,
                acceleration: Vec3::ZERO,
                lane: network.find_lane(position.road_id, position.lane_id)?,
                position_on_lane: position.position_on_lane,
            }),
            RawActor::Pedestrian { id } => Actor::Pedestrian(Pedestrian {
                id: *id,
                location: position.location,
                lane: network.find_lane(position.road_id, position.lane_id)?,
            }),
            RawActor::TrafficLight { id, state } => Actor::TrafficLight(TrafficLight {
                id: *id,
                location: position.location,
                state: *state,
            }),
            RawActor::TrafficSign { id, sign_type } => Actor::TrafficSign(TrafficSign {
                id: *id,
                location: position.location,
                sign_type: sign_type.clone(),
            }),
        };
        actors.push(actor);
    }
    Ok(TickData::new(raw.current_tick, actors, Arc::clone(network)))
}

/// Derive per-vehicle velocity and acceleration from successive positions.
///
/// A vehicle without a predecessor on the previous tick (it just spawned)
/// gets zero vectors, as does any vehicle across a zero-length time step.
/// Ticks running backwards in time are a fatal [`SegmentationError::TimeOrderViolation`];
/// an actor id that changes kind between ticks is a fatal
/// [`SegmentationError::TypeMismatch`].
pub fn fill_kinematics(run: &mut SimulationRun) -> Result<()> {
    for i in 1..run.ticks.len() {
        let (head, tail) = run.ticks.split_at_mut(i);
        let previous_tick = &head[i - 1];
        let current_tick = &mut tail[0];

        let dt = current_tick.current_tick - previous_tick.current_tick;
        if dt < 0.0 {
            return Err(SegmentationError::TimeOrderViolation {
                previous: previous_tick.current_tick,
                current: current_tick.current_tick,
            });
        }

        for actor in current_tick.actors.iter_mut() {
            let vehicle = match actor.as_vehicle_mut() {
                Some(v) => v,
                None => continue,
            };
            let previous = match previous_tick.actors.iter().find(|a| a.id() == vehicle.id) {
                None => {
                    vehicle.velocity = Vec3::ZERO;
                    vehicle.acceleration = Vec3::ZERO;
                    continue;
                }
                Some(Actor::Vehicle(p)) => p,
                Some(_) => {
                    return Err(SegmentationError::TypeMismatch {
                        actor_id: vehicle.id,
                    })
                }
            };

            if dt == 0.0 {
                vehicle.velocity = Vec3::ZERO;
                vehicle.acceleration = Vec3::ZERO;
                continue;
            }

            let velocity = (vehicle.location - previous.location) / dt;
            // Bit-compatible with the recorder that produced the traces:
            // only the previous velocity is divided by the time delta.
            vehicle.acceleration = velocity - previous.velocity / dt;
            vehicle.velocity = velocity;
        }
    }
    Ok(())
}
