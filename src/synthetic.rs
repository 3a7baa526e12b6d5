//! Synthetic trace generator for tests and benchmarks.
//!
//! Generates deterministic simulation traces with known geometry: a chain of
//! fixed-length roads (optionally junction roads with dangling internal
//! lanes), one ego vehicle driving the chain under a configurable speed
//! profile, optional follower vehicles and stationary pedestrians. The
//! generated documents go through the exact same cleaning/conversion path as
//! recorded traces, so every pipeline stage can be exercised against ground
//! truth.
//!
//! # Example
//!
//! ```rust
//! use tracesegment::synthetic::TraceScenario;
//!
//! let runs = TraceScenario::straight(120).runs().unwrap();
//! assert_eq!(runs.len(), 1);
//! assert_eq!(runs[0].ticks.len(), 120);
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

use crate::cleaning::clean_junction_labels;
use crate::convert::{convert_to_runs, fill_kinematics};
use crate::error::Result;
use crate::input::{RawActor, RawActorPosition, RawTick};
use crate::network::{Block, Lane, LaneKey, LaneType, Road, RoadNetwork};
use crate::{SimulationRun, Vec3};

/// Ego speed over the run.
#[derive(Debug, Clone, Copy)]
pub enum SpeedProfile {
    /// Constant speed in km/h.
    ConstantKmPerH(f64),
    /// Linear ramp from `from` to `to` km/h across the run.
    RampKmPerH { from: f64, to: f64 },
}

impl SpeedProfile {
    /// Speed in m/s at one tick.
    fn meters_per_second(&self, tick: usize, tick_count: usize) -> f64 {
        let km_per_h = match *self {
            SpeedProfile::ConstantKmPerH(v) => v,
            SpeedProfile::RampKmPerH { from, to } => {
                if tick_count <= 1 {
                    from
                } else {
                    from + (to - from) * tick as f64 / (tick_count - 1) as f64
                }
            }
        };
        km_per_h / 3.6
    }
}

/// Scenario configuration. The defaults describe a plain straight drive;
/// individual fields are overridden per test.
#[derive(Debug, Clone)]
pub struct TraceScenario {
    /// Identifier stamped on the generated run.
    pub run_id: String,
    /// Number of chained roads; road ids are `0..road_count`.
    pub road_count: usize,
    /// Length of every road in meters.
    pub road_length_meters: f64,
    /// Indices of roads that are junction roads.
    pub junction_roads: Vec<usize>,
    /// Internal lanes per junction road. Lane 1 connects the neighbouring
    /// roads; further lanes are dangling mislabel targets.
    pub junction_lane_count: usize,
    /// Applicable speed limit per road index (km/h); shorter lists leave the
    /// remaining roads without a limit.
    pub speed_limits: Vec<Option<f64>>,
    /// Wall-clock seconds between ticks.
    pub tick_period_seconds: f64,
    pub tick_count: usize,
    pub speed: SpeedProfile,
    /// Trailing vehicles, one per entry, each this many meters behind the ego.
    pub follower_offsets_meters: Vec<f64>,
    /// Stationary pedestrians on the driving lane at these path positions.
    pub pedestrian_positions_meters: Vec<f64>,
    /// Gaussian-ish lateral jitter applied to world locations.
    pub location_noise_meters: f64,
    pub seed: u64,
}

impl TraceScenario {
    /// A straight constant-speed drive long enough for `tick_count` ticks:
    /// 36 km/h, 100 ms tick period, 100 m roads, no junctions.
    pub fn straight(tick_count: usize) -> Self {
        let tick_period_seconds = 0.1;
        let speed = SpeedProfile::ConstantKmPerH(36.0);
        let total_meters = tick_count as f64 * tick_period_seconds * 10.0;
        let road_length_meters = 100.0;
        let road_count = (total_meters / road_length_meters).ceil() as usize + 1;
        Self {
            run_id: "test_case".to_string(),
            road_count,
            road_length_meters,
            junction_roads: Vec::new(),
            junction_lane_count: 1,
            speed_limits: Vec::new(),
            tick_period_seconds,
            tick_count,
            speed,
            follower_offsets_meters: Vec::new(),
            pedestrian_positions_meters: Vec::new(),
            location_noise_meters: 0.0,
            seed: 7,
        }
    }

    /// The static map: one block per road, roads chained lane-to-lane.
    pub fn blocks(&self) -> Vec<Block> {
        let mut blocks = Vec::with_capacity(self.road_count);
        for road_index in 0..self.road_count {
            let road_id = road_index as i64;
            let is_junction = self.junction_roads.contains(&road_index);
            let predecessor = if road_index > 0 {
                vec![LaneKey::new(road_id - 1, 1)]
            } else {
                Vec::new()
            };
            let successor = if road_index + 1 < self.road_count {
                vec![LaneKey::new(road_id + 1, 1)]
            } else {
                Vec::new()
            };
            let speed_limit = self.speed_limits.get(road_index).copied().flatten();

            let mut lanes = vec![Lane {
                lane_id: 1,
                lane_type: LaneType::Driving,
                speed_limit,
                successor_lanes: successor,
                predecessor_lanes: predecessor,
            }];
            if is_junction {
                // Dangling internal lanes: plausible mislabel targets that
                // connect nothing.
                for extra in 1..self.junction_lane_count {
                    lanes.push(Lane {
                        lane_id: 1 + extra as i32,
                        lane_type: LaneType::Driving,
                        speed_limit: None,
                        successor_lanes: Vec::new(),
                        predecessor_lanes: Vec::new(),
                    });
                }
            }

            blocks.push(Block {
                id: format!("block_{}", road_index),
                roads: vec![Road {
                    road_id,
                    is_junction,
                    lanes,
                }],
            });
        }
        blocks
    }

    /// Build and index the scenario's road network.
    pub fn network(&self) -> Arc<RoadNetwork> {
        Arc::new(RoadNetwork::build(self.blocks()))
    }

    /// Generate the raw dynamic document for this scenario.
    pub fn raw_ticks(&self) -> Vec<RawTick> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut ticks = Vec::with_capacity(self.tick_count);
        let mut ego_path_meters = 0.0;

        for tick in 0..self.tick_count {
            let mut positions = Vec::new();
            positions.push(self.vehicle_position(1, true, ego_path_meters, &mut rng));
            for (offset_index, offset) in self.follower_offsets_meters.iter().enumerate() {
                let follower_path = (ego_path_meters - offset).max(0.0);
                positions.push(self.vehicle_position(
                    100 + offset_index as u64,
                    false,
                    follower_path,
                    &mut rng,
                ));
            }
            for (pedestrian_index, path) in self.pedestrian_positions_meters.iter().enumerate() {
                let (road_id, position_on_lane) = self.road_at(*path);
                positions.push(RawActorPosition {
                    actor: RawActor::Pedestrian {
                        id: 200 + pedestrian_index as u64,
                    },
                    road_id,
                    lane_id: 1,
                    position_on_lane,
                    location: Vec3::new(*path, 0.0, 0.0),
                });
            }

            ticks.push(RawTick {
                current_tick: tick as f64 * self.tick_period_seconds,
                actor_positions: positions,
            });

            let speed = self.speed.meters_per_second(tick, self.tick_count);
            ego_path_meters += speed * self.tick_period_seconds;
        }
        ticks
    }

    /// Clean, convert and kinematically fill the generated trace.
    pub fn runs(&self) -> Result<Vec<SimulationRun>> {
        let network = self.network();
        let mut ticks = self.raw_ticks();
        clean_junction_labels(&mut ticks, &network)?;
        let mut runs = convert_to_runs(&ticks, &network, false, &self.run_id)?;
        for run in &mut runs {
            fill_kinematics(run)?;
        }
        Ok(runs)
    }

    fn vehicle_position(
        &self,
        id: u64,
        ego: bool,
        path_meters: f64,
        rng: &mut StdRng,
    ) -> RawActorPosition {
        let (road_id, position_on_lane) = self.road_at(path_meters);
        let jitter = if self.location_noise_meters > 0.0 {
            rng.gen_range(-self.location_noise_meters..self.location_noise_meters)
        } else {
            0.0
        };
        RawActorPosition {
            actor: RawActor::Vehicle {
                id,
                ego_vehicle: ego,
            },
            road_id,
            lane_id: 1,
            position_on_lane,
            location: Vec3::new(path_meters, jitter, 0.0),
        }
    }

    /// Road id and lane position for a path distance from the chain start.
    fn road_at(&self, path_meters: f64) -> (i64, f64) {
        let road_index = ((path_meters / self.road_length_meters) as usize)
            .min(self.road_count.saturating_sub(1));
        let position_on_lane = path_meters - road_index as f64 * self.road_length_meters;
        (road_index as i64, position_on_lane)
    }
}
