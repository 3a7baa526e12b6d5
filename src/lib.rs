//! # Trace Segment
//!
//! Trace-to-segment pipeline for recorded driving-simulation runs.
//!
//! This library ingests recorded simulation traces (a static road-network
//! document plus per-tick dynamic state) and produces a lazy stream of
//! **segments** - bounded sub-sequences of ticks - for downstream
//! scenario-pattern evaluation. It provides:
//!
//! - Normalisation of raw per-tick records into ego-centric, kinematically
//!   complete timelines
//! - Repair of map-inference noise at junction boundaries
//! - Velocity and acceleration derivation from recorded positions
//! - A closed family of segmentation strategies (fixed-tick, fixed-distance,
//!   speed/acceleration-adaptive, sliding-window and event-triggered variants)
//! - A bounded, back-pressured loader/slicer pipeline emitting segments as a
//!   blocking iterator
//!
//! ## Quick Start
//!
//! ```rust
//! use tracesegment::synthetic::TraceScenario;
//! use tracesegment::{SegmentationConfig, SegmentationStrategy, Segmenter};
//!
//! // A deterministic synthetic run: one ego vehicle, 250 ticks, straight roads.
//! let runs = TraceScenario::straight(250).runs().unwrap();
//!
//! let config = SegmentationConfig::default();
//! let mut segmenter = Segmenter::new(
//!     SegmentationStrategy::StaticSegmentLengthTicks {
//!         window_ticks: 100,
//!         step_ticks: 100,
//!     },
//!     &config,
//! )
//! .unwrap();
//!
//! let segments = segmenter.segment_run(&runs[0]).unwrap();
//! assert_eq!(segments.len(), 3);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};
use std::sync::Arc;

// Unified error handling
pub mod error;
pub use error::{Result, SegmentationError};

// Static road-network model and index
pub mod network;
pub use network::{Block, Lane, LaneKey, LaneRef, LaneType, Road, RoadNetwork, RoadRef};

// Raw on-disk dynamic data model
pub mod input;
pub use input::{RawActor, RawActorPosition, RawTick, TrafficLightState};

// Junction label repair
pub mod cleaning;
pub use cleaning::clean_junction_labels;

// Tick conversion and kinematics derivation
pub mod convert;
pub use convert::{convert_to_runs, fill_kinematics};

// Segmentation strategy family
pub mod segmentation;
pub use segmentation::{index_at_distance, last_valid_start, SegmentationStrategy, Segmenter};

// Bounded loader/slicer pipeline
pub mod pipeline;
pub use pipeline::{MapRuns, PipelineMetrics, SegmentStream};

// Deterministic trace generation for tests and benchmarks
pub mod synthetic;

// ============================================================================
// Core Types
// ============================================================================

/// A three-dimensional vector in map coordinates (meters), also used for
/// velocities (m/s) and accelerations (m/s²).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean length.
    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: Vec3) -> f64 {
        (*self - other).length()
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Div<f64> for Vec3 {
    type Output = Vec3;
    fn div(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

/// A converted vehicle: lane-anchored position plus derived kinematics.
///
/// `velocity` and `acceleration` are zero until the kinematics filler has run
/// over the timeline; the scalar magnitudes are derived on read.
#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    pub id: u64,
    pub is_ego: bool,
    pub location: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
    pub lane: LaneRef,
    /// Distance along the lane in meters.
    pub position_on_lane: f64,
}

impl Vehicle {
    /// Speed magnitude in km/h.
    pub fn eff_velocity_km_per_h(&self) -> f64 {
        self.velocity.length() * 3.6
    }

    /// Acceleration magnitude in m/s².
    pub fn eff_acceleration_m_per_s2(&self) -> f64 {
        self.acceleration.length()
    }
}

/// A converted pedestrian. Pedestrians keep their lane reference so proximity
/// segmentation can restrict itself to pedestrians on driving lanes.
#[derive(Debug, Clone, PartialEq)]
pub struct Pedestrian {
    pub id: u64,
    pub location: Vec3,
    pub lane: LaneRef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrafficLight {
    pub id: u64,
    pub location: Vec3,
    pub state: TrafficLightState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrafficSign {
    pub id: u64,
    pub location: Vec3,
    pub sign_type: String,
}

/// A converted actor: one of the four simulator actor kinds with a shared
/// id/location view.
#[derive(Debug, Clone, PartialEq)]
pub enum Actor {
    Vehicle(Vehicle),
    Pedestrian(Pedestrian),
    TrafficLight(TrafficLight),
    TrafficSign(TrafficSign),
}

impl Actor {
    pub fn id(&self) -> u64 {
        match self {
            Actor::Vehicle(v) => v.id,
            Actor::Pedestrian(p) => p.id,
            Actor::TrafficLight(t) => t.id,
            Actor::TrafficSign(s) => s.id,
        }
    }

    pub fn location(&self) -> Vec3 {
        match self {
            Actor::Vehicle(v) => v.location,
            Actor::Pedestrian(p) => p.location,
            Actor::TrafficLight(t) => t.location,
            Actor::TrafficSign(s) => s.location,
        }
    }

    pub fn as_vehicle(&self) -> Option<&Vehicle> {
        match self {
            Actor::Vehicle(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vehicle_mut(&mut self) -> Option<&mut Vehicle> {
        match self {
            Actor::Vehicle(v) => Some(v),
            _ => None,
        }
    }
}

/// A timestamped snapshot of every converted actor's state.
///
/// Cloning a tick is a deep copy of its actors; the road network stays shared
/// behind an `Arc`, so every clone references the same map. In an ego-tagged
/// timeline exactly one vehicle per tick carries `is_ego`.
#[derive(Debug, Clone)]
pub struct TickData {
    /// Wall-clock time of this tick in seconds.
    pub current_tick: f64,
    pub actors: Vec<Actor>,
    network: Arc<RoadNetwork>,
}

impl TickData {
    pub fn new(current_tick: f64, actors: Vec<Actor>, network: Arc<RoadNetwork>) -> Self {
        Self {
            current_tick,
            actors,
            network,
        }
    }

    pub fn network(&self) -> &RoadNetwork {
        &self.network
    }

    pub fn shared_network(&self) -> Arc<RoadNetwork> {
        Arc::clone(&self.network)
    }

    /// The designated ego vehicle of this tick, if one is tagged.
    pub fn ego(&self) -> Option<&Vehicle> {
        self.vehicles().find(|v| v.is_ego)
    }

    pub fn ego_mut(&mut self) -> Option<&mut Vehicle> {
        self.actors
            .iter_mut()
            .filter_map(Actor::as_vehicle_mut)
            .find(|v| v.is_ego)
    }

    pub fn vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.actors.iter().filter_map(Actor::as_vehicle)
    }

    pub fn pedestrians(&self) -> impl Iterator<Item = &Pedestrian> {
        self.actors.iter().filter_map(|a| match a {
            Actor::Pedestrian(p) => Some(p),
            _ => None,
        })
    }
}

/// The ordered, ego-tagged timeline of one simulation execution.
#[derive(Debug, Clone)]
pub struct SimulationRun {
    pub simulation_run_id: String,
    pub ticks: Vec<TickData>,
}

impl SimulationRun {
    pub fn new(simulation_run_id: impl Into<String>, ticks: Vec<TickData>) -> Self {
        Self {
            simulation_run_id: simulation_run_id.into(),
            ticks,
        }
    }
}

/// A bounded sub-sequence of a run, emitted by the segmenter.
///
/// Segments own deep copies of their ticks, so the source timeline can be
/// released once a run has been sliced, and mutating one segment never
/// disturbs another.
#[derive(Debug, Clone)]
pub struct Segment {
    /// Non-empty, ascending by `current_tick`.
    pub tick_data: Vec<TickData>,
    pub simulation_run_id: String,
    /// Provenance: the id of the run this segment was cut from.
    pub segment_source: String,
    /// Name of the strategy that produced this segment.
    pub segmentation_type: &'static str,
}

impl Segment {
    pub fn tick_count(&self) -> usize {
        self.tick_data.len()
    }

    pub fn first_tick(&self) -> &TickData {
        &self.tick_data[0]
    }

    pub fn last_tick(&self) -> &TickData {
        &self.tick_data[self.tick_data.len() - 1]
    }
}

/// Configuration surface of the pipeline and the segmenter.
#[derive(Debug, Clone)]
pub struct SegmentationConfig {
    /// Emit one run per vehicle present in the first tick instead of only the
    /// pre-tagged (or first) ego.
    pub use_every_vehicle_as_ego: bool,
    /// Non-junction segment candidates shorter than this are dropped.
    pub min_segment_tick_count: usize,
    /// Truncation cap for the dynamic-length strategies. Required whenever a
    /// dynamic strategy is selected.
    pub max_segment_tick_count: Option<usize>,
    /// Flatten all maps and process dynamic files globally ordered by seed.
    pub order_files_by_seed: bool,
    /// Capacity of the bounded segment channel; the slicer blocks once this
    /// many segments are outstanding.
    pub simulation_run_prefetch_size: usize,
    /// Strategy applied to every converted run.
    pub strategy: SegmentationStrategy,
    /// Seed for the randomised window strategies, injectable for
    /// reproducible runs.
    pub rng_seed: u64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            use_every_vehicle_as_ego: false,
            min_segment_tick_count: 10,
            max_segment_tick_count: None,
            order_files_by_seed: false,
            simulation_run_prefetch_size: 500,
            strategy: SegmentationStrategy::ByBlock,
            rng_seed: 0,
        }
    }
}
