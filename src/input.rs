//! Raw on-disk data model for dynamic trace documents.
//!
//! A dynamic document is a JSON array of ticks; every tick carries a
//! timestamp and the positions of all actors present at that moment. Actor
//! descriptors are polymorphic, tagged by `kind`.
//!
//! Raw positions are mutable in exactly one place: the junction cleaner may
//! rewrite `roadId`/`laneId` to repair misattributed internal junction lanes
//! before conversion.

use serde::{Deserialize, Serialize};

use crate::Vec3;

/// Traffic-light phase as recorded by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum TrafficLightState {
    Red,
    Yellow,
    Green,
    Off,
    #[default]
    Unknown,
}

/// Polymorphic raw actor descriptor, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RawActor {
    Vehicle {
        id: u64,
        #[serde(default)]
        ego_vehicle: bool,
    },
    Pedestrian {
        id: u64,
    },
    TrafficLight {
        id: u64,
        #[serde(default)]
        state: TrafficLightState,
    },
    TrafficSign {
        id: u64,
        #[serde(default)]
        sign_type: String,
    },
}

impl RawActor {
    pub fn id(&self) -> u64 {
        match self {
            RawActor::Vehicle { id, .. }
            | RawActor::Pedestrian { id }
            | RawActor::TrafficLight { id, .. }
            | RawActor::TrafficSign { id, .. } => *id,
        }
    }

    pub fn is_vehicle(&self) -> bool {
        matches!(self, RawActor::Vehicle { .. })
    }
}

/// Position of one actor at one tick: which lane it occupies, how far along
/// the lane it is, and its world location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawActorPosition {
    pub actor: RawActor,
    pub road_id: i64,
    pub lane_id: i32,
    /// Distance along the lane in meters.
    pub position_on_lane: f64,
    pub location: Vec3,
}

/// A timestamped snapshot of every actor's raw state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTick {
    /// Wall-clock time of this tick in seconds.
    pub current_tick: f64,
    pub actor_positions: Vec<RawActorPosition>,
}

impl RawTick {
    /// The raw position of the vehicle with the given id, if present.
    pub fn vehicle_position(&self, vehicle_id: u64) -> Option<&RawActorPosition> {
        self.actor_positions
            .iter()
            .find(|p| p.actor.is_vehicle() && p.actor.id() == vehicle_id)
    }

    /// Mutable access to the raw position of the vehicle with the given id.
    pub fn vehicle_position_mut(&mut self, vehicle_id: u64) -> Option<&mut RawActorPosition> {
        self.actor_positions
            .iter_mut()
            .find(|p| p.actor.is_vehicle() && p.actor.id() == vehicle_id)
    }
}
