//! Static road-network model and lookup index.
//!
//! The map is a three-level hierarchy: named [`Block`]s own [`Road`]s, roads
//! own [`Lane`]s. Lanes reference their successor and predecessor lanes by
//! `(road_id, lane_id)` key, never by ownership, so the decoded document is a
//! tree and the graph structure lives in the index.
//!
//! [`RoadNetwork::build`] flattens the block list once into two hash maps
//! (lane lookup and road lookup) and resolves the successor/predecessor key
//! lists into index references. The network is immutable after build and is
//! shared read-only (`Arc`) across the whole pipeline.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Result, SegmentationError};

/// Key of a lane inside the map document: lanes are globally identified by
/// the pair of their road id and their signed lane id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaneKey {
    pub road_id: i64,
    pub lane_id: i32,
}

impl LaneKey {
    pub fn new(road_id: i64, lane_id: i32) -> Self {
        Self { road_id, lane_id }
    }
}

impl std::fmt::Display for LaneKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.road_id, self.lane_id)
    }
}

/// Lane usage classification. Only `Driving` lanes matter for proximity
/// segmentation; the remaining kinds are carried through for completeness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum LaneType {
    #[default]
    Driving,
    Sidewalk,
    Shoulder,
    Parking,
    Biking,
    Other,
}

/// A single lane of a road.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lane {
    pub lane_id: i32,
    #[serde(default)]
    pub lane_type: LaneType,
    /// Applicable speed limit in km/h, if the map carries one for this lane.
    #[serde(default)]
    pub speed_limit: Option<f64>,
    /// Lanes reachable from the end of this lane.
    #[serde(default)]
    pub successor_lanes: Vec<LaneKey>,
    /// Lanes from which this lane is reachable.
    #[serde(default)]
    pub predecessor_lanes: Vec<LaneKey>,
}

/// A road: an ordered run of lanes, possibly marking a junction. Junction
/// roads are the internal connecting roads between multilane roads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Road {
    pub road_id: i64,
    #[serde(default)]
    pub is_junction: bool,
    pub lanes: Vec<Lane>,
}

/// A named region of the map, owning an ordered sequence of roads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: String,
    pub roads: Vec<Road>,
}

/// Index reference to a road inside a [`RoadNetwork`]. Only ever produced by
/// the owning network, so resolution cannot fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoadRef {
    block: u32,
    road: u32,
}

impl RoadRef {
    /// Whether two roads belong to the same block.
    pub fn same_block(&self, other: RoadRef) -> bool {
        self.block == other.block
    }
}

/// Index reference to a lane inside a [`RoadNetwork`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LaneRef {
    block: u32,
    road: u32,
    lane: u32,
}

impl LaneRef {
    /// The road this lane belongs to.
    pub fn road_ref(&self) -> RoadRef {
        RoadRef {
            block: self.block,
            road: self.road,
        }
    }
}

/// Flattened, immutable lookup index over the block list.
#[derive(Debug)]
pub struct RoadNetwork {
    blocks: Vec<Block>,
    lane_index: HashMap<(i64, i32), LaneRef>,
    road_index: HashMap<i64, RoadRef>,
    successors: HashMap<LaneRef, Vec<LaneRef>>,
    predecessors: HashMap<LaneRef, Vec<LaneRef>>,
}

impl RoadNetwork {
    /// Build the lookup index from a decoded block list. Successor and
    /// predecessor keys that reference lanes outside the document are dropped.
    pub fn build(blocks: Vec<Block>) -> Self {
        let mut lane_index = HashMap::new();
        let mut road_index = HashMap::new();

        for (b, block) in blocks.iter().enumerate() {
            for (r, road) in block.roads.iter().enumerate() {
                road_index.insert(
                    road.road_id,
                    RoadRef {
                        block: b as u32,
                        road: r as u32,
                    },
                );
                for (l, lane) in road.lanes.iter().enumerate() {
                    lane_index.insert(
                        (road.road_id, lane.lane_id),
                        LaneRef {
                            block: b as u32,
                            road: r as u32,
                            lane: l as u32,
                        },
                    );
                }
            }
        }

        let mut successors: HashMap<LaneRef, Vec<LaneRef>> = HashMap::new();
        let mut predecessors: HashMap<LaneRef, Vec<LaneRef>> = HashMap::new();
        for block in &blocks {
            for road in &block.roads {
                for lane in &road.lanes {
                    let lane_ref = lane_index[&(road.road_id, lane.lane_id)];
                    let resolve = |keys: &[LaneKey]| -> Vec<LaneRef> {
                        keys.iter()
                            .filter_map(|k| {
                                let resolved = lane_index.get(&(k.road_id, k.lane_id)).copied();
                                if resolved.is_none() {
                                    log::debug!(
                                        "[Network] dropping dangling lane relation {} -> {}",
                                        LaneKey::new(road.road_id, lane.lane_id),
                                        k
                                    );
                                }
                                resolved
                            })
                            .collect()
                    };
                    let succ = resolve(&lane.successor_lanes);
                    if !succ.is_empty() {
                        successors.insert(lane_ref, succ);
                    }
                    let pred = resolve(&lane.predecessor_lanes);
                    if !pred.is_empty() {
                        predecessors.insert(lane_ref, pred);
                    }
                }
            }
        }

        Self {
            blocks,
            lane_index,
            road_index,
            successors,
            predecessors,
        }
    }

    /// Look up a lane by its `(road_id, lane_id)` key.
    pub fn find_lane(&self, road_id: i64, lane_id: i32) -> Result<LaneRef> {
        self.lane_index
            .get(&(road_id, lane_id))
            .copied()
            .ok_or(SegmentationError::UnknownLane { road_id, lane_id })
    }

    /// Look up a road by id.
    pub fn road_of(&self, road_id: i64) -> Result<RoadRef> {
        self.road_index
            .get(&road_id)
            .copied()
            .ok_or(SegmentationError::UnknownRoad { road_id })
    }

    /// Whether the road with the given id is a junction road.
    pub fn is_junction(&self, road_id: i64) -> Result<bool> {
        Ok(self.road(self.road_of(road_id)?).is_junction)
    }

    pub fn road(&self, r: RoadRef) -> &Road {
        &self.blocks[r.block as usize].roads[r.road as usize]
    }

    pub fn lane(&self, l: LaneRef) -> &Lane {
        &self.blocks[l.block as usize].roads[l.road as usize].lanes[l.lane as usize]
    }

    pub fn road_of_lane(&self, l: LaneRef) -> &Road {
        self.road(l.road_ref())
    }

    pub fn block_id(&self, r: RoadRef) -> &str {
        &self.blocks[r.block as usize].id
    }

    /// The `(road_id, lane_id)` key of an indexed lane.
    pub fn lane_key(&self, l: LaneRef) -> LaneKey {
        let road = self.road_of_lane(l);
        LaneKey::new(road.road_id, self.lane(l).lane_id)
    }

    pub fn successors(&self, l: LaneRef) -> &[LaneRef] {
        self.successors.get(&l).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn predecessors(&self, l: LaneRef) -> &[LaneRef] {
        self.predecessors.get(&l).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }
}
