//! Event-triggered strategies.
//!
//! Each strategy tracks one scalar along the run (ego speed, ego
//! acceleration, traffic density, pedestrian proximity, ego lane) and cuts
//! the timeline where the scalar's bucket changes. Bucket detection is the
//! index of the first bound exceeding the value; a change in that index is
//! the cut signal.

use super::{RunView, SegmentationStrategy, Segmenter};
use crate::error::{Result, SegmentationError};
use crate::network::LaneType;
use crate::Segment;

/// Speed buckets in km/h.
const SPEED_BOUNDS_KM_PER_H: [f64; 6] = [15.0, 35.0, 60.0, 90.0, 130.0, f64::INFINITY];
/// Acceleration buckets in m/s².
const ACCELERATION_BOUNDS_M_PER_S2: [f64; 3] = [-0.5, 0.5, f64::INFINITY];
/// Buckets over the vehicle count in the ego's block.
const TRAFFIC_DENSITY_BOUNDS: [f64; 3] = [6.0, 16.0, f64::INFINITY];
/// Pedestrians further away than this never trigger a cut.
const PEDESTRIAN_PROXIMITY_METERS: f64 = 30.0;
/// Context window emitted around a lane change: ticks before / after.
const LANE_CHANGE_CONTEXT_BEFORE: usize = 10;
const LANE_CHANGE_CONTEXT_AFTER: usize = 100;

/// Index of the first bound exceeding `value`. NaN and infinite values
/// cannot be bucketed and are rejected.
fn bucket_index(bounds: &[f64], value: f64) -> Result<usize> {
    if !value.is_finite() {
        return Err(SegmentationError::UnsupportedInput {
            detail: format!("cannot bucket non-finite value {}", value),
        });
    }
    Ok(bounds
        .iter()
        .position(|bound| *bound > value)
        .unwrap_or(bounds.len()))
}

fn vehicles_in_ego_block(view: &RunView, index: usize) -> Result<usize> {
    let ego_road = view.ego(index)?.lane.road_ref();
    Ok(view.ticks[index]
        .vehicles()
        .filter(|v| v.lane.road_ref().same_block(ego_road))
        .count())
}

/// Traffic-density bucket of one tick, shared with the density-driven
/// sliding window.
pub(super) fn traffic_density_bucket(view: &RunView, index: usize) -> Result<usize> {
    bucket_index(
        &TRAFFIC_DENSITY_BOUNDS,
        vehicles_in_ego_block(view, index)? as f64,
    )
}

fn pedestrian_on_driving_lane_nearby(view: &RunView, index: usize) -> Result<bool> {
    let ego = view.ego(index)?;
    let tick = &view.ticks[index];
    for pedestrian in tick.pedestrians() {
        if tick.network().lane(pedestrian.lane).lane_type == LaneType::Driving
            && pedestrian.location.distance_to(ego.location) <= PEDESTRIAN_PROXIMITY_METERS
        {
            return Ok(true);
        }
    }
    Ok(false)
}

impl Segmenter {
    pub(super) fn by_dynamic_speed(&mut self, view: &RunView, out: &mut Vec<Segment>) -> Result<()> {
        self.split_on_bucket_change(view, out, "by_dynamic_speed", |view, i| {
            bucket_index(&SPEED_BOUNDS_KM_PER_H, view.ego(i)?.eff_velocity_km_per_h())
        })
    }

    pub(super) fn by_dynamic_acceleration(
        &mut self,
        view: &RunView,
        out: &mut Vec<Segment>,
    ) -> Result<()> {
        self.split_on_bucket_change(view, out, "by_dynamic_acceleration", |view, i| {
            bucket_index(
                &ACCELERATION_BOUNDS_M_PER_S2,
                view.ego(i)?.eff_acceleration_m_per_s2(),
            )
        })
    }

    pub(super) fn by_dynamic_traffic_density(
        &mut self,
        view: &RunView,
        out: &mut Vec<Segment>,
    ) -> Result<()> {
        self.split_on_bucket_change(view, out, "by_dynamic_traffic_density", |view, i| {
            traffic_density_bucket(view, i)
        })
    }

    pub(super) fn by_dynamic_pedestrian_proximity(
        &mut self,
        view: &RunView,
        out: &mut Vec<Segment>,
    ) -> Result<()> {
        self.split_on_bucket_change(view, out, "by_dynamic_pedestrian_proximity", |view, i| {
            Ok(pedestrian_on_driving_lane_nearby(view, i)? as usize)
        })
    }

    /// Emit a context window around every tick where the ego changes lanes.
    pub(super) fn by_dynamic_lane_changes(
        &mut self,
        view: &RunView,
        out: &mut Vec<Segment>,
    ) -> Result<()> {
        const TAG: &str = "by_dynamic_lane_changes";
        let n = view.len();
        for i in 1..n {
            if view.ego(i)?.lane != view.ego(i - 1)?.lane {
                let start = i.saturating_sub(LANE_CHANGE_CONTEXT_BEFORE);
                let end = (i + LANE_CHANGE_CONTEXT_AFTER).min(n);
                self.emit(out, view, start..end, TAG)?;
            }
        }
        Ok(())
    }

    /// Union of the block strategy, every event strategy, and a half-overlap
    /// sliding window, concatenated in a fixed order. The sub-strategies
    /// overlap by construction; downstream consumers must tolerate
    /// duplicates.
    pub(super) fn by_dynamic_variables(
        &mut self,
        view: &RunView,
        out: &mut Vec<Segment>,
        add_junctions: bool,
    ) -> Result<()> {
        let parts = [
            SegmentationStrategy::ByBlock,
            SegmentationStrategy::ByDynamicAcceleration,
            SegmentationStrategy::ByDynamicSpeed,
            SegmentationStrategy::ByDynamicTrafficDensity,
            SegmentationStrategy::ByDynamicPedestrianProximity,
            SegmentationStrategy::ByDynamicLaneChanges,
            SegmentationStrategy::SlidingWindowHalfOverlap {
                window_ticks: 100,
                add_junctions,
            },
        ];
        for part in parts {
            self.apply(part, view, out)?;
        }
        Ok(())
    }

    /// Walk the run and cut wherever the tracked bucket index changes.
    fn split_on_bucket_change(
        &mut self,
        view: &RunView,
        out: &mut Vec<Segment>,
        tag: &'static str,
        bucket_of: impl Fn(&RunView, usize) -> Result<usize>,
    ) -> Result<()> {
        let n = view.len();
        let mut segment_start = 0;
        let mut current_bucket = bucket_of(view, 0)?;
        for i in 1..n {
            let bucket = bucket_of(view, i)?;
            if bucket != current_bucket {
                self.emit(out, view, segment_start..i, tag)?;
                segment_start = i;
                current_bucket = bucket;
            }
        }
        self.emit(out, view, segment_start..n, tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_index_is_first_exceeding_bound() {
        assert_eq!(bucket_index(&SPEED_BOUNDS_KM_PER_H, 0.0).unwrap(), 0);
        assert_eq!(bucket_index(&SPEED_BOUNDS_KM_PER_H, 14.9).unwrap(), 0);
        // Bounds are exclusive: a value sitting on a bound belongs above it.
        assert_eq!(bucket_index(&SPEED_BOUNDS_KM_PER_H, 15.0).unwrap(), 1);
        assert_eq!(bucket_index(&SPEED_BOUNDS_KM_PER_H, 250.0).unwrap(), 5);
        assert_eq!(bucket_index(&ACCELERATION_BOUNDS_M_PER_S2, -2.0).unwrap(), 0);
        assert_eq!(bucket_index(&ACCELERATION_BOUNDS_M_PER_S2, 0.0).unwrap(), 1);
    }

    #[test]
    fn test_bucket_index_rejects_non_finite_values() {
        assert!(bucket_index(&SPEED_BOUNDS_KM_PER_H, f64::NAN).is_err());
        assert!(bucket_index(&SPEED_BOUNDS_KM_PER_H, f64::INFINITY).is_err());
    }
}

