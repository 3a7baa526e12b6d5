//! Distance oracle over ego paths.
//!
//! Metre-based strategies need to translate a distance budget into tick
//! indices. Per-step distance follows the ego's lane geometry while it stays
//! on one road (the difference of its positions on the lane) and falls back
//! to the euclidean distance between world locations across road changes.

use crate::error::{Result, SegmentationError};
use crate::{TickData, Vehicle};

fn ego_at(ticks: &[TickData], index: usize) -> Result<&Vehicle> {
    ticks[index]
        .ego()
        .ok_or_else(|| SegmentationError::UnsupportedInput {
            detail: format!("tick index {} carries no ego vehicle", index),
        })
}

/// Walk forward from `start` until the accumulated ego path length reaches
/// `meters`.
///
/// Returns the first index whose accumulated distance meets the budget
/// together with the distance actually covered; when the run ends first, the
/// last index and the accumulated remainder are returned.
pub fn index_at_distance(ticks: &[TickData], start: usize, meters: f64) -> Result<(usize, f64)> {
    let mut accumulated = 0.0;
    for i in (start + 1)..ticks.len() {
        let previous = ego_at(ticks, i - 1)?;
        let current = ego_at(ticks, i)?;
        let step = if current.lane.road_ref() == previous.lane.road_ref() {
            (current.position_on_lane - previous.position_on_lane).abs()
        } else {
            current.location.distance_to(previous.location)
        };
        accumulated += step;
        if accumulated >= meters {
            return Ok((i, accumulated));
        }
    }
    Ok((ticks.len().saturating_sub(1), accumulated))
}

/// The latest index from which `meters` of remaining ego path exist,
/// measured as euclidean distance between successive locations towards the
/// final tick. Returns 0 when the whole run is shorter than the budget.
pub fn last_valid_start(ticks: &[TickData], meters: f64) -> Result<usize> {
    if ticks.len() < 2 {
        return Ok(0);
    }
    let mut accumulated = 0.0;
    for i in (1..ticks.len()).rev() {
        let earlier = ego_at(ticks, i - 1)?;
        let later = ego_at(ticks, i)?;
        accumulated += earlier.location.distance_to(later.location);
        if accumulated >= meters {
            return Ok(i - 1);
        }
    }
    Ok(0)
}
