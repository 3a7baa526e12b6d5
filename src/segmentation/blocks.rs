//! Block-anchored strategies.
//!
//! These strategies first partition the run into maximal contiguous stretches
//! where the ego stays inside one map block, then either emit the stretches
//! directly (`by_block`) or subdivide them. With `add_junctions` a block that
//! contains a junction tick is inviolable: it is emitted whole and never
//! subdivided.

use std::ops::Range;

use super::{RunView, Segmenter};
use crate::error::Result;
use crate::Segment;

/// Maximal contiguous index ranges with a constant ego block id.
pub(super) fn block_ranges(view: &RunView) -> Result<Vec<Range<usize>>> {
    let n = view.len();
    let mut ranges = Vec::new();
    if n == 0 {
        return Ok(ranges);
    }
    let mut start = 0;
    let mut current = view.block_id_at(0)?;
    for i in 1..n {
        let block = view.block_id_at(i)?;
        if block != current {
            ranges.push(start..i);
            start = i;
            current = block;
        }
    }
    ranges.push(start..n);
    Ok(ranges)
}

impl Segmenter {
    pub(super) fn by_block(&mut self, view: &RunView, out: &mut Vec<Segment>) -> Result<()> {
        for range in block_ranges(view)? {
            self.emit(out, view, range, "by_block")?;
        }
        Ok(())
    }

    pub(super) fn even_size(
        &mut self,
        view: &RunView,
        out: &mut Vec<Segment>,
        segment_count: usize,
        add_junctions: bool,
    ) -> Result<()> {
        const TAG: &str = "even_size";
        let parts = segment_count.max(1);
        for range in block_ranges(view)? {
            if add_junctions && view.range_has_junction(range.clone())? {
                self.emit(out, view, range, TAG)?;
                continue;
            }
            let len = range.len();
            let size = len / parts;
            if size == 0 {
                self.emit(out, view, range, TAG)?;
                continue;
            }
            for part in 0..parts {
                let start = range.start + part * size;
                let end = if part == parts - 1 {
                    range.end
                } else {
                    range.start + (part + 1) * size
                };
                self.emit(out, view, start..end, TAG)?;
            }
        }
        Ok(())
    }

    pub(super) fn by_length(
        &mut self,
        view: &RunView,
        out: &mut Vec<Segment>,
        length_meters: f64,
        add_junctions: bool,
    ) -> Result<()> {
        const TAG: &str = "by_length";
        for range in block_ranges(view)? {
            if add_junctions && view.range_has_junction(range.clone())? {
                self.emit(out, view, range, TAG)?;
                continue;
            }
            let mut segment_start = range.start;
            let mut accumulated = 0.0;
            for i in range.start + 1..range.end {
                let previous = view.ego(i - 1)?;
                let current = view.ego(i)?;
                accumulated += (current.position_on_lane - previous.position_on_lane).abs();
                if accumulated >= length_meters {
                    self.emit(out, view, segment_start..i + 1, TAG)?;
                    segment_start = i + 1;
                    accumulated = 0.0;
                }
            }
            self.emit(out, view, segment_start..range.end, TAG)?;
        }
        Ok(())
    }

    pub(super) fn by_ticks(
        &mut self,
        view: &RunView,
        out: &mut Vec<Segment>,
        tick_count: usize,
        add_junctions: bool,
    ) -> Result<()> {
        const TAG: &str = "by_ticks";
        let size = tick_count.max(1);
        for range in block_ranges(view)? {
            if add_junctions && view.range_has_junction(range.clone())? {
                self.emit(out, view, range, TAG)?;
                continue;
            }
            let parts = (range.len() / size).max(1);
            for part in 0..parts {
                let start = range.start + part * size;
                let end = if part == parts - 1 {
                    range.end
                } else {
                    range.start + (part + 1) * size
                };
                self.emit(out, view, start..end, TAG)?;
            }
        }
        Ok(())
    }

    pub(super) fn by_speed_limits(
        &mut self,
        view: &RunView,
        out: &mut Vec<Segment>,
        add_junctions: bool,
    ) -> Result<()> {
        const TAG: &str = "by_speed_limits";
        for range in block_ranges(view)? {
            if add_junctions && view.range_has_junction(range.clone())? {
                self.emit(out, view, range, TAG)?;
                continue;
            }
            let mut segment_start = range.start;
            let mut current_limit = view.speed_limit_at(range.start)?;
            for i in range.start + 1..range.end {
                let limit = view.speed_limit_at(i)?;
                if limit != current_limit {
                    self.emit(out, view, segment_start..i, TAG)?;
                    segment_start = i;
                    current_limit = limit;
                }
            }
            self.emit(out, view, segment_start..range.end, TAG)?;
        }
        Ok(())
    }

    pub(super) fn sliding_window_by_block(
        &mut self,
        view: &RunView,
        out: &mut Vec<Segment>,
        window_ticks: usize,
        step_ticks: usize,
        add_junctions: bool,
    ) -> Result<()> {
        const TAG: &str = "sliding_window_by_block";
        let window = window_ticks.max(1);
        let step = step_ticks.max(1);
        for range in block_ranges(view)? {
            if add_junctions && view.range_has_junction(range.clone())? {
                self.emit(out, view, range, TAG)?;
                continue;
            }
            if range.len() < window {
                self.emit(out, view, range, TAG)?;
                continue;
            }
            let mut i = 0;
            while i + window <= range.len() {
                self.emit(out, view, range.start + i..range.start + i + window, TAG)?;
                i += step;
            }
        }
        Ok(())
    }
}
