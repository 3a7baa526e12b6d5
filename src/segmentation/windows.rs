//! Fixed, dynamic and sliding window strategies.
//!
//! Tick windows all run through one slide helper so the junction-extension
//! behaviour is identical everywhere; metre windows resolve their boundaries
//! through the distance oracle.

use rand::Rng;

use super::distance::{index_at_distance, last_valid_start};
use super::{blocks, events, RunView, SegmentationStrategy, Segmenter};
use crate::error::{Result, SegmentationError};
use crate::Segment;

/// Window sizes for the metre multi-start passes.
const MULTISTART_METER_SIZES: [f64; 5] = [60.0, 65.0, 70.0, 75.0, 80.0];
/// Window sizes for the tick multi-start passes.
const MULTISTART_TICK_SIZES: [usize; 5] = [100, 110, 120, 130, 140];
/// Window sizes sampled by the rotating strategy.
const ROTATION_TICK_SIZES: [usize; 5] = [60, 65, 70, 75, 80];
/// Window sizes keyed by traffic-density bucket.
const DENSITY_TICK_SIZES: [usize; 3] = [60, 70, 80];

impl Segmenter {
    pub(super) fn static_length_ticks(
        &mut self,
        view: &RunView,
        out: &mut Vec<Segment>,
        window_ticks: usize,
        step_ticks: usize,
    ) -> Result<()> {
        const TAG: &str = "static_segment_length_ticks";
        if window_ticks == 0 {
            return Ok(());
        }
        let n = view.len();
        let step = step_ticks.max(1);
        let mut i = 0;
        while i + window_ticks < n {
            let range = self.extended_tick_range(view, i..i + window_ticks)?;
            self.emit(out, view, range, TAG)?;
            i += step;
        }
        // The run end rarely lands on a step boundary; the final window is
        // anchored to the last tick instead and may overlap its predecessor.
        let tail_start = n.saturating_sub(window_ticks);
        let range = self.extended_tick_range(view, tail_start..n)?;
        self.emit(out, view, range, TAG)
    }

    pub(super) fn static_length_meters(
        &mut self,
        view: &RunView,
        out: &mut Vec<Segment>,
        window_meters: f64,
        step_meters: f64,
    ) -> Result<()> {
        const TAG: &str = "static_segment_length_meters";
        let n = view.len();
        let last_valid = last_valid_start(view.ticks, window_meters)?;
        let mut start = 0;
        while start <= last_valid && start < n {
            let (end, _) = index_at_distance(view.ticks, start, window_meters)?;
            let range = self.extended_tick_range(view, start..end + 1)?;
            self.emit(out, view, range, TAG)?;
            let (next, _) = index_at_distance(view.ticks, start, step_meters)?;
            start = next.max(start + 1);
        }
        if start < n {
            let range = self.extended_tick_range(view, start..n)?;
            self.emit(out, view, range, TAG)?;
        }
        Ok(())
    }

    pub(super) fn dynamic_length_meters(
        &mut self,
        view: &RunView,
        out: &mut Vec<Segment>,
        strategy: &SegmentationStrategy,
        step_meters: f64,
    ) -> Result<()> {
        let tag = strategy.name();
        let max_ticks = self.max_tick_count()?.max(1);
        let n = view.len();
        let mut start = 0;
        while start < n {
            let window_meters = dynamic_window_meters(strategy, view, start)?;
            let (mut end, _) = index_at_distance(view.ticks, start, window_meters)?;
            if end - start + 1 > max_ticks {
                log::debug!(
                    "[Segmenter] truncating {} window at tick {} to {} ticks",
                    tag,
                    start,
                    max_ticks
                );
                end = start + max_ticks - 1;
            }
            let range = self.extended_tick_range(view, start..end + 1)?;
            self.emit(out, view, range, tag)?;
            let (next, _) = index_at_distance(view.ticks, start, step_meters)?;
            start = next.max(start + 1);
        }
        Ok(())
    }

    pub(super) fn multistart_meters(
        &mut self,
        view: &RunView,
        out: &mut Vec<Segment>,
        overlap_percent: f64,
    ) -> Result<()> {
        const TAG: &str = "sliding_window_multistart_meters";
        let n = view.len();
        for size in MULTISTART_METER_SIZES {
            let step = (size * (1.0 - overlap_percent / 100.0)).max(1.0);
            let last_valid = last_valid_start(view.ticks, size)?;
            let mut start = 0;
            while start <= last_valid && start < n {
                let (end, _) = index_at_distance(view.ticks, start, size)?;
                self.emit(out, view, start..end + 1, TAG)?;
                let (next, _) = index_at_distance(view.ticks, start, step)?;
                start = next.max(start + 1);
            }
        }
        Ok(())
    }

    pub(super) fn multistart_ticks(
        &mut self,
        view: &RunView,
        out: &mut Vec<Segment>,
        overlap_percent: f64,
    ) -> Result<()> {
        const TAG: &str = "sliding_window_multistart_ticks";
        for size in MULTISTART_TICK_SIZES {
            let step = ((size as f64) * (1.0 - overlap_percent / 100.0)).max(1.0) as usize;
            self.slide_tick_windows(view, out, size, step, TAG)?;
        }
        Ok(())
    }

    pub(super) fn sliding_window(
        &mut self,
        view: &RunView,
        out: &mut Vec<Segment>,
        window_ticks: usize,
        step_ticks: usize,
        add_junctions: bool,
    ) -> Result<()> {
        const TAG: &str = "sliding_window";
        let window = window_ticks.max(self.min_tick_count());
        if add_junctions {
            self.prepend_junction_blocks(view, out, TAG)?;
        }
        self.slide_tick_windows(view, out, window, step_ticks, TAG)
    }

    pub(super) fn sliding_window_meters(
        &mut self,
        view: &RunView,
        out: &mut Vec<Segment>,
        window_meters: f64,
        step_meters: f64,
        add_junctions: bool,
    ) -> Result<()> {
        const TAG: &str = "sliding_window_meters";
        if add_junctions {
            self.prepend_junction_blocks(view, out, TAG)?;
        }
        let n = view.len();
        let last_valid = last_valid_start(view.ticks, window_meters)?;
        let mut start = 0;
        while start <= last_valid && start < n {
            let (end, _) = index_at_distance(view.ticks, start, window_meters)?;
            let range = self.extended_tick_range(view, start..end + 1)?;
            self.emit(out, view, range, TAG)?;
            let (next, _) = index_at_distance(view.ticks, start, step_meters)?;
            start = next.max(start + 1);
        }
        Ok(())
    }

    pub(super) fn sliding_window_halving(
        &mut self,
        view: &RunView,
        out: &mut Vec<Segment>,
    ) -> Result<()> {
        const TAG: &str = "sliding_window_halving";
        let mut size = view.len();
        for _ in 0..5 {
            if size == 0 {
                break;
            }
            if size < self.min_tick_count() {
                log::debug!(
                    "[Segmenter] skipping halving pass with window of {} ticks (minimum {})",
                    size,
                    self.min_tick_count()
                );
            } else {
                let step = (size / 10).max(1);
                self.slide_tick_windows(view, out, size, step, TAG)?;
            }
            size /= 2;
        }
        Ok(())
    }

    pub(super) fn sliding_window_half_overlap(
        &mut self,
        view: &RunView,
        out: &mut Vec<Segment>,
        window_ticks: usize,
        add_junctions: bool,
    ) -> Result<()> {
        const TAG: &str = "sliding_window_half_overlap";
        let window = window_ticks.max(self.min_tick_count());
        if add_junctions {
            self.prepend_junction_blocks(view, out, TAG)?;
        }
        let step = (window / 4).max(1);
        self.slide_tick_windows(view, out, window, step, TAG)
    }

    pub(super) fn sliding_window_rotating(
        &mut self,
        view: &RunView,
        out: &mut Vec<Segment>,
        step_ticks: usize,
        add_junctions: bool,
    ) -> Result<()> {
        const TAG: &str = "sliding_window_rotating";
        if add_junctions {
            self.prepend_junction_blocks(view, out, TAG)?;
        }
        let n = view.len();
        let step = step_ticks.max(1);
        let mut i = 0;
        loop {
            let size = ROTATION_TICK_SIZES[self.rng_mut().gen_range(0..ROTATION_TICK_SIZES.len())];
            if i + size > n {
                break;
            }
            let range = self.extended_tick_range(view, i..i + size)?;
            self.emit(out, view, range, TAG)?;
            i += step;
        }
        Ok(())
    }

    pub(super) fn sliding_window_by_traffic_density(
        &mut self,
        view: &RunView,
        out: &mut Vec<Segment>,
        step_ticks: usize,
        add_junctions: bool,
    ) -> Result<()> {
        const TAG: &str = "sliding_window_by_traffic_density";
        if add_junctions {
            self.prepend_junction_blocks(view, out, TAG)?;
        }
        let n = view.len();
        let step = step_ticks.max(1);
        let mut i = 0;
        while i < n {
            let bucket = events::traffic_density_bucket(view, i)?;
            let size = DENSITY_TICK_SIZES[bucket.min(DENSITY_TICK_SIZES.len() - 1)];
            if i + size > n {
                break;
            }
            let range = self.extended_tick_range(view, i..i + size)?;
            self.emit(out, view, range, TAG)?;
            i += step;
        }
        Ok(())
    }

    /// Shared tick-window slide: emits `[i, i + window)` for every step while
    /// the window fits, junction-extending each window.
    pub(super) fn slide_tick_windows(
        &mut self,
        view: &RunView,
        out: &mut Vec<Segment>,
        window_ticks: usize,
        step_ticks: usize,
        tag: &'static str,
    ) -> Result<()> {
        if window_ticks == 0 {
            return Ok(());
        }
        let n = view.len();
        let step = step_ticks.max(1);
        let mut i = 0;
        while i + window_ticks <= n {
            let range = self.extended_tick_range(view, i..i + window_ticks)?;
            self.emit(out, view, range, tag)?;
            i += step;
        }
        Ok(())
    }

    /// Emit every block that contains a junction tick, ahead of the window
    /// output of an `add_junctions` sliding strategy.
    pub(super) fn prepend_junction_blocks(
        &self,
        view: &RunView,
        out: &mut Vec<Segment>,
        tag: &'static str,
    ) -> Result<()> {
        for range in blocks::block_ranges(view)? {
            if view.range_has_junction(range.clone())? {
                self.emit(out, view, range, tag)?;
            }
        }
        Ok(())
    }
}

/// Window length in metres for a dynamic-length strategy at one tick.
fn dynamic_window_meters(
    strategy: &SegmentationStrategy,
    view: &RunView,
    index: usize,
) -> Result<f64> {
    let ego = view.ego(index)?;
    let speed = ego.eff_velocity_km_per_h();
    let acceleration = ego.eff_acceleration_m_per_s2();
    if !speed.is_finite() || !acceleration.is_finite() {
        return Err(SegmentationError::UnsupportedInput {
            detail: format!("non-finite ego kinematics at tick index {}", index),
        });
    }
    let meters = match strategy {
        SegmentationStrategy::DynamicSegmentLengthSpeed { .. } => {
            60.0 * (1.0 + speed / 300.0)
        }
        SegmentationStrategy::DynamicSegmentLengthAcceleration { .. } => {
            acceleration * acceleration + 60.0
        }
        SegmentationStrategy::DynamicSegmentLengthSpeedAcceleration1 { .. } => {
            // Braking-distance shape over a 1.2 s horizon.
            30.0 + (acceleration / 2.0) * 1.2 * 1.2 + speed * 1.2 + (speed / 10.0).powi(2) * 0.5
        }
        SegmentationStrategy::DynamicSegmentLengthSpeedAcceleration2 { .. } => {
            30.0 * (1.0 + speed / 30.0) + acceleration.abs() * 5.0
        }
        other => {
            return Err(SegmentationError::UnsupportedStrategy {
                name: other.name().to_string(),
            })
        }
    };
    Ok(meters)
}
