//! # Segmentation Strategy Family
//!
//! Cuts a cleaned, converted, kinematically complete timeline into
//! [`Segment`]s under one strategy from a closed family:
//!
//! 1. Fixed windows - a constant number of ticks or metres of ego path
//! 2. Dynamic windows - window length adapts to ego speed and acceleration
//! 3. Sliding windows - overlapping passes, multi-start and randomised variants
//! 4. Block strategies - cuts anchored at the static map's block structure
//! 5. Event strategies - cuts where a tracked scalar crosses a bucket boundary
//!
//! All strategies share the same post-conditions: segments own deep copies of
//! their tick slices, non-junction candidates below the configured minimum
//! tick count are dropped (logged, never an error), and strategies honouring
//! `add_junctions` never subdivide a block that contains a junction.
//!
//! ## Junction extension
//!
//! Fixed and dynamic windows are extended across junction boundaries: a
//! window starting on a junction road is prepended with the contiguous
//! junction ticks before it, and one ending on a junction road is appended
//! with the contiguous junction ticks after it, so no emitted window begins
//! or ends mid-junction traversal.

mod blocks;
pub mod distance;
mod events;
mod windows;

pub use distance::{index_at_distance, last_valid_start};

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::ops::Range;

use crate::error::{Result, SegmentationError};
use crate::{Segment, SegmentationConfig, SimulationRun, TickData, Vehicle};

/// The closed family of segmentation strategies.
///
/// Every variant carries its own parameters; dispatch happens in one place
/// ([`Segmenter::segment_run`]). [`SegmentationStrategy::from_config`] builds
/// a variant from the string-keyed configuration surface.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentationStrategy {
    /// Fixed windows of `window_ticks`, advancing by `step_ticks`; the tail
    /// window is anchored to the end of the run.
    StaticSegmentLengthTicks { window_ticks: usize, step_ticks: usize },
    /// Fixed windows covering `window_meters` of ego path, advancing by ticks
    /// covering `step_meters`; the remainder past the last valid start is
    /// emitted as a final segment.
    StaticSegmentLengthMeters { window_meters: f64, step_meters: f64 },
    /// Window metres grow linearly with ego speed.
    DynamicSegmentLengthSpeed { step_meters: f64 },
    /// Window metres grow quadratically with ego acceleration.
    DynamicSegmentLengthAcceleration { step_meters: f64 },
    /// Braking-distance styled combination of speed and acceleration.
    DynamicSegmentLengthSpeedAcceleration1 { step_meters: f64 },
    /// Alternative speed/acceleration combination with linear terms.
    DynamicSegmentLengthSpeedAcceleration2 { step_meters: f64 },
    /// One metre-window pass per size in {60, 65, 70, 75, 80} m.
    SlidingWindowMultistartMeters { overlap_percent: f64 },
    /// One tick-window pass per size in {100, 110, 120, 130, 140} ticks.
    SlidingWindowMultistartTicks { overlap_percent: f64 },
    /// Maximal contiguous runs of constant ego block.
    ByBlock,
    /// The whole run as a single segment.
    None,
    /// Each block split into `segment_count` equal parts, the last absorbing
    /// the remainder.
    EvenSize {
        segment_count: usize,
        add_junctions: bool,
    },
    /// Cut a block whenever the accumulated ego lane displacement reaches
    /// `length_meters`.
    ByLength {
        length_meters: f64,
        add_junctions: bool,
    },
    /// Cut a block every `tick_count` ticks, the last part absorbing the
    /// remainder.
    ByTicks {
        tick_count: usize,
        add_junctions: bool,
    },
    /// Cut a block wherever the applicable speed limit of the ego lane changes.
    BySpeedLimits { add_junctions: bool },
    /// Cut the run when ego speed crosses a bucket boundary.
    ByDynamicSpeed,
    /// Cut the run when ego acceleration crosses a bucket boundary.
    ByDynamicAcceleration,
    /// Cut the run when the vehicle count in the ego's block crosses a bucket
    /// boundary.
    ByDynamicTrafficDensity,
    /// Cut the run when "a pedestrian is on a driving lane within 30 m of the
    /// ego" flips.
    ByDynamicPedestrianProximity,
    /// Emit a context window around every ego lane change.
    ByDynamicLaneChanges,
    /// Union of the block strategy, all event strategies, and a half-overlap
    /// sliding window; overlapping output is intentional.
    ByDynamicVariables { add_junctions: bool },
    /// Plain tick sliding window.
    SlidingWindow {
        window_ticks: usize,
        step_ticks: usize,
        add_junctions: bool,
    },
    /// Metre sliding window.
    SlidingWindowMeters {
        window_meters: f64,
        step_meters: f64,
        add_junctions: bool,
    },
    /// Tick sliding window constrained inside each block.
    SlidingWindowByBlock {
        window_ticks: usize,
        step_ticks: usize,
        add_junctions: bool,
    },
    /// Five passes with window sizes n, n/2, n/4, n/8, n/16.
    SlidingWindowHalving,
    /// Tick sliding window with a quarter-window step.
    SlidingWindowHalfOverlap {
        window_ticks: usize,
        add_junctions: bool,
    },
    /// Sliding window whose size is sampled per window from {60..80} ticks.
    SlidingWindowRotating {
        step_ticks: usize,
        add_junctions: bool,
    },
    /// Sliding window whose size follows the current traffic-density bucket.
    SlidingWindowByTrafficDensity {
        step_ticks: usize,
        add_junctions: bool,
    },
}

impl SegmentationStrategy {
    /// Stable strategy name, used as segment provenance tag and as the
    /// configuration key.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StaticSegmentLengthTicks { .. } => "static_segment_length_ticks",
            Self::StaticSegmentLengthMeters { .. } => "static_segment_length_meters",
            Self::DynamicSegmentLengthSpeed { .. } => "dynamic_segment_length_meters_speed",
            Self::DynamicSegmentLengthAcceleration { .. } => {
                "dynamic_segment_length_meters_acceleration"
            }
            Self::DynamicSegmentLengthSpeedAcceleration1 { .. } => {
                "dynamic_segment_length_meters_speed_acceleration_1"
            }
            Self::DynamicSegmentLengthSpeedAcceleration2 { .. } => {
                "dynamic_segment_length_meters_speed_acceleration_2"
            }
            Self::SlidingWindowMultistartMeters { .. } => "sliding_window_multistart_meters",
            Self::SlidingWindowMultistartTicks { .. } => "sliding_window_multistart_ticks",
            Self::ByBlock => "by_block",
            Self::None => "none",
            Self::EvenSize { .. } => "even_size",
            Self::ByLength { .. } => "by_length",
            Self::ByTicks { .. } => "by_ticks",
            Self::BySpeedLimits { .. } => "by_speed_limits",
            Self::ByDynamicSpeed => "by_dynamic_speed",
            Self::ByDynamicAcceleration => "by_dynamic_acceleration",
            Self::ByDynamicTrafficDensity => "by_dynamic_traffic_density",
            Self::ByDynamicPedestrianProximity => "by_dynamic_pedestrian_proximity",
            Self::ByDynamicLaneChanges => "by_dynamic_lane_changes",
            Self::ByDynamicVariables { .. } => "by_dynamic_variables",
            Self::SlidingWindow { .. } => "sliding_window",
            Self::SlidingWindowMeters { .. } => "sliding_window_meters",
            Self::SlidingWindowByBlock { .. } => "sliding_window_by_block",
            Self::SlidingWindowHalving => "sliding_window_halving",
            Self::SlidingWindowHalfOverlap { .. } => "sliding_window_half_overlap",
            Self::SlidingWindowRotating { .. } => "sliding_window_rotating",
            Self::SlidingWindowByTrafficDensity { .. } => "sliding_window_by_traffic_density",
        }
    }

    /// The dynamic-length strategies require a configured maximum segment
    /// tick count to truncate against.
    pub fn requires_max_tick_count(&self) -> bool {
        matches!(
            self,
            Self::DynamicSegmentLengthSpeed { .. }
                | Self::DynamicSegmentLengthAcceleration { .. }
                | Self::DynamicSegmentLengthSpeedAcceleration1 { .. }
                | Self::DynamicSegmentLengthSpeedAcceleration2 { .. }
        )
    }

    /// Build a strategy from the string-keyed configuration surface
    /// (`segmentation_type` + `value` + `secondary_value` + `add_junctions`).
    ///
    /// Unknown kind names fail with
    /// [`SegmentationError::UnsupportedStrategy`]; a missing parameter fails
    /// with [`SegmentationError::MissingConfiguration`].
    pub fn from_config(
        kind: &str,
        value: Option<f64>,
        secondary_value: Option<f64>,
        add_junctions: bool,
    ) -> Result<Self> {
        let primary = || {
            value.ok_or(SegmentationError::MissingConfiguration { option: "value" })
        };
        let secondary = || {
            secondary_value.ok_or(SegmentationError::MissingConfiguration {
                option: "secondaryValue",
            })
        };

        let strategy = match kind.to_lowercase().as_str() {
            "static_segment_length_ticks" => Self::StaticSegmentLengthTicks {
                window_ticks: primary()? as usize,
                step_ticks: secondary()? as usize,
            },
            "static_segment_length_meters" => Self::StaticSegmentLengthMeters {
                window_meters: primary()?,
                step_meters: secondary()?,
            },
            "dynamic_segment_length_meters_speed" => Self::DynamicSegmentLengthSpeed {
                step_meters: primary()?,
            },
            "dynamic_segment_length_meters_acceleration" => {
                Self::DynamicSegmentLengthAcceleration {
                    step_meters: primary()?,
                }
            }
            "dynamic_segment_length_meters_speed_acceleration_1" => {
                Self::DynamicSegmentLengthSpeedAcceleration1 {
                    step_meters: primary()?,
                }
            }
            "dynamic_segment_length_meters_speed_acceleration_2" => {
                Self::DynamicSegmentLengthSpeedAcceleration2 {
                    step_meters: primary()?,
                }
            }
            "sliding_window_multistart_meters" => Self::SlidingWindowMultistartMeters {
                overlap_percent: primary()?,
            },
            "sliding_window_multistart_ticks" => Self::SlidingWindowMultistartTicks {
                overlap_percent: primary()?,
            },
            "by_block" => Self::ByBlock,
            "none" => Self::None,
            "even_size" => Self::EvenSize {
                segment_count: primary()? as usize,
                add_junctions,
            },
            "by_length" => Self::ByLength {
                length_meters: primary()?,
                add_junctions,
            },
            "by_ticks" => Self::ByTicks {
                tick_count: primary()? as usize,
                add_junctions,
            },
            "by_speed_limits" => Self::BySpeedLimits { add_junctions },
            "by_dynamic_speed" => Self::ByDynamicSpeed,
            "by_dynamic_acceleration" => Self::ByDynamicAcceleration,
            "by_dynamic_traffic_density" => Self::ByDynamicTrafficDensity,
            "by_dynamic_pedestrian_proximity" => Self::ByDynamicPedestrianProximity,
            "by_dynamic_lane_changes" => Self::ByDynamicLaneChanges,
            "by_dynamic_variables" => Self::ByDynamicVariables { add_junctions },
            "sliding_window" => Self::SlidingWindow {
                window_ticks: primary()? as usize,
                step_ticks: secondary()? as usize,
                add_junctions,
            },
            "sliding_window_meters" => Self::SlidingWindowMeters {
                window_meters: primary()?,
                step_meters: secondary()?,
                add_junctions,
            },
            "sliding_window_by_block" => Self::SlidingWindowByBlock {
                window_ticks: primary()? as usize,
                step_ticks: secondary()? as usize,
                add_junctions,
            },
            "sliding_window_halving" => Self::SlidingWindowHalving,
            "sliding_window_half_overlap" => Self::SlidingWindowHalfOverlap {
                window_ticks: primary()? as usize,
                add_junctions,
            },
            "sliding_window_rotating" => Self::SlidingWindowRotating {
                step_ticks: primary()? as usize,
                add_junctions,
            },
            "sliding_window_by_traffic_density" => Self::SlidingWindowByTrafficDensity {
                step_ticks: primary()? as usize,
                add_junctions,
            },
            other => {
                return Err(SegmentationError::UnsupportedStrategy {
                    name: other.to_string(),
                })
            }
        };
        Ok(strategy)
    }
}

impl std::fmt::Display for SegmentationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Borrowed view over one run, shared by all strategy implementations.
pub(crate) struct RunView<'a> {
    pub ticks: &'a [TickData],
    pub run_id: &'a str,
}

impl<'a> RunView<'a> {
    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    /// The ego vehicle at a tick index. Converted timelines always carry one;
    /// its absence means the caller fed an untagged timeline.
    pub fn ego(&self, index: usize) -> Result<&'a Vehicle> {
        self.ticks[index]
            .ego()
            .ok_or_else(|| SegmentationError::UnsupportedInput {
                detail: format!("tick index {} carries no ego vehicle", index),
            })
    }

    /// Whether the ego's road at a tick index is a junction road.
    pub fn is_junction_at(&self, index: usize) -> Result<bool> {
        let ego = self.ego(index)?;
        Ok(self.ticks[index]
            .network()
            .road_of_lane(ego.lane)
            .is_junction)
    }

    /// Block id of the ego's road at a tick index.
    pub fn block_id_at(&self, index: usize) -> Result<&'a str> {
        let ego = self.ego(index)?;
        Ok(self.ticks[index].network().block_id(ego.lane.road_ref()))
    }

    /// Applicable speed limit of the ego's lane at a tick index.
    pub fn speed_limit_at(&self, index: usize) -> Result<Option<f64>> {
        let ego = self.ego(index)?;
        Ok(self.ticks[index].network().lane(ego.lane).speed_limit)
    }

    pub fn range_has_junction(&self, range: Range<usize>) -> Result<bool> {
        for i in range {
            if self.is_junction_at(i)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Applies one strategy to converted runs.
///
/// The segmenter owns the drop/truncation limits and the RNG used by the
/// randomised window strategies, so a fixed seed reproduces the exact same
/// segmentation.
pub struct Segmenter {
    strategy: SegmentationStrategy,
    min_segment_tick_count: usize,
    max_segment_tick_count: Option<usize>,
    rng: StdRng,
}

impl Segmenter {
    /// Build a segmenter for one strategy, validating that the strategy's
    /// required limits are configured.
    pub fn new(strategy: SegmentationStrategy, config: &SegmentationConfig) -> Result<Self> {
        if strategy.requires_max_tick_count() && config.max_segment_tick_count.is_none() {
            return Err(SegmentationError::MissingConfiguration {
                option: "maxSegmentTickCount",
            });
        }
        Ok(Self {
            strategy,
            min_segment_tick_count: config.min_segment_tick_count,
            max_segment_tick_count: config.max_segment_tick_count,
            rng: StdRng::seed_from_u64(config.rng_seed),
        })
    }

    /// Build a segmenter using the strategy configured in `config`.
    pub fn for_config(config: &SegmentationConfig) -> Result<Self> {
        Self::new(config.strategy.clone(), config)
    }

    pub fn strategy(&self) -> &SegmentationStrategy {
        &self.strategy
    }

    /// Cut one run into segments. An empty run yields an empty list.
    pub fn segment_run(&mut self, run: &SimulationRun) -> Result<Vec<Segment>> {
        let mut out = Vec::new();
        if run.ticks.is_empty() {
            return Ok(out);
        }
        let view = RunView {
            ticks: &run.ticks,
            run_id: &run.simulation_run_id,
        };
        let strategy = self.strategy.clone();
        self.apply(strategy, &view, &mut out)?;
        Ok(out)
    }

    pub(crate) fn apply(
        &mut self,
        strategy: SegmentationStrategy,
        view: &RunView,
        out: &mut Vec<Segment>,
    ) -> Result<()> {
        use SegmentationStrategy as S;
        match strategy {
            S::StaticSegmentLengthTicks {
                window_ticks,
                step_ticks,
            } => self.static_length_ticks(view, out, window_ticks, step_ticks),
            S::StaticSegmentLengthMeters {
                window_meters,
                step_meters,
            } => self.static_length_meters(view, out, window_meters, step_meters),
            S::DynamicSegmentLengthSpeed { step_meters }
            | S::DynamicSegmentLengthAcceleration { step_meters }
            | S::DynamicSegmentLengthSpeedAcceleration1 { step_meters }
            | S::DynamicSegmentLengthSpeedAcceleration2 { step_meters } => {
                self.dynamic_length_meters(view, out, &strategy, step_meters)
            }
            S::SlidingWindowMultistartMeters { overlap_percent } => {
                self.multistart_meters(view, out, overlap_percent)
            }
            S::SlidingWindowMultistartTicks { overlap_percent } => {
                self.multistart_ticks(view, out, overlap_percent)
            }
            S::ByBlock => self.by_block(view, out),
            S::None => self.emit(out, view, 0..view.len(), "none"),
            S::EvenSize {
                segment_count,
                add_junctions,
            } => self.even_size(view, out, segment_count, add_junctions),
            S::ByLength {
                length_meters,
                add_junctions,
            } => self.by_length(view, out, length_meters, add_junctions),
            S::ByTicks {
                tick_count,
                add_junctions,
            } => self.by_ticks(view, out, tick_count, add_junctions),
            S::BySpeedLimits { add_junctions } => self.by_speed_limits(view, out, add_junctions),
            S::ByDynamicSpeed => self.by_dynamic_speed(view, out),
            S::ByDynamicAcceleration => self.by_dynamic_acceleration(view, out),
            S::ByDynamicTrafficDensity => self.by_dynamic_traffic_density(view, out),
            S::ByDynamicPedestrianProximity => self.by_dynamic_pedestrian_proximity(view, out),
            S::ByDynamicLaneChanges => self.by_dynamic_lane_changes(view, out),
            S::ByDynamicVariables { add_junctions } => {
                self.by_dynamic_variables(view, out, add_junctions)
            }
            S::SlidingWindow {
                window_ticks,
                step_ticks,
                add_junctions,
            } => self.sliding_window(view, out, window_ticks, step_ticks, add_junctions),
            S::SlidingWindowMeters {
                window_meters,
                step_meters,
                add_junctions,
            } => self.sliding_window_meters(view, out, window_meters, step_meters, add_junctions),
            S::SlidingWindowByBlock {
                window_ticks,
                step_ticks,
                add_junctions,
            } => self.sliding_window_by_block(view, out, window_ticks, step_ticks, add_junctions),
            S::SlidingWindowHalving => self.sliding_window_halving(view, out),
            S::SlidingWindowHalfOverlap {
                window_ticks,
                add_junctions,
            } => self.sliding_window_half_overlap(view, out, window_ticks, add_junctions),
            S::SlidingWindowRotating {
                step_ticks,
                add_junctions,
            } => self.sliding_window_rotating(view, out, step_ticks, add_junctions),
            S::SlidingWindowByTrafficDensity {
                step_ticks,
                add_junctions,
            } => self.sliding_window_by_traffic_density(view, out, step_ticks, add_junctions),
        }
    }

    /// Emit one segment candidate as a deep copy of its tick slice.
    ///
    /// Empty candidates are silently skipped; non-junction candidates below
    /// the minimum tick count are dropped with a log note.
    pub(crate) fn emit(
        &self,
        out: &mut Vec<Segment>,
        view: &RunView,
        range: Range<usize>,
        tag: &'static str,
    ) -> Result<()> {
        if range.is_empty() {
            return Ok(());
        }
        if range.len() < self.min_segment_tick_count && !view.range_has_junction(range.clone())? {
            log::debug!(
                "[Segmenter] dropping {} candidate of {} ticks (minimum {})",
                tag,
                range.len(),
                self.min_segment_tick_count
            );
            return Ok(());
        }
        out.push(Segment {
            tick_data: view.ticks[range].to_vec(),
            simulation_run_id: view.run_id.to_string(),
            segment_source: view.run_id.to_string(),
            segmentation_type: tag,
        });
        Ok(())
    }

    pub(crate) fn min_tick_count(&self) -> usize {
        self.min_segment_tick_count
    }

    pub(crate) fn max_tick_count(&self) -> Result<usize> {
        self.max_segment_tick_count
            .ok_or(SegmentationError::MissingConfiguration {
                option: "maxSegmentTickCount",
            })
    }

    pub(crate) fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Extend a tick window across junction boundaries: backwards over the
    /// contiguous junction ticks preceding a junction start, forwards over
    /// the contiguous junction ticks following a junction end. The forward
    /// scan starts one past the window's last tick.
    pub(crate) fn extended_tick_range(
        &self,
        view: &RunView,
        range: Range<usize>,
    ) -> Result<Range<usize>> {
        let mut start = range.start;
        if view.is_junction_at(start)? {
            while start > 0 && view.is_junction_at(start - 1)? {
                start -= 1;
            }
        }
        let mut end = range.end;
        if view.is_junction_at(range.end - 1)? {
            while end < view.len() && view.is_junction_at(end)? {
                end += 1;
            }
        }
        Ok(start..end)
    }
}
