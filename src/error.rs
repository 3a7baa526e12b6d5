//! Unified error handling for the trace-to-segment pipeline.
//!
//! Every fallible operation in the crate returns [`Result`]. Errors are split
//! along the pipeline stages that raise them: file/naming errors from the
//! loader, map-lookup and trace-consistency errors from the cleaner and
//! converter, kinematics errors from the filler, and strategy errors from the
//! segmenter. All of them are fatal for the pipeline; recoverable conditions
//! (a candidate below the minimum tick count, a truncated window) are log
//! notes, not errors.

use std::path::PathBuf;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SegmentationError>;

#[derive(Debug, Error)]
pub enum SegmentationError {
    /// A file name matches neither the static- nor the dynamic-data convention.
    #[error("unknown filename format: {name:?}")]
    UnknownFilenameFormat { name: String },

    /// A seed was requested from a static-data file name.
    #[error("{name:?} is not a dynamic-data file and carries no seed")]
    NotADynamicFile { name: String },

    /// Only `.json` and `.zip` trace documents are accepted.
    #[error("unsupported extension {extension:?}, expected .json or .zip")]
    UnsupportedExtension { extension: String },

    #[error("path not found: {}", path.display())]
    PathNotFound { path: PathBuf },

    #[error("path is a directory, expected a trace document: {}", path.display())]
    PathIsDirectory { path: PathBuf },

    /// A raw actor position references a lane the road network does not contain.
    #[error("unknown lane {lane_id} on road {road_id}")]
    UnknownLane { road_id: i64, lane_id: i32 },

    /// A lookup referenced a road the network does not contain.
    #[error("unknown road {road_id}")]
    UnknownRoad { road_id: i64 },

    /// The dynamic document contradicts itself (e.g. a vehicle that has a lane
    /// progression entry but no raw position on that tick).
    #[error("inconsistent trace: {detail}")]
    InconsistentTrace { detail: String },

    /// An actor id resolved to different actor kinds on consecutive ticks.
    #[error("actor {actor_id} changed kind between consecutive ticks")]
    TypeMismatch { actor_id: u64 },

    /// Tick timestamps must be monotonically non-decreasing.
    #[error("time order violation: tick at {current}s follows tick at {previous}s")]
    TimeOrderViolation { previous: f64, current: f64 },

    /// The configured strategy name is not part of the strategy family.
    #[error("unsupported segmentation strategy {name:?}")]
    UnsupportedStrategy { name: String },

    /// Input the segmenter cannot bucket or slice (NaN kinematics, ego-less ticks).
    #[error("unsupported input: {detail}")]
    UnsupportedInput { detail: String },

    /// A strategy needs a configuration option that was not provided.
    #[error("missing configuration option {option}")]
    MissingConfiguration { option: &'static str },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

impl SegmentationError {
    /// Short stable tag for log lines and diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            SegmentationError::UnknownFilenameFormat { .. } => "unknown_filename_format",
            SegmentationError::NotADynamicFile { .. } => "not_a_dynamic_file",
            SegmentationError::UnsupportedExtension { .. } => "unsupported_extension",
            SegmentationError::PathNotFound { .. } => "path_not_found",
            SegmentationError::PathIsDirectory { .. } => "path_is_directory",
            SegmentationError::UnknownLane { .. } => "unknown_lane",
            SegmentationError::UnknownRoad { .. } => "unknown_road",
            SegmentationError::InconsistentTrace { .. } => "inconsistent_trace",
            SegmentationError::TypeMismatch { .. } => "type_mismatch",
            SegmentationError::TimeOrderViolation { .. } => "time_order_violation",
            SegmentationError::UnsupportedStrategy { .. } => "unsupported_strategy",
            SegmentationError::UnsupportedInput { .. } => "unsupported_input",
            SegmentationError::MissingConfiguration { .. } => "missing_configuration",
            SegmentationError::Io(_) => "io",
            SegmentationError::Json(_) => "json",
            SegmentationError::Zip(_) => "zip",
        }
    }
}
