//! Pipeline throughput counters.
//!
//! One process-wide atomics struct, created at pipeline start and torn down
//! with the stream. Counters are updated on every channel push and pop; the
//! status task renders a snapshot once per second.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct PipelineMetrics {
    read_simulation_runs: Arc<AtomicU64>,
    simulation_runs_buffer: Arc<AtomicU64>,
    sliced_simulation_runs: Arc<AtomicU64>,
    segments_buffer: Arc<AtomicU64>,
    finished: Arc<AtomicBool>,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run_read(&self) {
        self.read_simulation_runs.fetch_add(1, Ordering::Relaxed);
        self.simulation_runs_buffer.fetch_add(1, Ordering::Relaxed);
    }

    pub fn run_popped(&self) {
        self.simulation_runs_buffer.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn run_sliced(&self) {
        self.sliced_simulation_runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn segment_pushed(&self) {
        self.segments_buffer.fetch_add(1, Ordering::Relaxed);
    }

    pub fn segment_popped(&self) {
        self.segments_buffer.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn set_finished(&self) {
        self.finished.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            read_simulation_runs: self.read_simulation_runs.load(Ordering::Relaxed),
            simulation_runs_buffer: self.simulation_runs_buffer.load(Ordering::Relaxed),
            sliced_simulation_runs: self.sliced_simulation_runs.load(Ordering::Relaxed),
            segments_buffer: self.segments_buffer.load(Ordering::Relaxed),
            is_finished: self.is_finished(),
        }
    }
}

/// Point-in-time view of the pipeline counters.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricsSnapshot {
    pub read_simulation_runs: u64,
    pub simulation_runs_buffer: u64,
    pub sliced_simulation_runs: u64,
    pub segments_buffer: u64,
    pub is_finished: bool,
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "read={} buffered_runs={} sliced={} buffered_segments={} finished={}",
            self.read_simulation_runs,
            self.simulation_runs_buffer,
            self.sliced_simulation_runs,
            self.segments_buffer,
            self.is_finished
        )
    }
}
