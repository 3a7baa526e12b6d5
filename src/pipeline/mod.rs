//! Bounded producer/consumer pipeline.
//!
//! Three cooperating workers chained by two typed channels:
//!
//! 1. **Loader** - iterates the map-grouped run descriptors (optionally
//!    reordered globally by simulation seed), decodes each dynamic document
//!    and pushes the raw tick list onto an unbounded internal channel. Pure
//!    blocking I/O.
//! 2. **Slicer** - pops raw runs, cleans junction labels, converts them into
//!    ego-tagged timelines, derives kinematics and segments them, pushing
//!    every segment onto a bounded channel. The channel capacity
//!    (`simulation_run_prefetch_size`) is the back-pressure knob: the slicer
//!    blocks once that many segments are outstanding.
//! 3. **Consumer** - the [`SegmentStream`] iterator handed to the caller.
//!
//! A fourth task logs the throughput counters once per second until the
//! pipeline finishes. Fatal errors in the loader or slicer log one terminal
//! diagnostic and close the stream; dropping the stream is the cancellation
//! signal (the workers observe the closed channel on their next send and
//! unwind).

pub mod files;
pub mod metrics;

pub use metrics::{MetricsSnapshot, PipelineMetrics};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::cleaning::clean_junction_labels;
use crate::convert::{convert_to_runs, fill_kinematics};
use crate::error::Result;
use crate::input::RawTick;
use crate::network::RoadNetwork;
use crate::segmentation::Segmenter;
use crate::{Segment, SegmentationConfig};

/// One map document together with the dynamic documents recorded on it.
#[derive(Debug, Clone)]
pub struct MapRuns {
    pub map_file: PathBuf,
    pub dynamic_files: Vec<PathBuf>,
}

struct RunDescriptor {
    map_file: PathBuf,
    dynamic_file: PathBuf,
}

struct RawRun {
    run_id: String,
    network: Arc<RoadNetwork>,
    ticks: Vec<RawTick>,
}

/// Lazy, finite stream of segments - the pipeline's only public product.
///
/// Iteration blocks on the bounded segment channel; the stream ends when the
/// workers have drained every configured file (or after a fatal error, which
/// is logged as a terminal diagnostic). Dropping the stream cancels the
/// pipeline.
pub struct SegmentStream {
    receiver: Receiver<Segment>,
    metrics: PipelineMetrics,
}

impl SegmentStream {
    /// Spin up the pipeline over the given map-grouped dynamic files.
    ///
    /// Configuration problems that would make every run fail (an unknown
    /// strategy parameterisation, seed ordering over unparseable file names)
    /// surface here; everything later is reported through the status task
    /// and stream termination.
    pub fn open(maps: Vec<MapRuns>, config: SegmentationConfig) -> Result<Self> {
        let segmenter = Segmenter::for_config(&config)?;
        let descriptors = build_descriptors(maps, &config)?;
        let metrics = PipelineMetrics::new();

        let (raw_tx, raw_rx) = unbounded::<RawRun>();
        let (segment_tx, segment_rx) = bounded::<Segment>(config.simulation_run_prefetch_size);

        let loader_metrics = metrics.clone();
        thread::Builder::new()
            .name("tracesegment-loader".into())
            .spawn(move || run_loader(descriptors, raw_tx, loader_metrics))?;

        let slicer_metrics = metrics.clone();
        let slicer_config = config.clone();
        thread::Builder::new()
            .name("tracesegment-slicer".into())
            .spawn(move || {
                run_slicer(raw_rx, segment_tx, slicer_config, segmenter, slicer_metrics)
            })?;

        let status_metrics = metrics.clone();
        thread::Builder::new()
            .name("tracesegment-status".into())
            .spawn(move || run_status(status_metrics))?;

        Ok(Self {
            receiver: segment_rx,
            metrics,
        })
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }
}

impl Iterator for SegmentStream {
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        match self.receiver.recv() {
            Ok(segment) => {
                self.metrics.segment_popped();
                Some(segment)
            }
            Err(_) => None,
        }
    }
}

impl Drop for SegmentStream {
    fn drop(&mut self) {
        // Cancellation: the workers observe the disconnected channels on
        // their next send; the status task observes the flag.
        self.metrics.set_finished();
    }
}

fn file_name_of(path: &PathBuf) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
}

fn build_descriptors(
    maps: Vec<MapRuns>,
    config: &SegmentationConfig,
) -> Result<Vec<RunDescriptor>> {
    let mut descriptors: Vec<RunDescriptor> = maps
        .into_iter()
        .flat_map(|group| {
            let map_file = group.map_file;
            group
                .dynamic_files
                .into_iter()
                .map(move |dynamic_file| RunDescriptor {
                    map_file: map_file.clone(),
                    dynamic_file,
                })
        })
        .collect();

    if config.order_files_by_seed {
        let mut keyed = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let seed = files::seed_of(file_name_of(&descriptor.dynamic_file))?;
            keyed.push((seed, descriptor));
        }
        keyed.sort_by_key(|(seed, _)| *seed);
        descriptors = keyed.into_iter().map(|(_, d)| d).collect();
    }
    Ok(descriptors)
}

fn run_loader(
    descriptors: Vec<RunDescriptor>,
    raw_tx: Sender<RawRun>,
    metrics: PipelineMetrics,
) {
    let mut networks: HashMap<PathBuf, Arc<RoadNetwork>> = HashMap::new();

    for descriptor in descriptors {
        let network = match networks.get(&descriptor.map_file) {
            Some(network) => Arc::clone(network),
            None => match files::load_blocks(&descriptor.map_file) {
                Ok(blocks) => {
                    let network = Arc::new(RoadNetwork::build(blocks));
                    networks.insert(descriptor.map_file.clone(), Arc::clone(&network));
                    network
                }
                Err(e) => {
                    log::error!(
                        "[Pipeline] loader terminated: map {} failed to load ({}): {}",
                        descriptor.map_file.display(),
                        e.kind(),
                        e
                    );
                    return;
                }
            },
        };

        let ticks = match files::load_raw_ticks(&descriptor.dynamic_file) {
            Ok(ticks) => ticks,
            Err(e) => {
                log::error!(
                    "[Pipeline] loader terminated: run {} failed to decode ({}): {}",
                    descriptor.dynamic_file.display(),
                    e.kind(),
                    e
                );
                return;
            }
        };

        let run_id = descriptor
            .dynamic_file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("test_case")
            .to_string();

        metrics.run_read();
        let raw_run = RawRun {
            run_id,
            network,
            ticks,
        };
        if raw_tx.send(raw_run).is_err() {
            // Consumer cancelled the stream.
            return;
        }
    }
}

fn run_slicer(
    raw_rx: Receiver<RawRun>,
    segment_tx: Sender<Segment>,
    config: SegmentationConfig,
    mut segmenter: Segmenter,
    metrics: PipelineMetrics,
) {
    for raw_run in raw_rx.iter() {
        metrics.run_popped();
        let run_id = raw_run.run_id.clone();
        match slice_run(raw_run, &config, &mut segmenter) {
            Ok(segments) => {
                for segment in segments {
                    metrics.segment_pushed();
                    if segment_tx.send(segment).is_err() {
                        // Consumer cancelled the stream.
                        metrics.set_finished();
                        return;
                    }
                }
                metrics.run_sliced();
            }
            Err(e) => {
                log::error!(
                    "[Pipeline] slicer terminated on run {} ({}): {}",
                    run_id,
                    e.kind(),
                    e
                );
                metrics.set_finished();
                return;
            }
        }
    }
    metrics.set_finished();
}

fn slice_run(
    raw_run: RawRun,
    config: &SegmentationConfig,
    segmenter: &mut Segmenter,
) -> Result<Vec<Segment>> {
    let RawRun {
        run_id,
        network,
        mut ticks,
    } = raw_run;

    clean_junction_labels(&mut ticks, &network)?;
    let runs = convert_to_runs(&ticks, &network, config.use_every_vehicle_as_ego, &run_id)?;

    let mut segments = Vec::new();
    for mut run in runs {
        fill_kinematics(&mut run)?;
        segments.extend(segmenter.segment_run(&run)?);
    }
    Ok(segments)
}

fn run_status(metrics: PipelineMetrics) {
    while !metrics.is_finished() {
        log::info!("[Pipeline] {}", metrics.snapshot());
        thread::sleep(Duration::from_secs(1));
    }
    log::info!("[Pipeline] {}", metrics.snapshot());
}
