//! End-to-end tests for the loader/slicer pipeline

use std::fs;
use std::io::Write;

use tempfile::TempDir;
use tracesegment::pipeline::{MapRuns, SegmentStream};
use tracesegment::synthetic::TraceScenario;
use tracesegment::{SegmentationConfig, SegmentationError, SegmentationStrategy};

fn write_scenario(dir: &TempDir, dynamic_name: &str) -> (std::path::PathBuf, std::path::PathBuf) {
    let scenario = TraceScenario::straight(30);
    let map_path = dir.path().join("map.json");
    fs::write(&map_path, serde_json::to_vec(&scenario.blocks()).unwrap()).unwrap();
    let dynamic_path = dir.path().join(dynamic_name);
    fs::write(
        &dynamic_path,
        serde_json::to_vec(&scenario.raw_ticks()).unwrap(),
    )
    .unwrap();
    (map_path, dynamic_path)
}

fn whole_run_config() -> SegmentationConfig {
    SegmentationConfig {
        strategy: SegmentationStrategy::None,
        ..SegmentationConfig::default()
    }
}

#[test]
fn test_stream_emits_one_segment_per_run() {
    let dir = TempDir::new().unwrap();
    let (map_path, first) = write_scenario(&dir, "dynamic_data_town_seed7.json");
    let (_, second) = write_scenario(&dir, "dynamic_data_town_seed3.json");

    let stream = SegmentStream::open(
        vec![MapRuns {
            map_file: map_path,
            dynamic_files: vec![first, second],
        }],
        whole_run_config(),
    )
    .unwrap();
    let metrics = stream.metrics().clone();

    let segments: Vec<_> = stream.collect();
    assert_eq!(segments.len(), 2);
    for segment in &segments {
        assert_eq!(segment.segmentation_type, "none");
        assert_eq!(segment.tick_count(), 30);
        assert_eq!(segment.simulation_run_id, segment.segment_source);
    }

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.read_simulation_runs, 2);
    assert_eq!(snapshot.sliced_simulation_runs, 2);
    assert_eq!(snapshot.segments_buffer, 0);
    assert!(snapshot.is_finished);
}

#[test]
fn test_seed_ordering_across_files() {
    let dir = TempDir::new().unwrap();
    let (map_path, first) = write_scenario(&dir, "dynamic_data_town_seed7.json");
    let (_, second) = write_scenario(&dir, "dynamic_data_town_seed3.json");

    let config = SegmentationConfig {
        order_files_by_seed: true,
        ..whole_run_config()
    };
    let stream = SegmentStream::open(
        vec![MapRuns {
            map_file: map_path,
            dynamic_files: vec![first, second],
        }],
        config,
    )
    .unwrap();

    let ids: Vec<String> = stream.map(|s| s.simulation_run_id).collect();
    assert_eq!(
        ids,
        vec![
            "dynamic_data_town_seed3".to_string(),
            "dynamic_data_town_seed7".to_string()
        ]
    );
}

#[test]
fn test_zip_wrapped_dynamic_document() {
    let dir = TempDir::new().unwrap();
    let scenario = TraceScenario::straight(30);
    let map_path = dir.path().join("map.json");
    fs::write(&map_path, serde_json::to_vec(&scenario.blocks()).unwrap()).unwrap();

    let zip_path = dir.path().join("dynamic_data_town_seed1.zip");
    let file = fs::File::create(&zip_path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    writer
        .start_file("trace.json", zip::write::FileOptions::default())
        .unwrap();
    writer
        .write_all(&serde_json::to_vec(&scenario.raw_ticks()).unwrap())
        .unwrap();
    writer.finish().unwrap();

    let stream = SegmentStream::open(
        vec![MapRuns {
            map_file: map_path,
            dynamic_files: vec![zip_path],
        }],
        whole_run_config(),
    )
    .unwrap();
    let segments: Vec<_> = stream.collect();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].simulation_run_id, "dynamic_data_town_seed1");
}

#[test]
fn test_every_vehicle_as_ego_multiplies_runs() {
    let dir = TempDir::new().unwrap();
    let mut scenario = TraceScenario::straight(30);
    scenario.follower_offsets_meters = vec![5.0];
    let map_path = dir.path().join("map.json");
    fs::write(&map_path, serde_json::to_vec(&scenario.blocks()).unwrap()).unwrap();
    let dynamic_path = dir.path().join("dynamic_data_town_seed2.json");
    fs::write(
        &dynamic_path,
        serde_json::to_vec(&scenario.raw_ticks()).unwrap(),
    )
    .unwrap();

    let config = SegmentationConfig {
        use_every_vehicle_as_ego: true,
        ..whole_run_config()
    };
    let stream = SegmentStream::open(
        vec![MapRuns {
            map_file: map_path,
            dynamic_files: vec![dynamic_path],
        }],
        config,
    )
    .unwrap();
    let segments: Vec<_> = stream.collect();
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].simulation_run_id, segments[1].simulation_run_id);
}

#[test]
fn test_empty_run_produces_empty_stream() {
    let dir = TempDir::new().unwrap();
    let (map_path, _) = write_scenario(&dir, "dynamic_data_town_seed7.json");
    let empty = dir.path().join("dynamic_data_town_seed8.json");
    fs::write(&empty, b"[]").unwrap();

    let stream = SegmentStream::open(
        vec![MapRuns {
            map_file: map_path,
            dynamic_files: vec![empty],
        }],
        whole_run_config(),
    )
    .unwrap();
    let metrics = stream.metrics().clone();
    assert_eq!(stream.count(), 0);
    assert_eq!(metrics.snapshot().sliced_simulation_runs, 1);
}

#[test]
fn test_unreadable_file_terminates_stream() {
    let dir = TempDir::new().unwrap();
    let (map_path, _) = write_scenario(&dir, "dynamic_data_town_seed7.json");
    let bad = dir.path().join("trace.txt");
    fs::write(&bad, b"not a trace").unwrap();

    let stream = SegmentStream::open(
        vec![MapRuns {
            map_file: map_path,
            dynamic_files: vec![bad],
        }],
        whole_run_config(),
    )
    .unwrap();
    assert_eq!(stream.count(), 0);
}

#[test]
fn test_missing_file_terminates_stream() {
    let dir = TempDir::new().unwrap();
    let (map_path, _) = write_scenario(&dir, "dynamic_data_town_seed7.json");
    let missing = dir.path().join("dynamic_data_town_seed9.json");

    let stream = SegmentStream::open(
        vec![MapRuns {
            map_file: map_path,
            dynamic_files: vec![missing],
        }],
        whole_run_config(),
    )
    .unwrap();
    assert_eq!(stream.count(), 0);
}

#[test]
fn test_invalid_strategy_configuration_fails_fast() {
    let config = SegmentationConfig {
        strategy: SegmentationStrategy::DynamicSegmentLengthSpeed { step_meters: 10.0 },
        ..SegmentationConfig::default()
    };
    let result = SegmentStream::open(Vec::new(), config);
    assert!(matches!(
        result,
        Err(SegmentationError::MissingConfiguration { .. })
    ));
}

#[test]
fn test_seed_ordering_requires_conventional_names() {
    let dir = TempDir::new().unwrap();
    let (map_path, _) = write_scenario(&dir, "dynamic_data_town_seed7.json");
    let odd = dir.path().join("run.json");
    fs::write(&odd, b"[]").unwrap();

    let config = SegmentationConfig {
        order_files_by_seed: true,
        ..whole_run_config()
    };
    let result = SegmentStream::open(
        vec![MapRuns {
            map_file: map_path,
            dynamic_files: vec![odd],
        }],
        config,
    );
    assert!(matches!(
        result,
        Err(SegmentationError::UnknownFilenameFormat { .. })
    ));
}

#[test]
fn test_dropping_stream_cancels_pipeline() {
    let dir = TempDir::new().unwrap();
    let (map_path, first) = write_scenario(&dir, "dynamic_data_town_seed7.json");
    let (_, second) = write_scenario(&dir, "dynamic_data_town_seed3.json");

    let mut stream = SegmentStream::open(
        vec![MapRuns {
            map_file: map_path,
            dynamic_files: vec![first, second],
        }],
        whole_run_config(),
    )
    .unwrap();
    let first_segment = stream.next();
    assert!(first_segment.is_some());
    drop(stream);
    // Nothing to assert beyond a clean return: the workers observe the
    // closed channels and unwind.
}
