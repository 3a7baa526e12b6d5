//! Tests for the trace file naming conventions

use tracesegment::pipeline::files::{map_name_of, seed_of};
use tracesegment::SegmentationError;

#[test]
fn test_map_name_of_static_file() {
    assert_eq!(map_name_of("static_data_town01.zip").unwrap(), "town01");
}

#[test]
fn test_map_name_of_dynamic_file() {
    assert_eq!(
        map_name_of("dynamic_data_town01_seed42.json").unwrap(),
        "town01"
    );
    assert_eq!(
        map_name_of("dynamic_data_town01_seed7.zip").unwrap(),
        "town01"
    );
}

#[test]
fn test_empty_name_is_test_case() {
    assert_eq!(map_name_of("").unwrap(), "test_case");
    assert_eq!(seed_of("").unwrap(), 0);
}

#[test]
fn test_seed_of_dynamic_file() {
    assert_eq!(seed_of("dynamic_data_town01_seed42.json").unwrap(), 42);
    assert_eq!(seed_of("dynamic_data_town01_seed0.zip").unwrap(), 0);
}

#[test]
fn test_seed_of_static_file_fails() {
    assert!(matches!(
        seed_of("static_data_town01.zip"),
        Err(SegmentationError::NotADynamicFile { .. })
    ));
}

#[test]
fn test_unknown_format_rejected() {
    assert!(matches!(
        map_name_of("recording.txt"),
        Err(SegmentationError::UnknownFilenameFormat { .. })
    ));
    assert!(matches!(
        seed_of("recording.txt"),
        Err(SegmentationError::UnknownFilenameFormat { .. })
    ));
    // Static files must be zip containers.
    assert!(matches!(
        map_name_of("static_data_town01.json"),
        Err(SegmentationError::UnknownFilenameFormat { .. })
    ));
    // Dynamic files must carry a numeric seed.
    assert!(matches!(
        seed_of("dynamic_data_town01_seedX.json"),
        Err(SegmentationError::UnknownFilenameFormat { .. })
    ));
}

#[test]
fn test_map_name_with_underscores() {
    assert_eq!(
        map_name_of("dynamic_data_town_10_hd_seed3.json").unwrap(),
        "town_10_hd"
    );
    assert_eq!(map_name_of("static_data_town_10_hd.zip").unwrap(), "town_10_hd");
}
