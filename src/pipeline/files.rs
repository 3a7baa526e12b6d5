//! Trace file naming conventions and document decoding.
//!
//! Two on-disk conventions are recognised:
//!
//! - `static_data_<map>.zip` - the road-network document of one map
//! - `dynamic_data_<map>_seed<N>.<ext>` - one recorded run on that map,
//!   where `<N>` is the integer simulation seed
//!
//! Documents are JSON, either bare (`.json`) or wrapped in a single-entry
//! `.zip`; every other extension is rejected.

use std::fs;
use std::io::Read;
use std::path::Path;

use crate::error::{Result, SegmentationError};
use crate::input::RawTick;
use crate::network::Block;

const STATIC_PREFIX: &str = "static_data_";
const DYNAMIC_PREFIX: &str = "dynamic_data_";
const SEED_MARKER: &str = "_seed";

/// Fallback map name for unnamed in-memory traces.
const TEST_CASE_MAP: &str = "test_case";

/// Extract the map name from a static- or dynamic-data file name.
///
/// The empty name maps to `"test_case"` (in-memory test traces carry no
/// file name).
pub fn map_name_of(file_name: &str) -> Result<String> {
    if file_name.is_empty() {
        return Ok(TEST_CASE_MAP.to_string());
    }
    if let Some(rest) = file_name.strip_prefix(STATIC_PREFIX) {
        return rest
            .strip_suffix(".zip")
            .map(str::to_owned)
            .ok_or_else(|| SegmentationError::UnknownFilenameFormat {
                name: file_name.to_string(),
            });
    }
    if let Some(rest) = file_name.strip_prefix(DYNAMIC_PREFIX) {
        if let Some(marker) = rest.rfind(SEED_MARKER) {
            return Ok(rest[..marker].to_string());
        }
    }
    Err(SegmentationError::UnknownFilenameFormat {
        name: file_name.to_string(),
    })
}

/// Extract the simulation seed from a dynamic-data file name.
///
/// The empty name maps to seed 0; static-data names carry no seed and fail
/// with [`SegmentationError::NotADynamicFile`].
pub fn seed_of(file_name: &str) -> Result<u64> {
    if file_name.is_empty() {
        return Ok(0);
    }
    if file_name.starts_with(STATIC_PREFIX) {
        return Err(SegmentationError::NotADynamicFile {
            name: file_name.to_string(),
        });
    }
    if let Some(rest) = file_name.strip_prefix(DYNAMIC_PREFIX) {
        if let Some(marker) = rest.rfind(SEED_MARKER) {
            let tail = &rest[marker + SEED_MARKER.len()..];
            let digits = tail.split('.').next().unwrap_or(tail);
            if let Ok(seed) = digits.parse() {
                return Ok(seed);
            }
        }
    }
    Err(SegmentationError::UnknownFilenameFormat {
        name: file_name.to_string(),
    })
}

/// Decode the static road-network document at `path`.
pub fn load_blocks(path: &Path) -> Result<Vec<Block>> {
    let bytes = read_document_bytes(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Decode one dynamic trace document at `path` into its raw tick list.
pub fn load_raw_ticks(path: &Path) -> Result<Vec<RawTick>> {
    let bytes = read_document_bytes(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Read the JSON payload of a trace document, transparently unwrapping a
/// single-entry zip container.
fn read_document_bytes(path: &Path) -> Result<Vec<u8>> {
    let metadata = fs::metadata(path).map_err(|_| SegmentationError::PathNotFound {
        path: path.to_path_buf(),
    })?;
    if metadata.is_dir() {
        return Err(SegmentationError::PathIsDirectory {
            path: path.to_path_buf(),
        });
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    match extension {
        "json" => Ok(fs::read(path)?),
        "zip" => {
            let file = fs::File::open(path)?;
            let mut archive = zip::ZipArchive::new(file)?;
            if archive.len() == 0 {
                return Err(SegmentationError::UnsupportedInput {
                    detail: format!("zip archive {} contains no entries", path.display()),
                });
            }
            let mut entry = archive.by_index(0)?;
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut bytes)?;
            Ok(bytes)
        }
        other => Err(SegmentationError::UnsupportedExtension {
            extension: other.to_string(),
        }),
    }
}
