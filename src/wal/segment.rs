//! Segment file naming
//!
//! Segments are named `wal-<19-digit zero-padded number>.log`, so
//! lexicographic and numeric order agree.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub const SEGMENT_PREFIX: &str = "wal-";
pub const SEGMENT_SUFFIX: &str = ".log";

/// "wal-0000000000000000042.log" for 42
pub fn segment_file_name(segment: u64) -> String {
    format!("{}{:019}{}", SEGMENT_PREFIX, segment, SEGMENT_SUFFIX)
}

pub fn segment_path(dir: &Path, segment: u64) -> PathBuf {
    dir.join(segment_file_name(segment))
}

/// Parse a segment number from a file name
/// "wal-0000000000000000042.log" → Some(42)
///
/// Anything that is not the prefix, one or more ASCII digits, then the
/// suffix yields `None`. Width is not enforced.
pub fn parse_segment_number(file_name: &str) -> Option<u64> {
    let digits = file_name
        .strip_prefix(SEGMENT_PREFIX)?
        .strip_suffix(SEGMENT_SUFFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Segment numbers present in `dir`, ascending
pub fn list_segments(dir: &Path) -> Result<Vec<u64>> {
    let mut segments = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(segment) = entry.file_name().to_str().and_then(parse_segment_number) {
            segments.push(segment);
        }
    }

    segments.sort_unstable();
    Ok(segments)
}
