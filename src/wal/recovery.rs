//! WAL Recovery
//!
//! Scans existing segments on startup to find where numbering resumes.

use std::fs::{self, OpenOptions};
use std::path::Path;

use serde::Serialize;

use super::segment::{list_segments, segment_path};
use super::WalReader;
use crate::config::{ChecksumPolicy, RecoveryMode};
use crate::error::{Result, WalError};
use crate::events::{EventSink, NoopSink, WalEvent};

/// Handles WAL recovery after a restart or crash
pub struct WalRecovery;

/// Result of a recovery scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    /// Number of pre-existing segments read
    pub segments_scanned: usize,

    /// Number of entries successfully decoded across all segments
    pub entries_recovered: u64,

    /// Highest sequence number found, if any entry exists
    pub last_sequence: Option<u64>,

    /// Segments whose corrupt tail was truncated away
    pub torn_segments: Vec<u64>,

    /// Segment the manager opens for appending (one past the highest found)
    pub active_segment: u64,

    /// First sequence number the manager hands out
    pub next_sequence: u64,
}

impl WalRecovery {
    /// Scan every segment in `dir` in ascending order
    ///
    /// This will:
    /// 1. Discover segment files (non-matching names are ignored)
    /// 2. Read each to completion, tracking the highest sequence number
    /// 3. Apply `mode` to corruption found in the newest segment; a tolerated
    ///    tail is truncated back to the last whole frame so later restarts
    ///    see a clean, sealed segment
    /// 4. Compute the next segment and sequence numbers
    pub fn scan(
        dir: &Path,
        policy: ChecksumPolicy,
        mode: RecoveryMode,
        sink: &dyn EventSink,
    ) -> Result<RecoveryReport> {
        let segments = list_segments(dir)?;
        let newest = segments.last().copied();

        let mut report = RecoveryReport::default();

        for &segment in &segments {
            let path = segment_path(dir, segment);
            let reader = WalReader::open_with_policy(&path, policy)?;

            let mut entries = 0u64;
            let mut segment_max: Option<u64> = None;
            // Frames are contiguous, so this is the offset just past the
            // last good one.
            let mut valid_bytes = 0u64;
            let mut torn = None;

            for result in reader.entries() {
                match result {
                    Ok(entry) => {
                        entries += 1;
                        valid_bytes += entry.encoded_len() as u64;
                        segment_max = segment_max.max(Some(entry.sequence_number()));
                    }
                    Err(e)
                        if e.is_corruption()
                            && mode == RecoveryMode::TolerateTornTail
                            && Some(segment) == newest =>
                    {
                        torn = Some(e);
                    }
                    Err(e) => return Err(e),
                }
            }
            reader.close();

            if let Some(e) = torn {
                let discarded_bytes = truncate_segment(&path, valid_bytes)?;
                sink.emit(&WalEvent::TornTailDiscarded {
                    segment,
                    reason: e.to_string(),
                    valid_bytes,
                    discarded_bytes,
                });
                report.torn_segments.push(segment);
            }

            sink.emit(&WalEvent::SegmentScanned {
                segment,
                entries,
                max_sequence: segment_max,
            });

            report.segments_scanned += 1;
            report.entries_recovered += entries;
            report.last_sequence = report.last_sequence.max(segment_max);
        }

        report.next_sequence = match report.last_sequence {
            Some(last) => last.checked_add(1).ok_or_else(|| {
                WalError::Corruption("sequence number space exhausted".to_string())
            })?,
            None => 0,
        };
        report.active_segment = match newest {
            Some(segment) => segment.checked_add(1).ok_or_else(|| {
                WalError::Corruption("segment number space exhausted".to_string())
            })?,
            None => 0,
        };

        Ok(report)
    }

    /// Verify a directory without opening a manager or creating segments
    ///
    /// Any corruption is an error.
    pub fn verify(dir: &Path, policy: ChecksumPolicy) -> Result<RecoveryReport> {
        Self::scan(dir, policy, RecoveryMode::Strict, &NoopSink)
    }
}

/// Cut a segment back to `len` bytes and fsync; returns how many were removed
fn truncate_segment(path: &Path, len: u64) -> Result<u64> {
    let total = fs::metadata(path)?.len();
    let file = OpenOptions::new().write(true).open(path)?;
    file.set_len(len)?;
    file.sync_all()?;
    Ok(total.saturating_sub(len))
}
