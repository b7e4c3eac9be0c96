//! WAL Manager
//!
//! Owns a directory of segments and is the entry point for clients.
//!
//! ## Responsibilities
//! - Recover numbering from existing segments on startup
//! - Assign sequence numbers and append durably
//! - Rotate to a new segment once the size threshold is crossed
//! - Hand out cached readers for historical segments

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::entry::check_payload_len;
use super::recovery::{RecoveryReport, WalRecovery};
use super::segment::{list_segments, segment_path};
use super::{WalEntry, WalReader, WalWriter};
use crate::config::WalConfig;
use crate::error::{Result, WalError};
use crate::events::{EventSink, TracingSink, WalEvent, WalOperation};

/// The segment currently open for appending
struct ActiveSegment {
    number: u64,
    writer: WalWriter,
}

/// Manages the segments of one WAL directory
///
/// ## Concurrency:
/// - `closed`: RwLock held shared by every operation, exclusive by `close`
/// - `active`: Mutex owning the writer; numbering, write+fsync and rotation
///   all happen under it, so on-disk order matches sequence order and a
///   threshold crossing rotates exactly once
/// - `readers`: RwLock'd cache, entries live until `close`
/// - `next_sequence`: Atomic counter, only advanced under `active` and only
///   after a successful write
pub struct WalManager {
    /// Directory, threshold and integrity settings
    config: WalConfig,

    /// Set once by `close`
    closed: RwLock<bool>,

    /// Writer for the active segment
    active: Mutex<ActiveSegment>,

    /// Segment number → shared reader
    readers: RwLock<HashMap<u64, Arc<WalReader>>>,

    /// Next sequence number to hand out
    next_sequence: AtomicU64,

    /// What startup recovery found
    recovery: RecoveryReport,

    /// Receives lifecycle and failure events
    sink: Arc<dyn EventSink>,
}

impl WalManager {
    /// Open a WAL in `dir` with default settings and the given threshold
    pub fn new(dir: impl Into<PathBuf>, max_segment_size: u64) -> Result<Self> {
        let config = WalConfig::builder()
            .dir(dir)
            .max_segment_size(max_segment_size)
            .build()?;
        Self::open(config)
    }

    /// Open a WAL, reporting events through `tracing`
    pub fn open(config: WalConfig) -> Result<Self> {
        Self::open_with_sink(config, Arc::new(TracingSink))
    }

    /// Open a WAL with a custom event sink
    ///
    /// On startup:
    /// 1. Create the directory if it doesn't exist
    /// 2. Scan every existing segment for the highest sequence number
    /// 3. Open a fresh segment one past the highest existing one
    pub fn open_with_sink(config: WalConfig, sink: Arc<dyn EventSink>) -> Result<Self> {
        config.validate()?;

        sink.emit(&WalEvent::Initialized {
            dir: config.dir.clone(),
            max_segment_size: config.max_segment_size,
        });

        let result = Self::recover(config, Arc::clone(&sink));
        if let Err(e) = &result {
            sink.emit(&WalEvent::Failed {
                operation: WalOperation::Initialize,
                message: e.to_string(),
            });
        }
        result
    }

    fn recover(config: WalConfig, sink: Arc<dyn EventSink>) -> Result<Self> {
        fs::create_dir_all(&config.dir)?;

        let recovery = WalRecovery::scan(
            &config.dir,
            config.checksum_policy,
            config.recovery_mode,
            sink.as_ref(),
        )?;

        // Never resume an existing segment, even a short one.
        let writer = Self::open_segment(&config.dir, recovery.active_segment, sink.as_ref())?;

        sink.emit(&WalEvent::RecoveryComplete {
            segments_scanned: recovery.segments_scanned,
            entries_recovered: recovery.entries_recovered,
            next_sequence: recovery.next_sequence,
            active_segment: recovery.active_segment,
        });

        Ok(Self {
            active: Mutex::new(ActiveSegment {
                number: recovery.active_segment,
                writer,
            }),
            next_sequence: AtomicU64::new(recovery.next_sequence),
            closed: RwLock::new(false),
            readers: RwLock::new(HashMap::new()),
            config,
            recovery,
            sink,
        })
    }

    // =========================================================================
    // Appending
    // =========================================================================

    /// Append a payload and return the durable entry
    ///
    /// The sequence number is only consumed once the entry is on disk, so a
    /// failed append leaves no gap. The size check runs after the write, so
    /// the active segment may end up larger than `max_segment_size` by up to
    /// one encoded entry.
    ///
    /// A rotation failure does not fail the append: the entry is already
    /// durable, the failure goes to the sink, and the next append retries.
    pub fn append(&self, payload: &[u8]) -> Result<WalEntry> {
        let closed = self.closed.read();
        if *closed {
            return Err(WalError::Closed("manager"));
        }

        self.observe(WalOperation::Append, check_payload_len(payload.len()))?;

        let mut active = self.active.lock();

        let sequence_number = self.next_sequence.load(Ordering::SeqCst);
        let following = sequence_number.checked_add(1).ok_or_else(|| {
            WalError::Corruption("sequence number space exhausted".to_string())
        });
        let following = self.observe(WalOperation::Append, following)?;
        let entry = WalEntry::new(sequence_number, payload)?;

        if let Err(e) = active.writer.write_entry(&entry) {
            // The writer gives up its handle when it cannot roll back a
            // partial frame; move on so later appends have somewhere to go.
            if active.writer.is_closed() {
                let rotated = self.rotate(&mut active);
                let _ = self.observe(WalOperation::Rotate, rotated);
            }
            return self.observe(WalOperation::Append, Err(e));
        }
        self.next_sequence.store(following, Ordering::SeqCst);

        if active.writer.written_bytes() >= self.config.max_segment_size {
            let rotated = self.rotate(&mut active);
            let _ = self.observe(WalOperation::Rotate, rotated);
        }

        Ok(entry)
    }

    /// Switch to the next segment
    ///
    /// The new segment is opened before the old writer is closed, so a
    /// failure to create it leaves the current segment active.
    fn rotate(&self, active: &mut ActiveSegment) -> Result<()> {
        let from = active.number;
        let to = from
            .checked_add(1)
            .ok_or_else(|| WalError::Corruption("segment number space exhausted".to_string()))?;

        let writer = Self::open_segment(&self.config.dir, to, self.sink.as_ref())?;
        let previous = std::mem::replace(&mut active.writer, writer);
        active.number = to;

        self.sink.emit(&WalEvent::Rotated {
            from,
            to,
            bytes_written: previous.written_bytes(),
        });

        previous.close()
    }

    fn open_segment(dir: &Path, segment: u64, sink: &dyn EventSink) -> Result<WalWriter> {
        let path = segment_path(dir, segment);
        let writer = WalWriter::open(&path)?;
        sink.emit(&WalEvent::SegmentOpened { segment, path });
        Ok(writer)
    }

    // =========================================================================
    // Reading
    // =========================================================================

    /// Get the cached reader for a segment, opening it on first request
    ///
    /// Readers share one forward-only cursor per segment and stay cached
    /// until the manager is closed. A missing segment is an `Io` error.
    pub fn get_reader(&self, segment: u64) -> Result<Arc<WalReader>> {
        let closed = self.closed.read();
        if *closed {
            return Err(WalError::Closed("manager"));
        }

        if let Some(reader) = self.readers.read().get(&segment) {
            return Ok(Arc::clone(reader));
        }

        let mut readers = self.readers.write();
        // Another thread may have opened it while we waited.
        if let Some(reader) = readers.get(&segment) {
            return Ok(Arc::clone(reader));
        }

        let opened = WalReader::open_with_policy(
            &self.segment_path(segment),
            self.config.checksum_policy,
        );
        let reader = Arc::new(self.observe(WalOperation::GetReader, opened)?);
        readers.insert(segment, Arc::clone(&reader));

        self.sink.emit(&WalEvent::ReaderCreated { segment });
        Ok(reader)
    }

    /// Stream entries of sealed segments, starting at `from_segment`
    ///
    /// Uses fresh readers, so cached cursors are untouched. The active
    /// segment is excluded. Return `Ok(false)` from the callback to stop.
    pub fn replay<F>(&self, from_segment: u64, mut callback: F) -> Result<()>
    where
        F: FnMut(u64, WalEntry) -> Result<bool>,
    {
        let closed = self.closed.read();
        if *closed {
            return Err(WalError::Closed("manager"));
        }

        let active = self.active.lock().number;
        let sealed = list_segments(&self.config.dir)?
            .into_iter()
            .filter(|&segment| segment >= from_segment && segment < active);

        for segment in sealed {
            let reader = WalReader::open_with_policy(
                &self.segment_path(segment),
                self.config.checksum_policy,
            )?;
            for result in reader.entries() {
                if !callback(segment, result?)? {
                    return Ok(());
                }
            }
        }

        Ok(())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Close the active writer and every cached reader. Idempotent.
    pub fn close(&self) -> Result<()> {
        let mut closed = self.closed.write();
        if *closed {
            return Ok(());
        }
        *closed = true;

        let writer_result = self.active.lock().writer.close();

        let mut readers = self.readers.write();
        for reader in readers.values() {
            reader.close();
        }
        readers.clear();
        drop(readers);

        self.observe(WalOperation::Close, writer_result)?;
        self.sink.emit(&WalEvent::Closed);
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.read()
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    pub fn config(&self) -> &WalConfig {
        &self.config
    }

    pub fn dir(&self) -> &Path {
        &self.config.dir
    }

    /// Number of the segment currently receiving appends
    pub fn active_segment(&self) -> u64 {
        self.active.lock().number
    }

    /// Bytes written to the active segment since it was opened
    pub fn active_segment_bytes(&self) -> u64 {
        self.active.lock().writer.written_bytes()
    }

    /// Sequence number the next append will receive
    pub fn next_sequence_number(&self) -> u64 {
        self.next_sequence.load(Ordering::SeqCst)
    }

    pub fn recovery_report(&self) -> &RecoveryReport {
        &self.recovery
    }

    /// Segment numbers currently on disk, ascending
    pub fn segments(&self) -> Result<Vec<u64>> {
        list_segments(&self.config.dir)
    }

    pub fn segment_path(&self, segment: u64) -> PathBuf {
        segment_path(&self.config.dir, segment)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Report a failed result to the sink and pass it through
    fn observe<T>(&self, operation: WalOperation, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.sink.emit(&WalEvent::Failed {
                operation,
                message: e.to_string(),
            });
        }
        result
    }
}

impl Drop for WalManager {
    fn drop(&mut self) {
        // Failures were already reported through the sink.
        let _ = self.close();
    }
}
