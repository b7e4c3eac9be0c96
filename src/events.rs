//! WAL Events
//!
//! Structured notifications emitted by the manager. The core never logs
//! directly; it hands events to an injected [`EventSink`].
//!
//! ## Sinks
//! - [`TracingSink`] — forwards to `tracing` (the default)
//! - [`ChannelSink`] — forwards over a crossbeam channel
//! - [`NoopSink`] — drops everything

use std::fmt;
use std::path::PathBuf;

use crossbeam::channel::{self, Receiver, Sender};

/// Operation an event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalOperation {
    Initialize,
    Recover,
    Append,
    Rotate,
    GetReader,
    Close,
}

impl fmt::Display for WalOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WalOperation::Initialize => "initialize",
            WalOperation::Recover => "recover",
            WalOperation::Append => "append",
            WalOperation::Rotate => "rotate",
            WalOperation::GetReader => "get_reader",
            WalOperation::Close => "close",
        };
        f.write_str(name)
    }
}

/// Something the manager did or failed to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalEvent {
    /// Manager is starting on a directory
    Initialized { dir: PathBuf, max_segment_size: u64 },

    /// One pre-existing segment was scanned during recovery
    SegmentScanned {
        segment: u64,
        entries: u64,
        max_sequence: Option<u64>,
    },

    /// A corrupt tail in the newest segment was cut back to the last
    /// whole frame
    TornTailDiscarded {
        segment: u64,
        reason: String,
        valid_bytes: u64,
        discarded_bytes: u64,
    },

    /// Recovery finished
    RecoveryComplete {
        segments_scanned: usize,
        entries_recovered: u64,
        next_sequence: u64,
        active_segment: u64,
    },

    /// A new segment file was opened for appending
    SegmentOpened { segment: u64, path: PathBuf },

    /// Active segment changed after crossing the size threshold
    Rotated { from: u64, to: u64, bytes_written: u64 },

    /// A reader was created and cached
    ReaderCreated { segment: u64 },

    /// Manager closed
    Closed,

    /// An operation failed; the error is also returned to the caller
    Failed {
        operation: WalOperation,
        message: String,
    },
}

/// Receives events from the WAL core
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &WalEvent);
}

// =============================================================================
// Tracing
// =============================================================================

/// Forwards events to the `tracing` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &WalEvent) {
        match event {
            WalEvent::Initialized {
                dir,
                max_segment_size,
            } => {
                tracing::info!(dir = %dir.display(), max_segment_size, "initializing WAL manager");
            }
            WalEvent::SegmentScanned {
                segment,
                entries,
                max_sequence,
            } => {
                tracing::debug!(segment, entries, ?max_sequence, "scanned segment");
            }
            WalEvent::TornTailDiscarded {
                segment,
                reason,
                valid_bytes,
                discarded_bytes,
            } => {
                tracing::warn!(
                    segment,
                    %reason,
                    valid_bytes,
                    discarded_bytes,
                    "truncated torn tail in newest segment"
                );
            }
            WalEvent::RecoveryComplete {
                segments_scanned,
                entries_recovered,
                next_sequence,
                active_segment,
            } => {
                tracing::info!(
                    segments_scanned,
                    entries_recovered,
                    next_sequence,
                    active_segment,
                    "recovery complete"
                );
            }
            WalEvent::SegmentOpened { segment, path } => {
                tracing::info!(segment, path = %path.display(), "opened new segment");
            }
            WalEvent::Rotated {
                from,
                to,
                bytes_written,
            } => {
                tracing::info!(from, to, bytes_written, "rotated segment");
            }
            WalEvent::ReaderCreated { segment } => {
                tracing::debug!(segment, "created segment reader");
            }
            WalEvent::Closed => {
                tracing::info!("WAL manager closed");
            }
            WalEvent::Failed { operation, message } => {
                tracing::error!(%operation, %message, "WAL operation failed");
            }
        }
    }
}

// =============================================================================
// Channel
// =============================================================================

/// Sends a clone of each event down an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<WalEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiving end of its channel
    pub fn new() -> (Self, Receiver<WalEvent>) {
        let (tx, rx) = channel::unbounded();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &WalEvent) {
        // A dropped receiver just means nobody is listening.
        let _ = self.tx.send(event.clone());
    }
}

// =============================================================================
// No-op
// =============================================================================

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: &WalEvent) {}
}
