//! WAL Writer
//!
//! Appends entries to a single segment file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::WalEntry;
use crate::error::{Result, WalError};

/// Writes entries to one segment file
///
/// Every `write_entry` is followed by an fsync, so a successful return means
/// the frame is on stable storage. Calls are serialized by an internal mutex.
pub struct WalWriter {
    /// Segment file path
    path: PathBuf,

    /// Open handle, `None` once closed
    file: Mutex<Option<File>>,

    /// File length when this writer opened it
    base_len: u64,

    /// Bytes written by this writer, framing included
    written_bytes: AtomicU64,
}

impl WalWriter {
    /// Open a segment for appending, creating it if missing
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        let base_len = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(Some(file)),
            base_len,
            written_bytes: AtomicU64::new(0),
        })
    }

    /// Append an entry and fsync
    ///
    /// On failure the file is cut back to where the frame started, so no
    /// partial frame is left for later entries to land behind. If that cut
    /// fails too the handle is released and the writer reports itself closed.
    pub fn write_entry(&self, entry: &WalEntry) -> Result<()> {
        let mut guard = self.file.lock();
        let file = guard.as_mut().ok_or(WalError::Closed("writer"))?;

        let frame = entry.encode();
        // write_all loops over short writes until the frame is exhausted.
        let written = file.write_all(&frame).and_then(|()| file.sync_all());

        if let Err(e) = written {
            let frame_start = self.base_len + self.written_bytes();
            let rolled_back = file.set_len(frame_start).and_then(|()| file.sync_all());
            if rolled_back.is_err() {
                *guard = None;
            }
            return Err(e.into());
        }

        self.written_bytes
            .fetch_add(frame.len() as u64, Ordering::SeqCst);
        Ok(())
    }

    /// Cumulative bytes written; retained after close
    pub fn written_bytes(&self) -> u64 {
        self.written_bytes.load(Ordering::SeqCst)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.file.lock().is_none()
    }

    /// Flush and release the file handle. Safe to call repeatedly.
    pub fn close(&self) -> Result<()> {
        if let Some(file) = self.file.lock().take() {
            file.sync_all()?;
        }
        Ok(())
    }
}
