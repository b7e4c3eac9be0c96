//! WAL Reader
//!
//! Sequentially decodes entries from one segment file.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::entry::{FRAME_OVERHEAD, LENGTH_PREFIX_SIZE};
use super::WalEntry;
use crate::config::ChecksumPolicy;
use crate::error::{Result, WalError};

/// Reads entries from a segment file
///
/// The cursor only moves forward. Shared readers (for example the ones the
/// manager caches) share that cursor; open a new reader to start over.
pub struct WalReader {
    /// Segment file path
    path: PathBuf,

    /// Stored-checksum handling
    policy: ChecksumPolicy,

    /// Buffered handle, `None` once closed
    file: Mutex<Option<BufReader<File>>>,
}

impl WalReader {
    /// Open a segment for reading, verifying checksums
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_policy(path, ChecksumPolicy::Verify)
    }

    pub fn open_with_policy(path: &Path, policy: ChecksumPolicy) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            policy,
            file: Mutex::new(Some(BufReader::new(file))),
        })
    }

    /// Read the next entry
    ///
    /// Returns:
    /// - `Ok(Some(entry))` — a complete, well-formed frame
    /// - `Ok(None)` — clean end of segment
    /// - `Err(Corruption)` — partial prefix, truncated frame, bad lengths or
    ///   (under `ChecksumPolicy::Verify`) a checksum mismatch
    pub fn read_entry(&self) -> Result<Option<WalEntry>> {
        let mut guard = self.file.lock();
        let reader = guard.as_mut().ok_or(WalError::Closed("reader"))?;
        read_frame(reader, self.policy)
    }

    /// Lazy iterator over the remaining entries
    ///
    /// Ends at the end of the segment or after yielding the first error.
    pub fn entries(&self) -> WalEntries<'_> {
        WalEntries {
            reader: self,
            done: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn checksum_policy(&self) -> ChecksumPolicy {
        self.policy
    }

    pub fn is_closed(&self) -> bool {
        self.file.lock().is_none()
    }

    /// Release the file handle. Safe to call repeatedly.
    pub fn close(&self) {
        self.file.lock().take();
    }
}

/// Iterator over WAL entries
pub struct WalEntries<'a> {
    reader: &'a WalReader,
    done: bool,
}

impl Iterator for WalEntries<'_> {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.reader.read_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl FusedIterator for WalEntries<'_> {}

// =============================================================================
// Frame Decoding
// =============================================================================

fn read_frame<R: Read>(reader: &mut R, policy: ChecksumPolicy) -> Result<Option<WalEntry>> {
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    let filled = read_up_to(reader, &mut prefix)?;

    if filled == 0 {
        return Ok(None);
    }
    if filled < LENGTH_PREFIX_SIZE {
        return Err(WalError::Corruption(format!(
            "incomplete length prefix: {} of {} bytes",
            filled, LENGTH_PREFIX_SIZE
        )));
    }

    let total_length = u32::from_be_bytes(prefix) as usize;
    if total_length < FRAME_OVERHEAD {
        return Err(WalError::Corruption(format!(
            "invalid entry length {} (minimum {})",
            total_length, FRAME_OVERHEAD
        )));
    }

    // Grow with the data actually present rather than trusting the prefix.
    let mut body = Vec::new();
    reader
        .by_ref()
        .take(total_length as u64)
        .read_to_end(&mut body)?;

    if body.len() < total_length {
        return Err(WalError::Corruption(format!(
            "truncated entry: expected {} bytes, found {}",
            total_length,
            body.len()
        )));
    }

    WalEntry::decode_frame(&body, policy).map(Some)
}

/// Fill `buf` as far as the stream allows, returning the byte count
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
