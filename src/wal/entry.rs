//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries and their on-disk
//! frame encoding.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::config::ChecksumPolicy;
use crate::error::{Result, WalError};

/// Size of the `TotalLength` prefix
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Sequence number (8) + timestamp (8) + payload length (4)
pub const HEADER_SIZE: usize = 20;

/// Checksum field width (CRC32 in the low 4 bytes, top 4 always zero)
pub const CHECKSUM_SIZE: usize = 8;

/// Bytes counted by `TotalLength` on top of the payload
pub const FRAME_OVERHEAD: usize = HEADER_SIZE + CHECKSUM_SIZE;

/// Encoded size of an entry with an empty payload
pub const MIN_ENCODED_SIZE: usize = LENGTH_PREFIX_SIZE + FRAME_OVERHEAD;

/// Largest payload whose `TotalLength` still fits in a u32
pub const MAX_PAYLOAD_SIZE: usize = u32::MAX as usize - FRAME_OVERHEAD;

/// Last timestamp handed out, so timestamps never go backwards in-process
static LAST_TIMESTAMP_MS: AtomicU64 = AtomicU64::new(0);

/// A single entry in the WAL
///
/// Immutable after construction. The checksum is always derived from the
/// sequence number and payload; equality ignores the timestamp.
#[derive(Debug, Clone)]
pub struct WalEntry {
    /// Log-wide sequence number
    sequence_number: u64,

    /// Owned payload bytes
    payload: Bytes,

    /// Unix millis when the entry was created
    timestamp_ms: u64,

    /// CRC32 over big-endian sequence number + payload, widened to 8 bytes
    checksum: [u8; CHECKSUM_SIZE],
}

impl PartialEq for WalEntry {
    fn eq(&self, other: &Self) -> bool {
        self.sequence_number == other.sequence_number
            && self.payload == other.payload
            && self.checksum == other.checksum
    }
}

impl Eq for WalEntry {}

impl WalEntry {
    /// Build an entry, copying the payload into owned storage
    ///
    /// Fails with `Validation` if the payload is too large to frame.
    pub fn new(sequence_number: u64, payload: &[u8]) -> Result<Self> {
        check_payload_len(payload.len())?;

        Ok(Self {
            sequence_number,
            checksum: compute_checksum(sequence_number, payload),
            payload: Bytes::copy_from_slice(payload),
            timestamp_ms: next_timestamp_ms(),
        })
    }

    /// Build an entry from a payload that may be absent
    pub fn create(sequence_number: u64, payload: Option<&[u8]>) -> Result<Self> {
        let payload = payload
            .ok_or_else(|| WalError::Validation("payload must not be absent".to_string()))?;
        Self::new(sequence_number, payload)
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    /// Immutable handle to the payload
    pub fn payload(&self) -> Bytes {
        self.payload.clone()
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    pub fn checksum(&self) -> [u8; CHECKSUM_SIZE] {
        self.checksum
    }

    pub fn timestamp_millis(&self) -> u64 {
        self.timestamp_ms
    }

    pub fn timestamp(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(self.timestamp_ms)
    }

    /// Size of the frame `encode` produces, prefix included
    pub fn encoded_len(&self) -> usize {
        MIN_ENCODED_SIZE + self.payload.len()
    }

    // =========================================================================
    // Encoding
    // =========================================================================

    /// Encode as `[TotalLength][Seq][Timestamp][PayloadLen][Payload][Checksum]`
    ///
    /// All integers are big-endian. `TotalLength` excludes itself.
    pub fn encode(&self) -> Bytes {
        let total_length = FRAME_OVERHEAD + self.payload.len();
        let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + total_length);

        // Lengths fit: `new` and `decode_frame` both bound the payload size.
        buf.put_u32(total_length as u32);
        buf.put_u64(self.sequence_number);
        buf.put_u64(self.timestamp_ms);
        buf.put_u32(self.payload.len() as u32);
        buf.put_slice(&self.payload);
        buf.put_slice(&self.checksum);

        buf.freeze()
    }

    /// Decode a complete frame, length prefix included
    pub fn decode(mut frame: &[u8], policy: ChecksumPolicy) -> Result<Self> {
        if frame.len() < LENGTH_PREFIX_SIZE {
            return Err(WalError::Corruption(format!(
                "incomplete length prefix: {} of {} bytes",
                frame.len(),
                LENGTH_PREFIX_SIZE
            )));
        }

        let total_length = frame.get_u32() as usize;
        if frame.len() != total_length {
            return Err(WalError::Corruption(format!(
                "frame declares {} bytes but {} follow the prefix",
                total_length,
                frame.len()
            )));
        }

        Self::decode_frame(frame, policy)
    }

    /// Decode a frame body (everything after the length prefix)
    pub fn decode_frame(mut body: &[u8], policy: ChecksumPolicy) -> Result<Self> {
        if body.remaining() < HEADER_SIZE {
            return Err(WalError::Corruption(format!(
                "entry body of {} bytes is shorter than the {}-byte header",
                body.remaining(),
                HEADER_SIZE
            )));
        }

        let sequence_number = body.get_u64();
        let timestamp_ms = body.get_u64();
        let payload_len = body.get_u32() as usize;

        if payload_len > body.remaining() {
            return Err(WalError::Corruption(format!(
                "declared payload length {} exceeds the {} bytes remaining",
                payload_len,
                body.remaining()
            )));
        }
        let payload = Bytes::copy_from_slice(&body[..payload_len]);
        body.advance(payload_len);

        if body.remaining() < CHECKSUM_SIZE {
            return Err(WalError::Corruption(format!(
                "only {} bytes left for the {}-byte checksum",
                body.remaining(),
                CHECKSUM_SIZE
            )));
        }
        let mut stored = [0u8; CHECKSUM_SIZE];
        body.copy_to_slice(&mut stored);

        if body.has_remaining() {
            return Err(WalError::Corruption(format!(
                "{} unexpected bytes after checksum",
                body.remaining()
            )));
        }

        let checksum = compute_checksum(sequence_number, &payload);
        if policy == ChecksumPolicy::Verify && stored != checksum {
            return Err(WalError::Corruption(format!(
                "checksum mismatch for sequence {}: stored {:02x?}, computed {:02x?}",
                sequence_number, stored, checksum
            )));
        }

        Ok(Self {
            sequence_number,
            payload,
            timestamp_ms,
            checksum,
        })
    }
}

/// Reject payloads whose frame length would not fit the u32 prefix
pub(crate) fn check_payload_len(len: usize) -> Result<()> {
    if len > MAX_PAYLOAD_SIZE {
        return Err(WalError::Validation(format!(
            "payload of {} bytes exceeds the maximum of {} bytes",
            len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(())
}

/// CRC32 over the big-endian sequence number followed by the payload,
/// stored big-endian in the low 4 bytes of an 8-byte field
pub fn compute_checksum(sequence_number: u64, payload: &[u8]) -> [u8; CHECKSUM_SIZE] {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&sequence_number.to_be_bytes());
    hasher.update(payload);
    u64::from(hasher.finalize()).to_be_bytes()
}

/// Wall-clock millis, clamped so successive calls never decrease
fn next_timestamp_ms() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    let previous = LAST_TIMESTAMP_MS.fetch_max(now, Ordering::SeqCst);
    previous.max(now)
}
