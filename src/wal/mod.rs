//! Write-Ahead Log (WAL) Module
//!
//! Provides durability guarantees through append-only, segmented logging.
//!
//! ## Responsibilities
//! - Append checksummed entries with fsync before acknowledging
//! - Global sequence numbers, strictly increasing across segments
//! - Size-based rotation into numbered segment files
//! - Crash recovery of the numbering on startup
//!
//! ## File Format
//! ```text
//! {dir}/wal-0000000000000000000.log
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ Entry 1                                                          │
//! │ ┌─────────┬─────────┬──────────┬─────────┬──────────┬──────────┐ │
//! │ │ Len (4) │ Seq (8) │  TS (8)  │ PLen(4) │ Payload  │ CRC (8)  │ │
//! │ └─────────┴─────────┴──────────┴─────────┴──────────┴──────────┘ │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ Entry 2 ...                                                      │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//! All integers are big-endian; `Len` covers everything after itself.

mod entry;
mod manager;
mod reader;
mod recovery;
mod segment;
mod writer;

pub use entry::{
    compute_checksum, WalEntry, CHECKSUM_SIZE, FRAME_OVERHEAD, HEADER_SIZE, LENGTH_PREFIX_SIZE,
    MAX_PAYLOAD_SIZE, MIN_ENCODED_SIZE,
};
pub use manager::WalManager;
pub use reader::{WalEntries, WalReader};
pub use recovery::{RecoveryReport, WalRecovery};
pub use segment::{
    list_segments, parse_segment_number, segment_file_name, segment_path, SEGMENT_PREFIX,
    SEGMENT_SUFFIX,
};
pub use writer::WalWriter;
