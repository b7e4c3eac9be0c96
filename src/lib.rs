//! # segwal
//!
//! A segmented write-ahead log with:
//! - Durable, sequentially numbered appends (fsync per entry)
//! - CRC32-checksummed binary framing
//! - Size-based rotation into numbered segment files
//! - Crash recovery of the sequence counter on startup
//! - Shared access from many threads through one manager
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        WalManager                            │
//! │      (recovery, numbering, rotation, reader cache)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  WalWriter  │          │  WalReader  │
//!   │  (active)   │          │  (cached)   │
//!   └──────┬──────┘          └──────┬──────┘
//!          │                        │
//!          ▼                        ▼
//!   ┌─────────────────────────────────────┐
//!   │  wal-0000000000000000000.log  ...   │
//!   │         (WalEntry frames)           │
//!   └─────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use segwal::WalManager;
//!
//! # fn main() -> segwal::Result<()> {
//! let wal = WalManager::new("/tmp/wal", 64 * 1024 * 1024)?;
//! let entry = wal.append(b"hello")?;
//! assert_eq!(entry.sequence_number(), wal.next_sequence_number() - 1);
//! wal.close()?;
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod events;

pub mod wal;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{ChecksumPolicy, RecoveryMode, WalConfig};
pub use error::{Result, WalError};
pub use events::{ChannelSink, EventSink, NoopSink, TracingSink, WalEvent, WalOperation};
pub use wal::{RecoveryReport, WalEntry, WalManager, WalReader, WalWriter};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of segwal
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
