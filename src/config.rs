//! Configuration for segwal
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WalError};

/// Main configuration for a WAL directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalConfig {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding the segment files
    /// Internal structure:
    ///   {dir}/
    ///     ├── wal-0000000000000000000.log
    ///     ├── wal-0000000000000000001.log
    ///     └── ...
    pub dir: PathBuf,

    // -------------------------------------------------------------------------
    // Segment Configuration
    // -------------------------------------------------------------------------
    /// Rotation threshold in bytes. Checked after each write, so a segment
    /// can overshoot by at most one encoded entry.
    pub max_segment_size: u64,

    // -------------------------------------------------------------------------
    // Integrity Configuration
    // -------------------------------------------------------------------------
    /// What readers do with the checksum stored in each frame
    pub checksum_policy: ChecksumPolicy,

    /// How startup recovery treats a corrupt tail in the newest segment
    pub recovery_mode: RecoveryMode,
}

/// Checksum handling on read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumPolicy {
    /// Recompute and compare; a mismatch is a corruption error
    #[default]
    Verify,

    /// Ignore the stored checksum (it is only an on-disk audit trail)
    PassThrough,
}

/// Recovery behavior for corrupt segments found at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryMode {
    /// Any corruption in an existing segment fails `open`
    #[default]
    Strict,

    /// Corruption in the newest existing segment ends its scan (torn write
    /// from a crash) and the segment is truncated back to its last whole
    /// frame. Older segments must still be intact.
    TolerateTornTail,
}

impl Default for WalConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./wal_data"),
            max_segment_size: 64 * 1024 * 1024, // 64 MB
            checksum_policy: ChecksumPolicy::Verify,
            recovery_mode: RecoveryMode::Strict,
        }
    }
}

impl WalConfig {
    /// Create a new config builder
    pub fn builder() -> WalConfigBuilder {
        WalConfigBuilder::default()
    }

    /// Check invariants that the builder enforces
    pub fn validate(&self) -> Result<()> {
        if self.max_segment_size == 0 {
            return Err(WalError::Config(
                "max_segment_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for WalConfig
#[derive(Default)]
pub struct WalConfigBuilder {
    config: WalConfig,
}

impl WalConfigBuilder {
    /// Set the segment directory
    pub fn dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.dir = path.into();
        self
    }

    /// Set the rotation threshold (in bytes)
    pub fn max_segment_size(mut self, size: u64) -> Self {
        self.config.max_segment_size = size;
        self
    }

    /// Set the checksum policy used by readers
    pub fn checksum_policy(mut self, policy: ChecksumPolicy) -> Self {
        self.config.checksum_policy = policy;
        self
    }

    /// Set the recovery mode
    pub fn recovery_mode(mut self, mode: RecoveryMode) -> Self {
        self.config.recovery_mode = mode;
        self
    }

    pub fn build(self) -> Result<WalConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
