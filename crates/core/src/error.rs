//! Core error types for bucket-audit operations using Railway-Oriented Programming.
//!
//! All errors are explicit, typed, and recoverable - no panics allowed.
//!
//! Three variants are scoped to a single work item (one log file, one bucket)
//! and are recovered locally by the engine. Everything else belongs to the
//! setup phase and is fatal before any scanning starts.

use std::path::PathBuf;

use thiserror::Error;

/// Core error type for bucket-audit operations.
#[derive(Debug, Error)]
pub enum Error {
    // Per-item errors
    #[error("I/O error on '{path}': {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("bucket '{bucket}' not found: {reason}")]
    BucketNotFound { bucket: String, reason: String },

    #[error("stats unavailable for group {group}: {reason}")]
    StatsUnavailable { group: u32, reason: String },

    // Setup errors
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse config '{path}': {reason}")]
    ConfigParse { path: PathBuf, reason: String },

    #[error("failed to parse stats snapshot '{path}': {reason}")]
    SnapshotParse { path: PathBuf, reason: String },
}

impl Error {
    /// Create an I/O error scoped to one file.
    pub fn io(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Io {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a bucket not found error.
    pub fn bucket_not_found(bucket: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BucketNotFound {
            bucket: bucket.into(),
            reason: reason.into(),
        }
    }

    /// Create a stats unavailable error.
    pub fn stats_unavailable(group: u32, reason: impl Into<String>) -> Self {
        Self::StatsUnavailable {
            group,
            reason: reason.into(),
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Create a config parse error.
    pub fn config_parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ConfigParse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a snapshot parse error.
    pub fn snapshot_parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::SnapshotParse {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
