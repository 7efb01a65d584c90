//! Core types, errors, and configuration for bucket-audit.
//!
//! Shared by the reconciliation engine and the command-line binary.

#![forbid(clippy::unwrap_used)]
#![forbid(clippy::panic)]
#![deny(clippy::expect_used)]

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use config::{AuditConfig, ClusterConfig, ReportConfig, ScanConfig};
pub use error::Error;
pub use result::{Result, ResultExt};
pub use types::{ReplicaPolicy, ScanMode};
