//! Log-versus-backend reconciliation for object-storage buckets.
//!
//! This crate compares what an access log says was stored in each bucket with
//! what the storage backend reports, and renders the drift as a report:
//!
//! - **Classify**: extract `(bucket, key)` from each log line
//! - **Accumulate**: per-bucket record counts and observed keys
//! - **Scan**: stream files line by line into one accumulator
//! - **Reconcile**: compare log records with backend group statistics
//! - **Report**: per-bucket lines and a global summary
//!
//! # Key Concepts
//!
//! ## Scan modes
//!
//! - `CountOnly` - `bucket/key` lines, counted without tracking keys
//! - `KeyedUrlPath` - access-log lines with `/get/bucket/key`, keys deduplicated
//! - `SizeMatch` - `bucket/key size` listings matched against observed keys
//!
//! ## Failure isolation
//!
//! An unreadable file or an unresolvable bucket is logged and skipped. The
//! engine always returns a report.
//!
//! # Example
//!
//! ```ignore
//! use audit_core::ScanMode;
//! use audit_reconciler::{
//!     BucketAccumulator, Reconciler, ReconcilerConfig, ReportOptions, StatsSnapshot,
//!     format_report, scan_files,
//! };
//!
//! let backend = StatsSnapshot::load(Path::new("stats.json"))?.into_backend();
//!
//! let mut buckets = BucketAccumulator::new();
//! let scans = scan_files(&["keys-1.txt", "keys-2.txt"], ScanMode::CountOnly, &mut buckets);
//!
//! let reconciler = Reconciler::new(&backend, ReconcilerConfig::default());
//! let summary = reconciler.reconcile_all(&buckets);
//! print!("{}", format_report(&summary, ReportOptions::default()));
//! ```

#![forbid(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod accumulator;
pub mod backend;
pub mod classify;
pub mod reconciler;
pub mod report;
pub mod scanner;
pub mod types;

// Re-export main types
pub use accumulator::{BucketAccumulator, BucketStat};
pub use backend::{
    BackendStats, BackendVfsStat, GroupId, GroupVolumeStat, InMemoryBackend, StatsSnapshot,
};
pub use classify::{classify_size_listing, classify_slash, classify_url_path};
pub use reconciler::{Reconciler, ReconcilerConfig};
pub use report::{ReportOptions, format_report, to_terabytes};
pub use scanner::{ScanOutcome, ScanReport, scan_file, scan_files, scan_reader};
pub use types::{
    ReconcileSummary, ReconcileTotals, ReconciliationResult, SizeTotals, SkippedBucket,
    drift_percent,
};
