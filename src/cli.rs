//! CLI command definitions using clap.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;

use audit_core::{ReplicaPolicy, ScanMode};
use clap::{Parser, Subcommand};

/// bucket-audit - reconcile access logs against backend storage statistics
#[derive(Parser, Debug)]
#[command(name = "bucket-audit")]
#[command(version)]
#[command(about = "Reconcile access-log derived bucket contents against backend storage statistics")]
#[command(
    long_about = "bucket-audit scans key listings and access logs, counts records per bucket, and compares them with the used size and record counts the storage backend reports for each bucket's groups."
)]
pub struct Cli {
    /// Config file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend stats snapshot (JSON), overrides the config
    #[arg(short, long, global = true)]
    pub stats: Option<PathBuf>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan log files and report drift per bucket
    Reconcile {
        /// Log files, scanned in the order given
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Line grammar (count-only, keyed-url-path, size-match)
        #[arg(short, long)]
        mode: Option<ScanMode>,

        /// Size listings matched against observed keys after the main scan
        #[arg(long, value_name = "FILE")]
        sizes: Vec<PathBuf>,

        /// Replica group reported for multi-group buckets (first, max, mean)
        #[arg(long)]
        replica_policy: Option<ReplicaPolicy>,

        /// Sort per-bucket lines by bucket name
        #[arg(long, overrides_with = "no_sort")]
        sort: bool,

        /// Keep per-bucket lines unsorted, even if the config sorts them
        #[arg(long, overrides_with = "sort")]
        no_sort: bool,
    },

    /// Show the groups and group stats backing buckets
    Check {
        /// Bucket names
        #[arg(required = true)]
        buckets: Vec<String>,
    },
}
