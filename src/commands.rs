//! CLI command handlers.
//!
//! Handlers return the text to print; `main` owns stdout. Configuration and
//! snapshot failures are fatal here, before any scanning starts. Per-file and
//! per-bucket failures are logged and the report is still produced.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use audit_core::{AuditConfig, ReplicaPolicy, ScanMode};
use audit_reconciler::{
    BackendStats, BucketAccumulator, InMemoryBackend, ReconcileSummary, Reconciler,
    ReconcilerConfig, ReportOptions, StatsSnapshot, format_report, scan_files, to_terabytes,
};
use itertools::Itertools;
use tracing::{info, warn};

use crate::cli::{Cli, Commands};

/// Overrides given on the command line; `None` keeps the config value.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub stats: Option<PathBuf>,
    pub mode: Option<ScanMode>,
    pub replica_policy: Option<ReplicaPolicy>,
    pub sort: Option<bool>,
}

impl CliOverrides {
    /// Apply on top of a loaded config (the last layer of the hierarchy).
    pub fn apply(self, config: &mut AuditConfig) {
        if let Some(stats) = self.stats {
            config.cluster.stats_snapshot = Some(stats);
        }
        if let Some(mode) = self.mode {
            config.scan.mode = mode;
        }
        if let Some(policy) = self.replica_policy {
            config.report.replica_policy = policy;
        }
        if let Some(sort) = self.sort {
            config.report.sort_buckets = sort;
        }
    }
}

/// Everything a reconcile run produced.
#[derive(Debug)]
pub struct AuditRun {
    pub report: String,
    pub summary: ReconcileSummary,
    /// Input files that could not be read.
    pub scan_failures: usize,
}

/// Execute a CLI command and return the text for stdout.
///
/// # Errors
///
/// Returns an error if configuration or the stats snapshot cannot be loaded.
pub fn execute_command(cli: Cli) -> Result<String> {
    let Cli {
        config, stats, command, ..
    } = cli;

    match command {
        Commands::Reconcile {
            files,
            mode,
            sizes,
            replica_policy,
            sort,
            no_sort,
        } => {
            let overrides = CliOverrides {
                stats,
                mode,
                replica_policy,
                sort: sort_override(sort, no_sort),
            };
            let config = load_config(config.as_deref(), overrides)?;
            run_reconcile(&config, &files, &sizes).map(|run| run.report)
        }

        Commands::Check { buckets } => {
            let overrides = CliOverrides {
                stats,
                ..CliOverrides::default()
            };
            let config = load_config(config.as_deref(), overrides)?;
            let backend = load_backend(&config)?;
            Ok(check_buckets(&backend, &buckets))
        }
    }
}

/// `--sort` / `--no-sort`; neither keeps the configured value.
const fn sort_override(sort: bool, no_sort: bool) -> Option<bool> {
    match (sort, no_sort) {
        (true, _) => Some(true),
        (false, true) => Some(false),
        (false, false) => None,
    }
}

/// Load, override and validate the configuration.
///
/// # Errors
///
/// Returns an error if a config file is malformed, an environment override
/// is invalid, or no stats snapshot is configured.
pub fn load_config(explicit: Option<&Path>, overrides: CliOverrides) -> Result<AuditConfig> {
    let mut config =
        AuditConfig::load(explicit, std::env::vars()).context("Failed to load configuration")?;
    overrides.apply(&mut config);
    config.validate().context("Configuration is incomplete")?;
    Ok(config)
}

/// Load the backend stats named by the config.
///
/// # Errors
///
/// Returns an error if the snapshot is unset, unreadable or malformed.
pub fn load_backend(config: &AuditConfig) -> Result<InMemoryBackend> {
    let path = config
        .cluster
        .stats_snapshot
        .as_deref()
        .context("No stats snapshot configured")?;

    let backend = StatsSnapshot::load(path)
        .with_context(|| format!("Failed to load stats snapshot {}", path.display()))?
        .into_backend();

    info!(
        snapshot = %path.display(),
        buckets = backend.bucket_count(),
        groups = backend.group_count(),
        "Loaded backend stats"
    );
    Ok(backend)
}

/// Scan `files` (then `sizes` listings), reconcile and render the report.
///
/// Unreadable inputs are reported by the scanner and counted here.
///
/// # Errors
///
/// Returns an error only if the stats snapshot cannot be loaded.
pub fn run_reconcile(config: &AuditConfig, files: &[PathBuf], sizes: &[PathBuf]) -> Result<AuditRun> {
    let backend = load_backend(config)?;

    let mut buckets = BucketAccumulator::new();
    let mut scans = scan_files(files, config.scan.mode, &mut buckets);
    if !sizes.is_empty() {
        let size_scans = scan_files(sizes, ScanMode::SizeMatch, &mut buckets);
        scans.outcomes.extend(size_scans.outcomes);
        scans.failures.extend(size_scans.failures);
    }

    info!(
        files = scans.outcomes.len(),
        failed = scans.failures.len(),
        matched = scans.total_matched(),
        buckets = buckets.len(),
        "Scan complete"
    );

    let reconciler = Reconciler::new(
        &backend,
        ReconcilerConfig {
            replica_policy: config.report.replica_policy,
        },
    );
    let summary = reconciler.reconcile_all(&buckets);
    let report = format_report(
        &summary,
        ReportOptions {
            sort_buckets: config.report.sort_buckets,
        },
    );

    Ok(AuditRun {
        report,
        summary,
        scan_failures: scans.failures.len(),
    })
}

/// Describe each bucket's groups and their rolled-up stats.
pub fn check_buckets<B: BackendStats>(backend: &B, buckets: &[String]) -> String {
    buckets
        .iter()
        .flat_map(|bucket| check_bucket(backend, bucket))
        .map(|line| format!("{line}\n"))
        .collect()
}

fn check_bucket<B: BackendStats>(backend: &B, bucket: &str) -> Vec<String> {
    let groups = match backend.resolve_bucket_groups(bucket) {
        Ok(groups) => groups,
        Err(e) => {
            warn!(bucket = %bucket, error = %e, "Bucket check failed");
            return vec![format!("bucket: {bucket}, error: {e}")];
        }
    };

    let ids = groups.iter().map(ToString::to_string).join(", ");
    std::iter::once(format!("bucket: {bucket}, groups: [{ids}]"))
        .chain(groups.into_iter().map(|group| match backend.group_volume_stats(group) {
            Ok(stat) => format!(
                "  group: {group}, used-size: {} ({:.2} Tb), removed-size: {} ({:.2} Tb), \
                 records: {}, removed-records: {}, size-limit: {:.2} Tb",
                stat.used_bytes,
                to_terabytes(stat.used_bytes),
                stat.removed_bytes,
                to_terabytes(stat.removed_bytes),
                stat.total_records,
                stat.removed_records,
                to_terabytes(stat.size_limit_bytes),
            ),
            Err(e) => {
                warn!(bucket = %bucket, group = %group, error = %e, "Group stats unavailable");
                format!("  group: {group}, error: {e}")
            }
        }))
        .collect()
}

#[cfg(test)]
mod tests {
    use audit_reconciler::GroupVolumeStat;

    use super::*;

    #[test]
    fn test_overrides_apply_last() {
        let mut config = AuditConfig::default();
        config.report.replica_policy = ReplicaPolicy::Mean;

        CliOverrides {
            stats: Some(PathBuf::from("s.json")),
            mode: Some(ScanMode::KeyedUrlPath),
            replica_policy: None,
            sort: Some(true),
        }
        .apply(&mut config);

        assert_eq!(config.cluster.stats_snapshot, Some(PathBuf::from("s.json")));
        assert_eq!(config.scan.mode, ScanMode::KeyedUrlPath);
        assert_eq!(config.report.replica_policy, ReplicaPolicy::Mean);
        assert!(config.report.sort_buckets);
    }

    #[test]
    fn test_no_sort_overrides_configured_sort() {
        let mut config = AuditConfig::default();
        config.report.sort_buckets = true;

        CliOverrides {
            sort: sort_override(false, true),
            ..CliOverrides::default()
        }
        .apply(&mut config);
        assert!(!config.report.sort_buckets);

        CliOverrides::default().apply(&mut config);
        assert!(!config.report.sort_buckets);
    }

    #[test]
    fn test_check_buckets_output() {
        let backend = InMemoryBackend::new()
            .with_bucket("alpha", &[1, 5])
            .with_group(
                1,
                GroupVolumeStat {
                    used_bytes: 10,
                    removed_bytes: 2,
                    total_records: 3,
                    removed_records: 1,
                    size_limit_bytes: 0,
                },
            );

        let out = check_buckets(&backend, &["alpha".to_string(), "nope".to_string()]);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.first().copied(), Some("bucket: alpha, groups: [1, 5]"));
        assert!(lines.get(1).is_some_and(|l| l.starts_with("  group: 1, used-size: 10 (0.00 Tb)")));
        assert!(lines.get(2).is_some_and(|l| l.starts_with("  group: 5, error: stats unavailable")));
        assert!(lines.get(3).is_some_and(|l| l.starts_with("bucket: nope, error: bucket 'nope' not found")));
    }
}
