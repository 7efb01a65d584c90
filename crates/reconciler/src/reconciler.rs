//! Reconciler implementation.

use std::cmp::Reverse;

use audit_core::{Error, ReplicaPolicy, Result, ResultExt};
use itertools::Itertools;
use tracing::{debug, info, warn};

use crate::accumulator::{BucketAccumulator, BucketStat};
use crate::backend::{BackendStats, GroupId, GroupVolumeStat};
use crate::types::{
    ReconcileSummary, ReconciliationResult, SizeTotals, SkippedBucket, drift_percent,
};

/// Configuration for the reconciler.
#[derive(Debug, Clone, Default)]
pub struct ReconcilerConfig {
    /// Which replica group stands for a bucket held by several groups.
    pub replica_policy: ReplicaPolicy,
}

/// Cross-references accumulated log records with backend group statistics.
pub struct Reconciler<B> {
    backend: B,
    config: ReconcilerConfig,
}

impl<B: BackendStats> Reconciler<B> {
    /// Create a new reconciler.
    pub const fn new(backend: B, config: ReconcilerConfig) -> Self {
        Self { backend, config }
    }

    /// Reconcile one bucket, or log why it cannot be and return `None`.
    pub fn reconcile(&self, bucket: &str, stat: &BucketStat) -> Option<ReconciliationResult> {
        self.try_reconcile(bucket, stat).into_option_logged(bucket)
    }

    /// Reconcile one bucket against every group it resolves to.
    ///
    /// All groups must have stats; one missing group fails the bucket.
    ///
    /// # Errors
    ///
    /// Returns `Error::BucketNotFound` if the bucket's groups cannot be
    /// resolved, `Error::StatsUnavailable` if any group's stats are missing.
    pub fn try_reconcile(&self, bucket: &str, stat: &BucketStat) -> Result<ReconciliationResult> {
        let groups = self.backend.resolve_bucket_groups(bucket)?;
        debug!(bucket, groups = ?groups, "Resolved bucket groups");

        let group_stats = groups
            .iter()
            .map(|&group| {
                self.backend
                    .group_volume_stats(group)
                    .map(|stats| (group, stats))
            })
            .collect::<Result<Vec<_>>>()?;

        let replicas_diverge = !group_stats
            .iter()
            .map(|(_, stats)| stats.real_records())
            .all_equal();
        if replicas_diverge {
            let per_group = group_stats
                .iter()
                .map(|(group, stats)| (group.0, stats.real_records()))
                .collect_vec();
            warn!(
                bucket,
                real_records = ?per_group,
                policy = %self.config.replica_policy,
                "Replica groups disagree on real record count"
            );
        }

        let (group, stats) = self
            .representative(&group_stats)
            .ok_or_else(|| Error::bucket_not_found(bucket, "no groups assigned"))?;

        let size_limit_bytes = group_stats
            .iter()
            .fold(0u64, |acc, (_, s)| acc.saturating_add(s.size_limit_bytes));

        let log_records = stat.key_count();
        let real_records = stats.real_records();
        let record_drift =
            real_records.saturating_sub(i64::try_from(log_records).unwrap_or(i64::MAX));

        Ok(ReconciliationResult {
            bucket: bucket.to_owned(),
            log_records,
            group,
            stats,
            real_used_bytes: stats.real_used_bytes(),
            real_records,
            record_drift,
            drift_percent: drift_percent(record_drift, real_records),
            size_limit_bytes,
            replicas_diverge,
            sizes: stat.has_size_data().then(|| SizeTotals {
                matched_bytes: stat.matched_size_total(),
                unmatched_bytes: stat.unmatched_size_total(),
            }),
        })
    }

    /// Pick the group reported for a bucket according to the replica policy.
    fn representative(
        &self,
        group_stats: &[(GroupId, GroupVolumeStat)],
    ) -> Option<(GroupId, GroupVolumeStat)> {
        match self.config.replica_policy {
            ReplicaPolicy::First => group_stats.first().copied(),
            ReplicaPolicy::Max => group_stats
                .iter()
                .min_by_key(|(_, stats)| Reverse(stats.real_records()))
                .copied(),
            ReplicaPolicy::Mean => {
                let (first, _) = group_stats.first()?;
                let mean = GroupVolumeStat::mean(group_stats.iter().map(|(_, stats)| stats))?;
                Some((*first, mean))
            }
        }
    }

    /// Reconcile every accumulated bucket, skipping those that fail.
    pub fn reconcile_all(&self, buckets: &BucketAccumulator) -> ReconcileSummary {
        let mut summary = ReconcileSummary {
            buckets_seen: buckets.len(),
            ..ReconcileSummary::default()
        };

        for (name, stat) in buckets.iter() {
            let reconciled = self
                .try_reconcile(name, stat)
                .inspect_error(|e| {
                    summary.skipped.push(SkippedBucket {
                        bucket: name.to_owned(),
                        reason: e.to_string(),
                    });
                })
                .into_option_logged(name);

            if let Some(result) = reconciled {
                summary.totals.add(&result);
                summary.results.push(result);
            }
        }

        info!(
            buckets = summary.buckets_seen,
            reconciled = summary.buckets_reconciled(),
            skipped = summary.skipped.len(),
            drift = summary.totals.drift(),
            "Reconciliation complete"
        );

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    fn group(total: u64, removed: u64) -> GroupVolumeStat {
        GroupVolumeStat {
            used_bytes: total.saturating_mul(100),
            removed_bytes: removed.saturating_mul(100),
            total_records: total,
            removed_records: removed,
            size_limit_bytes: 10_000,
        }
    }

    fn stat_with_count(count: u64) -> BucketStat {
        let mut stat = BucketStat::new();
        for _ in 0..count {
            stat.increment_count();
        }
        stat
    }

    #[test]
    fn test_drift_against_single_group() -> TestResult {
        let backend = InMemoryBackend::new()
            .with_bucket("alpha", &[1])
            .with_group(1, group(15, 3));
        let reconciler = Reconciler::new(&backend, ReconcilerConfig::default());

        let result = reconciler.try_reconcile("alpha", &stat_with_count(10))?;

        assert_eq!(result.group, GroupId(1));
        assert_eq!(result.real_records, 12);
        assert_eq!(result.record_drift, 2);
        assert!((result.drift_percent - 16.67).abs() < 0.01);
        assert_eq!(result.real_used_bytes, 1200);
        assert!(!result.replicas_diverge);
        assert_eq!(result.sizes, None);
        Ok(())
    }

    #[test]
    fn test_zero_real_records_is_zero_percent() -> TestResult {
        let backend = InMemoryBackend::new()
            .with_bucket("alpha", &[1])
            .with_group(1, group(5, 5));
        let reconciler = Reconciler::new(&backend, ReconcilerConfig::default());

        let result = reconciler.try_reconcile("alpha", &stat_with_count(7))?;

        assert_eq!(result.real_records, 0);
        assert_eq!(result.record_drift, -7);
        assert!(result.drift_percent.abs() < f64::EPSILON);
        Ok(())
    }

    #[test]
    fn test_first_policy_reports_first_group_and_sums_limits() -> TestResult {
        let backend = InMemoryBackend::new()
            .with_bucket("alpha", &[2, 1])
            .with_group(1, group(20, 0))
            .with_group(2, group(10, 0));
        let reconciler = Reconciler::new(&backend, ReconcilerConfig::default());

        let result = reconciler.try_reconcile("alpha", &stat_with_count(10))?;

        assert_eq!(result.group, GroupId(2));
        assert_eq!(result.real_records, 10);
        assert_eq!(result.size_limit_bytes, 20_000);
        assert!(result.replicas_diverge);
        Ok(())
    }

    #[test]
    fn test_max_policy() -> TestResult {
        let backend = InMemoryBackend::new()
            .with_bucket("alpha", &[2, 1, 3])
            .with_group(1, group(20, 0))
            .with_group(2, group(10, 0))
            .with_group(3, group(20, 0));
        let reconciler = Reconciler::new(
            &backend,
            ReconcilerConfig {
                replica_policy: ReplicaPolicy::Max,
            },
        );

        let result = reconciler.try_reconcile("alpha", &stat_with_count(0))?;

        assert_eq!(result.group, GroupId(1));
        assert_eq!(result.real_records, 20);
        Ok(())
    }

    #[test]
    fn test_mean_policy() -> TestResult {
        let backend = InMemoryBackend::new()
            .with_bucket("alpha", &[1, 2])
            .with_group(1, group(20, 0))
            .with_group(2, group(10, 0));
        let reconciler = Reconciler::new(
            &backend,
            ReconcilerConfig {
                replica_policy: ReplicaPolicy::Mean,
            },
        );

        let result = reconciler.try_reconcile("alpha", &stat_with_count(15))?;

        assert_eq!(result.group, GroupId(1));
        assert_eq!(result.real_records, 15);
        assert_eq!(result.record_drift, 0);
        Ok(())
    }

    #[test]
    fn test_missing_group_stats_fail_bucket() {
        let backend = InMemoryBackend::new()
            .with_bucket("alpha", &[1, 7])
            .with_group(1, group(20, 0));
        let reconciler = Reconciler::new(&backend, ReconcilerConfig::default());

        let result = reconciler.try_reconcile("alpha", &stat_with_count(1));
        assert!(matches!(result, Err(Error::StatsUnavailable { group: 7, .. })));
        assert!(reconciler.reconcile("alpha", &stat_with_count(1)).is_none());
    }

    #[test]
    fn test_reconcile_all_skips_and_counts() {
        let backend = InMemoryBackend::new()
            .with_bucket("alpha", &[1])
            .with_bucket("beta", &[1])
            .with_group(1, group(15, 3));
        let reconciler = Reconciler::new(&backend, ReconcilerConfig::default());

        let mut buckets = BucketAccumulator::new();
        for _ in 0..10 {
            buckets.increment_count("alpha");
        }
        buckets.increment_count("beta");
        buckets.increment_count("gamma");

        let summary = reconciler.reconcile_all(&buckets);

        assert_eq!(summary.buckets_seen, 3);
        assert_eq!(summary.buckets_reconciled(), 2);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(
            summary.skipped.first().map(|s| s.bucket.as_str()),
            Some("gamma")
        );
        // The shared group counts once per bucket it backs.
        assert_eq!(summary.totals.size_limit_bytes, 20_000);
        assert_eq!(summary.totals.real_records, 24);
        assert_eq!(summary.totals.log_records, 11);
        assert_eq!(summary.totals.drift(), 13);
    }

    #[test]
    fn test_size_totals_are_carried() -> TestResult {
        let backend = InMemoryBackend::new()
            .with_bucket("alpha", &[1])
            .with_group(1, group(1, 0));
        let reconciler = Reconciler::new(&backend, ReconcilerConfig::default());

        let mut stat = BucketStat::new();
        stat.insert("k");
        stat.match_size("k", 64);
        stat.match_size("other", 16);

        let result = reconciler.try_reconcile("alpha", &stat)?;
        assert_eq!(
            result.sizes,
            Some(SizeTotals {
                matched_bytes: 64,
                unmatched_bytes: 16,
            })
        );
        Ok(())
    }
}
