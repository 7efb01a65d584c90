//! Core types for the reconciler.

use crate::backend::{GroupId, GroupVolumeStat};

/// Percentage of `drift` relative to `real_records`.
///
/// Defined as `0.0` when there are no real records, whatever the drift.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn drift_percent(drift: i64, real_records: i64) -> f64 {
    if real_records == 0 {
        return 0.0;
    }
    drift as f64 / real_records as f64 * 100.0
}

/// Log-derived size totals of a bucket scanned with size listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeTotals {
    pub matched_bytes: u64,
    pub unmatched_bytes: u64,
}

/// Comparison of one bucket's log-derived records with its backend stats.
///
/// Derived on every report, never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationResult {
    pub bucket: String,
    /// Records attributed to the bucket by the scanned logs.
    pub log_records: u64,
    /// Group the per-bucket line reports.
    pub group: GroupId,
    /// Counters of the representative group.
    pub stats: GroupVolumeStat,
    pub real_used_bytes: u64,
    pub real_records: i64,
    /// `real_records - log_records`.
    pub record_drift: i64,
    pub drift_percent: f64,
    /// Size limit summed over every group the bucket resolved to.
    pub size_limit_bytes: u64,
    /// Replica groups disagree on real record count.
    pub replicas_diverge: bool,
    pub sizes: Option<SizeTotals>,
}

/// A bucket left out of the per-bucket report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedBucket {
    pub bucket: String,
    pub reason: String,
}

/// Running totals over successfully reconciled buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileTotals {
    pub used_bytes: u64,
    pub real_used_bytes: u64,
    pub size_limit_bytes: u64,
    pub real_records: i64,
    pub log_records: i64,
}

impl ReconcileTotals {
    pub fn add(&mut self, result: &ReconciliationResult) {
        self.used_bytes = self.used_bytes.saturating_add(result.stats.used_bytes);
        self.real_used_bytes = self.real_used_bytes.saturating_add(result.real_used_bytes);
        self.size_limit_bytes = self.size_limit_bytes.saturating_add(result.size_limit_bytes);
        self.real_records = self.real_records.saturating_add(result.real_records);
        self.log_records = self
            .log_records
            .saturating_add(i64::try_from(result.log_records).unwrap_or(i64::MAX));
    }

    #[must_use]
    pub const fn drift(&self) -> i64 {
        self.real_records.saturating_sub(self.log_records)
    }

    #[must_use]
    pub fn drift_percent(&self) -> f64 {
        drift_percent(self.drift(), self.real_records)
    }
}

/// Result of reconciling every accumulated bucket.
#[derive(Debug, Clone, Default)]
pub struct ReconcileSummary {
    /// Distinct buckets seen in the logs, skipped ones included.
    pub buckets_seen: usize,
    pub results: Vec<ReconciliationResult>,
    pub skipped: Vec<SkippedBucket>,
    pub totals: ReconcileTotals,
}

impl ReconcileSummary {
    #[must_use]
    pub fn buckets_reconciled(&self) -> usize {
        self.results.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drift_percent_zero_denominator() {
        assert!(drift_percent(0, 0).abs() < f64::EPSILON);
        assert!(drift_percent(-10, 0).abs() < f64::EPSILON);
        assert!(drift_percent(i64::MAX, 0).is_finite());
    }

    #[test]
    fn test_drift_percent() {
        assert!((drift_percent(2, 12) - 16.666_666).abs() < 1e-3);
        assert!((drift_percent(-5, 10) + 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_totals_accumulate() {
        let result = ReconciliationResult {
            bucket: "alpha".to_string(),
            log_records: 10,
            group: GroupId(1),
            stats: GroupVolumeStat {
                used_bytes: 100,
                removed_bytes: 40,
                total_records: 15,
                removed_records: 3,
                size_limit_bytes: 1000,
            },
            real_used_bytes: 60,
            real_records: 12,
            record_drift: 2,
            drift_percent: drift_percent(2, 12),
            size_limit_bytes: 2000,
            replicas_diverge: false,
            sizes: None,
        };

        let mut totals = ReconcileTotals::default();
        totals.add(&result);
        totals.add(&result);

        assert_eq!(totals.used_bytes, 200);
        assert_eq!(totals.real_used_bytes, 120);
        assert_eq!(totals.size_limit_bytes, 4000);
        assert_eq!(totals.real_records, 24);
        assert_eq!(totals.log_records, 20);
        assert_eq!(totals.drift(), 4);
    }

    #[test]
    fn test_empty_totals_have_zero_percent() {
        let totals = ReconcileTotals::default();
        assert_eq!(totals.drift(), 0);
        assert!(totals.drift_percent().abs() < f64::EPSILON);
    }
}
