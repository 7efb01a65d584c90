//! Plain-text rendering of a [`ReconcileSummary`].
//!
//! Byte counts are printed raw and scaled to terabytes (2^40 bytes); the
//! scaled value is display-only.

use itertools::Itertools;

use crate::types::{ReconcileSummary, ReconciliationResult};

const TERABYTE: f64 = 1_099_511_627_776.0;

/// Options controlling report layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    /// Order per-bucket lines by bucket name instead of reconciliation order.
    pub sort_buckets: bool,
}

/// Scale bytes to terabytes for display.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn to_terabytes(bytes: u64) -> f64 {
    bytes as f64 / TERABYTE
}

/// One line per reconciled bucket.
#[must_use]
pub fn format_bucket_line(result: &ReconciliationResult) -> String {
    let stats = &result.stats;
    let mut line = format!(
        "bucket: {}, files: {}, stat: group: {}, used-size: {} ({:.2} Tb), removed-size: {} ({:.2} Tb), \
         real-used-size: {} ({:.2} Tb), records: {}, removed-records: {}, real-records: {}, \
         diff-with-file: {}, percentage: {:.2}%",
        result.bucket,
        result.log_records,
        result.group,
        stats.used_bytes,
        to_terabytes(stats.used_bytes),
        stats.removed_bytes,
        to_terabytes(stats.removed_bytes),
        result.real_used_bytes,
        to_terabytes(result.real_used_bytes),
        stats.total_records,
        stats.removed_records,
        result.real_records,
        result.record_drift,
        result.drift_percent,
    );
    if result.replicas_diverge {
        line.push_str(", replicas: divergent");
    }
    line
}

/// Matched/unmatched byte totals of a bucket scanned with size listings.
#[must_use]
pub fn format_sizes_line(result: &ReconciliationResult) -> Option<String> {
    result.sizes.map(|sizes| {
        format!(
            "bucket: {}, sizes: matched: {} ({:.2} Tb), unmatched: {} ({:.2} Tb)",
            result.bucket,
            sizes.matched_bytes,
            to_terabytes(sizes.matched_bytes),
            sizes.unmatched_bytes,
            to_terabytes(sizes.unmatched_bytes),
        )
    })
}

/// Global totals line.
#[must_use]
pub fn format_summary_line(summary: &ReconcileSummary) -> String {
    let totals = &summary.totals;
    format!(
        "buckets: {}, reconciled: {}, stat: used-size: {:.2} Tb, real-used-size: {:.2} Tb, \
         total-disk-size: {:.2} Tb, real-records: {}, provided-file-records: {}, diff: {}, \
         percentage: {:.2}%",
        summary.buckets_seen,
        summary.buckets_reconciled(),
        to_terabytes(totals.used_bytes),
        to_terabytes(totals.real_used_bytes),
        to_terabytes(totals.size_limit_bytes),
        totals.real_records,
        totals.log_records,
        totals.drift(),
        totals.drift_percent(),
    )
}

/// Render the whole report: per-bucket lines, then the summary line.
#[must_use]
pub fn format_report(summary: &ReconcileSummary, options: ReportOptions) -> String {
    let results: Vec<&ReconciliationResult> = if options.sort_buckets {
        summary
            .results
            .iter()
            .sorted_by(|a, b| a.bucket.cmp(&b.bucket))
            .collect()
    } else {
        summary.results.iter().collect()
    };

    results
        .into_iter()
        .flat_map(|result| std::iter::once(format_bucket_line(result)).chain(format_sizes_line(result)))
        .chain(std::iter::once(format_summary_line(summary)))
        .map(|line| format!("{line}\n"))
        .collect()
}
