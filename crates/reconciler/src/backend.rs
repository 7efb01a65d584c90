//! Backend statistics boundary.
//!
//! The engine only needs two lookups: which groups a bucket lives in, and the
//! volume counters of one group rolled up over its backends. Talking to the
//! cluster is the job of whatever implements [`BackendStats`]; this module
//! ships an in-memory implementation and a loader for JSON stats dumps.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

use audit_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Storage group (replica set) identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u32);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Volume counters of one group, summed over its backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupVolumeStat {
    pub used_bytes: u64,
    pub removed_bytes: u64,
    pub total_records: u64,
    pub removed_records: u64,
    pub size_limit_bytes: u64,
}

impl GroupVolumeStat {
    /// Used bytes not yet reclaimed from removals; saturates at 0.
    #[must_use]
    pub const fn real_used_bytes(&self) -> u64 {
        self.used_bytes.saturating_sub(self.removed_bytes)
    }

    /// Live records: total minus removed, signed.
    #[must_use]
    pub fn real_records(&self) -> i64 {
        to_i64(self.total_records).saturating_sub(to_i64(self.removed_records))
    }

    /// Add one backend's counters.
    #[must_use]
    pub const fn accumulate(self, vfs: &BackendVfsStat) -> Self {
        Self {
            used_bytes: self.used_bytes.saturating_add(vfs.backend_used_size),
            removed_bytes: self.removed_bytes.saturating_add(vfs.backend_removed_size),
            total_records: self.total_records.saturating_add(vfs.records_total),
            removed_records: self.removed_records.saturating_add(vfs.records_removed),
            size_limit_bytes: self.size_limit_bytes.saturating_add(vfs.total_size_limit),
        }
    }

    /// Field-wise integer mean; `None` when `stats` is empty.
    #[must_use]
    pub fn mean<'a, I>(stats: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Self>,
    {
        let stats: Vec<&Self> = stats.into_iter().collect();
        let count = u128::try_from(stats.len()).ok().filter(|n| *n > 0)?;
        let avg = |field: fn(&Self) -> u64| {
            let sum = stats
                .iter()
                .fold(0u128, |acc, s| acc.saturating_add(u128::from(field(s))));
            u64::try_from(sum.checked_div(count).unwrap_or(0)).unwrap_or(u64::MAX)
        };

        Some(Self {
            used_bytes: avg(|s| s.used_bytes),
            removed_bytes: avg(|s| s.removed_bytes),
            total_records: avg(|s| s.total_records),
            removed_records: avg(|s| s.removed_records),
            size_limit_bytes: avg(|s| s.size_limit_bytes),
        })
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Source of bucket placement and group volume statistics.
pub trait BackendStats {
    /// Groups holding `bucket`, in metadata order.
    ///
    /// # Errors
    ///
    /// Returns `Error::BucketNotFound` if the bucket metadata cannot be read
    /// or lists no groups.
    fn resolve_bucket_groups(&self, bucket: &str) -> Result<Vec<GroupId>>;

    /// Rolled-up volume counters of `group`.
    ///
    /// # Errors
    ///
    /// Returns `Error::StatsUnavailable` if the group has no statistics.
    fn group_volume_stats(&self, group: GroupId) -> Result<GroupVolumeStat>;
}

impl<T: BackendStats + ?Sized> BackendStats for &T {
    fn resolve_bucket_groups(&self, bucket: &str) -> Result<Vec<GroupId>> {
        (**self).resolve_bucket_groups(bucket)
    }

    fn group_volume_stats(&self, group: GroupId) -> Result<GroupVolumeStat> {
        (**self).group_volume_stats(group)
    }
}

/// Backend statistics held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    buckets: HashMap<String, Vec<GroupId>>,
    groups: HashMap<GroupId, GroupVolumeStat>,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Place `bucket` in `groups` (builder style).
    #[must_use]
    pub fn with_bucket(mut self, bucket: impl Into<String>, groups: &[u32]) -> Self {
        self.buckets
            .insert(bucket.into(), groups.iter().copied().map(GroupId).collect());
        self
    }

    /// Set the rolled-up stats of `group` (builder style).
    #[must_use]
    pub fn with_group(mut self, group: u32, stat: GroupVolumeStat) -> Self {
        self.groups.insert(GroupId(group), stat);
        self
    }

    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

impl BackendStats for InMemoryBackend {
    fn resolve_bucket_groups(&self, bucket: &str) -> Result<Vec<GroupId>> {
        match self.buckets.get(bucket) {
            Some(groups) if !groups.is_empty() => Ok(groups.clone()),
            Some(_) => Err(Error::bucket_not_found(bucket, "no groups assigned")),
            None => Err(Error::bucket_not_found(bucket, "no bucket metadata")),
        }
    }

    fn group_volume_stats(&self, group: GroupId) -> Result<GroupVolumeStat> {
        self.groups
            .get(&group)
            .copied()
            .ok_or_else(|| Error::stats_unavailable(group.0, "group is absent from cluster stats"))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// STATS SNAPSHOT
// ═══════════════════════════════════════════════════════════════════════════

/// VFS counters reported by one backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendVfsStat {
    pub backend_used_size: u64,
    pub backend_removed_size: u64,
    pub records_total: u64,
    pub records_removed: u64,
    pub total_size_limit: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketMeta {
    pub groups: Vec<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotGroup {
    pub backends: Vec<SnapshotBackendEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotBackendEntry {
    pub backend_id: u32,
    pub vfs: BackendVfsStat,
}

/// JSON dump of cluster statistics.
///
/// ```json
/// {
///   "buckets": { "alpha": { "groups": [1, 2] } },
///   "groups": {
///     "1": { "backends": [ { "backend_id": 0, "vfs": { "backend_used_size": 1024,
///            "backend_removed_size": 24, "records_total": 15, "records_removed": 3,
///            "total_size_limit": 4096 } } ] }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsSnapshot {
    pub buckets: BTreeMap<String, BucketMeta>,
    pub groups: BTreeMap<u32, SnapshotGroup>,
}

impl StatsSnapshot {
    /// Read a snapshot from disk.
    ///
    /// # Errors
    ///
    /// Returns `Error::SnapshotParse` if the file cannot be read or is not
    /// valid snapshot JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::snapshot_parse(path, format!("cannot read file: {e}")))?;
        Self::from_json(&content).map_err(|e| match e {
            Error::SnapshotParse { reason, .. } => Error::snapshot_parse(path, reason),
            other => other,
        })
    }

    /// Parse snapshot JSON.
    ///
    /// # Errors
    ///
    /// Returns `Error::SnapshotParse` on malformed JSON.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::snapshot_parse("<inline>", e.to_string()))
    }

    /// Roll every group's backends up and index the result.
    #[must_use]
    pub fn into_backend(self) -> InMemoryBackend {
        let groups = self
            .groups
            .into_iter()
            .map(|(id, group)| {
                let stat = group
                    .backends
                    .iter()
                    .fold(GroupVolumeStat::default(), |acc, b| acc.accumulate(&b.vfs));
                (GroupId(id), stat)
            })
            .collect();

        let buckets = self
            .buckets
            .into_iter()
            .map(|(name, meta)| (name, meta.groups.into_iter().map(GroupId).collect()))
            .collect();

        InMemoryBackend { buckets, groups }
    }
}
