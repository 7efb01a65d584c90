//! Per-bucket state accumulated from scanned log files.
//!
//! One [`BucketAccumulator`] is owned by the caller for the whole run and is
//! passed by reference to every scan. Record counts are additive: they do not
//! depend on the order files or lines were fed in. Keys are raw bytes.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Log-derived facts about one bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketStat {
    /// Log-derived records: counted lines plus distinct inserted keys.
    key_count: u64,
    /// Observed key to size in bytes (0 when unknown).
    observed_keys: HashMap<Vec<u8>, u64>,
    /// Raw `insert` calls, duplicates included.
    insert_calls: u64,
    matched_size_total: u64,
    unmatched_size_total: u64,
    /// Set once any size listing line named this bucket.
    size_listed: bool,
}

impl BucketStat {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one record without tracking its key.
    pub const fn increment_count(&mut self) {
        self.key_count = self.key_count.saturating_add(1);
    }

    /// Record `key` with size 0, resetting the size of a key seen before.
    ///
    /// Returns `true` when the key is new. Only new keys grow `key_count`;
    /// the raw call counter grows either way.
    pub fn insert(&mut self, key: impl AsRef<[u8]>) -> bool {
        self.insert_calls = self.insert_calls.saturating_add(1);
        self.insert_size(key, 0)
    }

    /// Set the size of `key`, overwriting any previous size.
    ///
    /// Returns `true` when the key is new; a new key grows `key_count`.
    pub fn insert_size(&mut self, key: impl AsRef<[u8]>, size: u64) -> bool {
        match self.observed_keys.entry(key.as_ref().to_vec()) {
            Entry::Occupied(mut entry) => {
                entry.insert(size);
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(size);
                self.key_count = self.key_count.saturating_add(1);
                true
            }
        }
    }

    /// Attribute `size` to an observed key, or to the unmatched total.
    ///
    /// Returns `true` when the key had been observed.
    pub fn match_size(&mut self, key: impl AsRef<[u8]>, size: u64) -> bool {
        self.size_listed = true;
        match self.observed_keys.get_mut(key.as_ref()) {
            Some(slot) => {
                *slot = size;
                self.matched_size_total = self.matched_size_total.saturating_add(size);
                true
            }
            None => {
                self.unmatched_size_total = self.unmatched_size_total.saturating_add(size);
                false
            }
        }
    }

    #[must_use]
    pub const fn key_count(&self) -> u64 {
        self.key_count
    }

    #[must_use]
    pub const fn observed_keys(&self) -> &HashMap<Vec<u8>, u64> {
        &self.observed_keys
    }

    #[must_use]
    pub fn has_key(&self, key: impl AsRef<[u8]>) -> bool {
        self.observed_keys.contains_key(key.as_ref())
    }

    #[must_use]
    pub fn size_of(&self, key: impl AsRef<[u8]>) -> Option<u64> {
        self.observed_keys.get(key.as_ref()).copied()
    }

    #[must_use]
    pub const fn insert_calls(&self) -> u64 {
        self.insert_calls
    }

    #[must_use]
    pub const fn matched_size_total(&self) -> u64 {
        self.matched_size_total
    }

    #[must_use]
    pub const fn unmatched_size_total(&self) -> u64 {
        self.unmatched_size_total
    }

    /// Whether any size listing touched this bucket, zero sizes included.
    #[must_use]
    pub const fn has_size_data(&self) -> bool {
        self.size_listed
    }
}

/// Bucket name to [`BucketStat`] mapping for one run.
#[derive(Debug, Clone, Default)]
pub struct BucketAccumulator {
    buckets: HashMap<String, BucketStat>,
}

impl BucketAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the stat for `name`, creating it on first access.
    pub fn ensure_bucket(&mut self, name: &str) -> &mut BucketStat {
        self.buckets.entry(name.to_owned()).or_default()
    }

    /// Insert `key` into `bucket`; returns `true` for a new key.
    pub fn insert(&mut self, bucket: &str, key: impl AsRef<[u8]>) -> bool {
        self.ensure_bucket(bucket).insert(key)
    }

    /// Count one record for `bucket`.
    pub fn increment_count(&mut self, bucket: &str) {
        self.ensure_bucket(bucket).increment_count();
    }

    /// Match a listed size against `bucket`'s observed keys.
    ///
    /// Size listings never create buckets: a bucket no log line produced is
    /// left out and `false` is returned.
    pub fn match_size(&mut self, bucket: &str, key: impl AsRef<[u8]>, size: u64) -> bool {
        self.buckets
            .get_mut(bucket)
            .is_some_and(|stat| stat.match_size(key, size))
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BucketStat> {
        self.buckets.get(name)
    }

    /// Iterate buckets in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BucketStat)> {
        self.buckets.iter().map(|(name, stat)| (name.as_str(), stat))
    }

    /// Number of distinct buckets seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Sum of log-derived records over all buckets.
    #[must_use]
    pub fn total_key_count(&self) -> u64 {
        self.buckets
            .values()
            .fold(0u64, |acc, stat| acc.saturating_add(stat.key_count()))
    }
}
