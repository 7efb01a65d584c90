//! Run-mode selectors shared by configuration, the CLI and the engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// How a log file's lines are interpreted and accumulated.
///
/// Selected once per scan; every line of that file goes through the same
/// grammar and the same accumulator operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanMode {
    /// `bucket/key` lines; bumps the bucket's record count without tracking keys.
    #[default]
    CountOnly,
    /// Access-log lines containing `/get/bucket/key`; tracks distinct keys.
    KeyedUrlPath,
    /// `bucket/key <size>` listings matched against previously observed keys.
    SizeMatch,
}

impl ScanMode {
    /// Stable name used in config files, env vars and log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CountOnly => "count-only",
            Self::KeyedUrlPath => "keyed-url-path",
            Self::SizeMatch => "size-match",
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "count-only" => Ok(Self::CountOnly),
            "keyed-url-path" => Ok(Self::KeyedUrlPath),
            "size-match" => Ok(Self::SizeMatch),
            other => Err(Error::invalid_config(format!(
                "unknown scan mode '{other}' (expected count-only, keyed-url-path or size-match)"
            ))),
        }
    }
}

/// Which replica group's stats stand for a bucket replicated across groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplicaPolicy {
    /// First group in resolution order.
    #[default]
    First,
    /// Group with the largest real record count.
    Max,
    /// Integer mean of every group's counters.
    Mean,
}

impl ReplicaPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Max => "max",
            Self::Mean => "mean",
        }
    }
}

impl fmt::Display for ReplicaPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplicaPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "first" => Ok(Self::First),
            "max" => Ok(Self::Max),
            "mean" => Ok(Self::Mean),
            other => Err(Error::invalid_config(format!(
                "unknown replica policy '{other}' (expected first, max or mean)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_mode_parse() -> Result<(), Error> {
        assert_eq!("count-only".parse::<ScanMode>()?, ScanMode::CountOnly);
        assert_eq!("keyed-url-path".parse::<ScanMode>()?, ScanMode::KeyedUrlPath);
        assert_eq!(" size-match ".parse::<ScanMode>()?, ScanMode::SizeMatch);
        Ok(())
    }

    #[test]
    fn test_scan_mode_rejects_unknown() {
        let err = "keyed".parse::<ScanMode>();
        assert!(matches!(err, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_replica_policy_display_matches_parse() -> Result<(), Error> {
        for policy in [ReplicaPolicy::First, ReplicaPolicy::Max, ReplicaPolicy::Mean] {
            assert_eq!(policy.to_string().parse::<ReplicaPolicy>()?, policy);
        }
        Ok(())
    }
}
