//! Configuration loading and management
//!
//! # Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Global config: ~/.config/bucket-audit/config.toml
//! 3. Explicit config file (`--config`)
//! 4. Environment variables: `BUCKET_AUDIT_*`
//! 5. CLI flags (applied by the binary)
//!
//! # Example Config
//!
//! ```toml
//! [cluster]
//! stats_snapshot = "/var/lib/bucket-audit/stats.json"
//!
//! [scan]
//! mode = "keyed-url-path"
//!
//! [report]
//! replica_policy = "first"
//! sort_buckets = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, ReplicaPolicy, Result, ScanMode};

const ENV_PREFIX: &str = "BUCKET_AUDIT_";

// ═══════════════════════════════════════════════════════════════════════════
// CONFIGURATION STRUCTURES
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AuditConfig {
    pub cluster: ClusterConfig,
    pub scan: ScanConfig,
    pub report: ReportConfig,
}

/// How to reach the backend statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClusterConfig {
    /// JSON dump of bucket metadata and per-backend VFS counters.
    pub stats_snapshot: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScanConfig {
    pub mode: ScanMode,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReportConfig {
    pub replica_policy: ReplicaPolicy,
    pub sort_buckets: bool,
}

/// One config file as written: absent keys stay `None` so a later layer
/// only overrides what it actually sets.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
struct ConfigLayer {
    cluster: ClusterLayer,
    scan: ScanLayer,
    report: ReportLayer,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
struct ClusterLayer {
    stats_snapshot: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
struct ScanLayer {
    mode: Option<ScanMode>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
struct ReportLayer {
    replica_policy: Option<ReplicaPolicy>,
    sort_buckets: Option<bool>,
}

// ═══════════════════════════════════════════════════════════════════════════
// PUBLIC API
// ═══════════════════════════════════════════════════════════════════════════

impl AuditConfig {
    /// Load configuration from all sources with hierarchy.
    ///
    /// `vars` is the process environment (or a fixed list in tests); only
    /// `BUCKET_AUDIT_*` keys are consulted.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - An explicit config file cannot be read
    /// - A config file is malformed TOML
    /// - An environment override holds an unknown value
    pub fn load<I>(explicit: Option<&Path>, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        // 1. Start with built-in defaults
        let mut config = Self::default();

        // 2. Load global config if exists
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                config.merge(load_toml_file(&global_path)?);
            }
        }

        // 3. Explicit file must exist when given
        if let Some(path) = explicit {
            config.merge(load_toml_file(path)?);
        }

        // 4. Apply environment variable overrides
        config.apply_env_vars(vars)?;

        Ok(config)
    }

    /// Check that the config can drive a run.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if no stats snapshot is configured.
    pub fn validate(&self) -> Result<()> {
        match &self.cluster.stats_snapshot {
            Some(path) if !path.as_os_str().is_empty() => Ok(()),
            _ => Err(Error::invalid_config(
                "cluster.stats_snapshot is not set (use --stats or BUCKET_AUDIT_STATS_SNAPSHOT)",
            )),
        }
    }

    /// Apply `BUCKET_AUDIT_*` overrides.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for unparsable values.
    pub fn apply_env_vars<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "STATS_SNAPSHOT" => self.cluster.stats_snapshot = Some(PathBuf::from(value)),
                "SCAN_MODE" => self.scan.mode = value.parse()?,
                "REPLICA_POLICY" => self.report.replica_policy = value.parse()?,
                "SORT_BUCKETS" => self.report.sort_buckets = parse_bool(&key, &value)?,
                _ => tracing::debug!(key = %key, "Ignoring unknown environment override"),
            }
        }
        Ok(())
    }

    /// Overlay one file layer; keys the layer does not set keep their value.
    fn merge(&mut self, layer: ConfigLayer) {
        if let Some(path) = layer.cluster.stats_snapshot {
            self.cluster.stats_snapshot = Some(path);
        }
        if let Some(mode) = layer.scan.mode {
            self.scan.mode = mode;
        }
        if let Some(policy) = layer.report.replica_policy {
            self.report.replica_policy = policy;
        }
        if let Some(sort) = layer.report.sort_buckets {
            self.report.sort_buckets = sort;
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// HELPER FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════

/// Get path to global config file
fn global_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "bucket-audit")
        .map(|proj_dirs| proj_dirs.config_dir().join("config.toml"))
}

/// Load a TOML file into a partial config
///
/// # Errors
///
/// Returns error if:
/// - File cannot be read
/// - TOML is malformed
fn load_toml_file(path: &Path) -> Result<ConfigLayer> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::config_parse(path, format!("cannot read file: {e}")))?;

    toml::from_str(&content).map_err(|e| Error::config_parse(path, e.to_string()))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::invalid_config(format!(
            "{key}: expected a boolean, got '{other}'"
        ))),
    }
}
