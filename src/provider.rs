//! The high-level metrics provider whose values are validated against the cgroup files.
//!
//! The validator only consumes [`Metrics`]. Units follow the provider's conventions:
//! memory in bytes, CPU time in nanoseconds, CPU period and quota in microseconds, and
//! `-1` for "unlimited" or "not configured".
//!
//! [`MetricsSnapshot`] implements the trait from a JSON document, so values exported by
//! an external provider can be checked against the live cgroup tree of the same process.

use std::path::{Path, PathBuf};

use crate::fsutil::{self, FileOpenError};

/// Read-only view of a metrics provider.
pub trait Metrics {
    /// `cgroupv1` or `cgroupv2`.
    fn provider_name(&self) -> String;

    fn memory_limit(&self) -> i64;
    fn memory_usage(&self) -> i64;
    fn memory_max_usage(&self) -> i64;
    fn memory_fail_count(&self) -> i64;
    fn memory_soft_limit(&self) -> i64;
    fn memory_and_swap_limit(&self) -> i64;
    fn memory_and_swap_usage(&self) -> i64;
    fn is_memory_oom_kill_enabled(&self) -> bool;

    /// Total CPU time in nanoseconds.
    fn cpu_usage(&self) -> i64;
    fn cpu_user_usage(&self) -> i64;
    fn cpu_system_usage(&self) -> i64;
    /// CPU time per CPU in nanoseconds.
    fn per_cpu_usage(&self) -> Vec<i64>;

    /// CFS period in microseconds.
    fn cpu_period(&self) -> i64;
    /// CFS quota in microseconds, `-1` if unlimited.
    fn cpu_quota(&self) -> i64;
    /// v1-style shares, `-1` if not configured.
    fn cpu_shares(&self) -> i64;
    fn cpu_num_periods(&self) -> i64;
    fn cpu_num_throttled(&self) -> i64;
    /// Throttled time in nanoseconds.
    fn cpu_throttled_time(&self) -> i64;

    fn cpu_set_cpus(&self) -> Vec<u32>;
    fn effective_cpu_set_cpus(&self) -> Vec<u32>;
    fn cpu_set_mems(&self) -> Vec<u32>;
    fn effective_cpu_set_mems(&self) -> Vec<u32>;
    fn is_cpu_set_memory_pressure_enabled(&self) -> bool;
    fn cpu_set_memory_pressure(&self) -> f64;

    /// Number of block I/O operations.
    fn blkio_service_count(&self) -> i64;
    /// Number of bytes transferred by block I/O.
    fn blkio_serviced(&self) -> i64;

    /// Whether the values follow the running process. The synthetic workloads are only
    /// worth running against a live provider.
    fn is_live(&self) -> bool {
        true
    }
}

/// Error that occurs while loading a [`MetricsSnapshot`].
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Open(#[from] FileOpenError),
    #[error("failed to parse metrics snapshot `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Provider values captured at one point in time.
///
/// Fields missing from the JSON document take their `Default` value.
///
/// # Example
///
/// ```
/// use cgroup_metrics_validator::provider::{Metrics, MetricsSnapshot};
///
/// let snapshot: MetricsSnapshot =
///     serde_json::from_str(r#"{ "provider_name": "cgroupv2", "memory_limit": -1 }"#).unwrap();
/// assert_eq!(snapshot.provider_name(), "cgroupv2");
/// assert_eq!(snapshot.memory_limit(), -1);
/// assert_eq!(snapshot.cpu_usage(), 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct MetricsSnapshot {
    pub provider_name: String,
    pub memory_limit: i64,
    pub memory_usage: i64,
    pub memory_max_usage: i64,
    pub memory_fail_count: i64,
    pub memory_soft_limit: i64,
    pub memory_and_swap_limit: i64,
    pub memory_and_swap_usage: i64,
    pub memory_oom_kill_enabled: bool,
    pub cpu_usage: i64,
    pub cpu_user_usage: i64,
    pub cpu_system_usage: i64,
    pub per_cpu_usage: Vec<i64>,
    pub cpu_period: i64,
    pub cpu_quota: i64,
    pub cpu_shares: i64,
    pub cpu_num_periods: i64,
    pub cpu_num_throttled: i64,
    pub cpu_throttled_time: i64,
    pub cpu_set_cpus: Vec<u32>,
    pub effective_cpu_set_cpus: Vec<u32>,
    pub cpu_set_mems: Vec<u32>,
    pub effective_cpu_set_mems: Vec<u32>,
    pub cpu_set_memory_pressure_enabled: bool,
    pub cpu_set_memory_pressure: f64,
    pub blkio_service_count: i64,
    pub blkio_serviced: i64,
}

impl MetricsSnapshot {
    /// Loads a snapshot from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] if the file cannot be opened or is not a valid snapshot.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let reader = fsutil::open_file_reader(path)?;
        let snapshot =
            serde_json::from_reader(reader).map_err(|source| SnapshotError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        log::debug!("Loaded metrics snapshot from `{}`", path.display());
        Ok(snapshot)
    }
}

impl Metrics for MetricsSnapshot {
    fn provider_name(&self) -> String {
        self.provider_name.clone()
    }

    fn is_live(&self) -> bool {
        false
    }

    fn memory_limit(&self) -> i64 {
        self.memory_limit
    }

    fn memory_usage(&self) -> i64 {
        self.memory_usage
    }

    fn memory_max_usage(&self) -> i64 {
        self.memory_max_usage
    }

    fn memory_fail_count(&self) -> i64 {
        self.memory_fail_count
    }

    fn memory_soft_limit(&self) -> i64 {
        self.memory_soft_limit
    }

    fn memory_and_swap_limit(&self) -> i64 {
        self.memory_and_swap_limit
    }

    fn memory_and_swap_usage(&self) -> i64 {
        self.memory_and_swap_usage
    }

    fn is_memory_oom_kill_enabled(&self) -> bool {
        self.memory_oom_kill_enabled
    }

    fn cpu_usage(&self) -> i64 {
        self.cpu_usage
    }

    fn cpu_user_usage(&self) -> i64 {
        self.cpu_user_usage
    }

    fn cpu_system_usage(&self) -> i64 {
        self.cpu_system_usage
    }

    fn per_cpu_usage(&self) -> Vec<i64> {
        self.per_cpu_usage.clone()
    }

    fn cpu_period(&self) -> i64 {
        self.cpu_period
    }

    fn cpu_quota(&self) -> i64 {
        self.cpu_quota
    }

    fn cpu_shares(&self) -> i64 {
        self.cpu_shares
    }

    fn cpu_num_periods(&self) -> i64 {
        self.cpu_num_periods
    }

    fn cpu_num_throttled(&self) -> i64 {
        self.cpu_num_throttled
    }

    fn cpu_throttled_time(&self) -> i64 {
        self.cpu_throttled_time
    }

    fn cpu_set_cpus(&self) -> Vec<u32> {
        self.cpu_set_cpus.clone()
    }

    fn effective_cpu_set_cpus(&self) -> Vec<u32> {
        self.effective_cpu_set_cpus.clone()
    }

    fn cpu_set_mems(&self) -> Vec<u32> {
        self.cpu_set_mems.clone()
    }

    fn effective_cpu_set_mems(&self) -> Vec<u32> {
        self.effective_cpu_set_mems.clone()
    }

    fn is_cpu_set_memory_pressure_enabled(&self) -> bool {
        self.cpu_set_memory_pressure_enabled
    }

    fn cpu_set_memory_pressure(&self) -> f64 {
        self.cpu_set_memory_pressure
    }

    fn blkio_service_count(&self) -> i64 {
        self.blkio_service_count
    }

    fn blkio_serviced(&self) -> i64 {
        self.blkio_serviced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            r#"{
                "provider_name": "cgroupv1",
                "memory_limit": 536870912,
                "cpu_set_cpus": [0, 1, 2, 3],
                "cpu_set_memory_pressure": 0.5,
                "unknown_field": true
            }"#,
        )
        .unwrap();

        let snapshot = MetricsSnapshot::from_path(file.path()).unwrap();
        assert_eq!(snapshot.provider_name(), "cgroupv1");
        assert_eq!(snapshot.memory_limit(), 536_870_912);
        assert_eq!(snapshot.cpu_set_cpus(), vec![0, 1, 2, 3]);
        assert_eq!(snapshot.cpu_set_memory_pressure(), 0.5);
        assert!(!snapshot.is_memory_oom_kill_enabled());
    }

    #[test]
    fn test_from_path_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");

        match MetricsSnapshot::from_path(&path).unwrap_err() {
            SnapshotError::Open(err) => assert_eq!(err.path, path),
            err => panic!("Expected Open error, got {err}"),
        }
    }

    #[test]
    fn test_from_path_invalid_json() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "{ \"memory_limit\": \"lots\" }").unwrap();

        match MetricsSnapshot::from_path(file.path()).unwrap_err() {
            SnapshotError::Parse { path, .. } => assert_eq!(path, file.path()),
            err => panic!("Expected Parse error, got {err}"),
        }
    }
}
