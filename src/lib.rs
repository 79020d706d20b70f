use std::path::PathBuf;

/// Cgroup Metrics Validator: checks the values reported by a container metrics provider
/// against the raw cgroup filesystem of the same process.
///
/// The library resolves the per-controller cgroup directories from `/proc/<pid>/mountinfo`
/// and `/proc/<pid>/cgroup` (v1 and v2 layouts), parses and normalizes the controller
/// files, and cross-validates them with a tolerance margin.
pub mod cgroup;
pub mod error;
pub mod fsutil;
pub mod mountinfo;
pub mod provider;
pub mod validator;

/// Runs one validation pass.
///
/// Reads its configuration from the environment:
/// - `CGROUP_PROC_PATH`: directory with the inspected process's `mountinfo` and `cgroup`
///   files, defaults to `/proc/self`.
/// - `METRICS_SNAPSHOT_PATH`: JSON snapshot of the provider's values, required.
///
/// Hosts without any cgroup filesystem pass without checks.
///
/// # Errors
///
/// Possible errors include:
/// - Missing `METRICS_SNAPSHOT_PATH`.
/// - An unreadable or malformed snapshot.
/// - A provider value that does not match the cgroup filesystem.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let proc_dir = std::env::var_os("CGROUP_PROC_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/proc/self"));
    let snapshot_path = std::env::var_os("METRICS_SNAPSHOT_PATH")
        .map(PathBuf::from)
        .ok_or("environment variable `METRICS_SNAPSHOT_PATH` must be set")?;
    log::debug!("Inspecting cgroups of `{}`", proc_dir.display());

    let metrics = provider::MetricsSnapshot::from_path(&snapshot_path)?;
    let topology = cgroup::Topology::from_proc(&proc_dir);

    let Some(mut validator) = validator::select(&topology, metrics) else {
        log::info!("No cgroup filesystem found, nothing to validate");
        return Ok(());
    };

    let report = validator.run_all()?;
    log::info!("Validation of `{}` passed: {report}", validator.version());
    Ok(())
}
