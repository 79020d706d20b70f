//! Cross-validation of a metrics provider against the raw cgroup filesystem.
//!
//! A [`CgroupMetricsValidator`] is selected once per run from the detected
//! [`Topology`]: [`V1Validator`] for per-controller hierarchies, [`V2Validator`] for the
//! unified hierarchy. Both read the same metric groups from different files and apply
//! the normalization rules of their layout before comparing.
//!
//! Configuration-class metrics (limits, CPU period, quota and shares, cpuset membership,
//! boolean flags, the provider name) fail the run on mismatch. Live counters only warn,
//! since the two readings are taken moments apart on a running system.

mod compare;
mod error;
mod v1;
mod v2;
mod workload;

use std::fmt;

use crate::cgroup::{CgroupVersion, Controller, Topology};
use crate::provider::Metrics;

pub use compare::{
    Checker, ERROR_MARGIN, compare_with_error_margin, compare_with_error_margin_f64,
};
pub use error::{Error, Result};
pub use v1::V1Validator;
pub use v2::V2Validator;
pub use workload::{MEMORY_CHUNK_SIZE, Workload};

/// Outcome counts of a validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub passed: usize,
    /// Live counters that drifted beyond the margin.
    pub warned: usize,
    /// Individual metrics whose file does not exist.
    pub unavailable: usize,
    /// Metric groups whose controller is not available.
    pub skipped: Vec<&'static str>,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passed, {} warned, {} unavailable",
            self.passed, self.warned, self.unavailable
        )?;
        if !self.skipped.is_empty() {
            write!(f, ", skipped groups: {}", self.skipped.join(", "))?;
        }
        Ok(())
    }
}

/// The checks every layout provides.
pub trait CgroupMetricsValidator {
    fn version(&self) -> CgroupVersion;

    fn test_memory_subsystem(&mut self) -> Result<()>;
    fn test_cpu_accounting(&mut self) -> Result<()>;
    fn test_cpu_scheduling(&mut self) -> Result<()>;
    fn test_cpusets(&mut self) -> Result<()>;
    fn test_io(&mut self) -> Result<()>;
    /// Burns CPU and checks that the cumulative usage counters did not go backwards.
    fn test_cpu_consumption(&mut self) -> Result<()>;
    /// Touches memory and checks that usage did not go backwards.
    fn test_memory_usage(&mut self) -> Result<()>;
    /// Checks the provider name against the detected layout.
    fn test_misc(&mut self) -> Result<()>;

    fn report(&self) -> &Report;

    /// Runs every group in order and stops at the first failure.
    fn run_all(&mut self) -> Result<Report> {
        self.test_memory_subsystem()?;
        self.test_cpu_accounting()?;
        self.test_cpu_scheduling()?;
        self.test_cpusets()?;
        self.test_io()?;
        self.test_cpu_consumption()?;
        self.test_memory_usage()?;
        self.test_misc()?;
        Ok(self.report().clone())
    }
}

/// Picks the profile matching the detected layout and resolves its controller
/// directories once.
///
/// Returns `None` on hosts without any cgroup filesystem.
pub fn select<M>(topology: &Topology, metrics: M) -> Option<Box<dyn CgroupMetricsValidator>>
where
    M: Metrics + 'static,
{
    let version = topology.version()?;
    let paths = topology.resolve_all();
    log::info!(
        "Validating `{version}` provider with {} resolved controllers",
        paths.len()
    );

    let validator: Box<dyn CgroupMetricsValidator> = match version {
        CgroupVersion::V1 => Box::new(V1Validator::new(metrics, paths)),
        CgroupVersion::V2 => Box::new(V2Validator::new(metrics, paths)),
    };
    Some(validator)
}

/// Cumulative CPU counters captured when a validator is built.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StartUsage {
    total: i64,
    user: i64,
    system: i64,
    per_cpu_total: i64,
}

impl StartUsage {
    fn capture(metrics: &impl Metrics) -> Self {
        Self {
            total: metrics.cpu_usage(),
            user: metrics.cpu_user_usage(),
            system: metrics.cpu_system_usage(),
            per_cpu_total: metrics.per_cpu_usage().iter().sum(),
        }
    }
}

fn check_cpu_consumption(
    checker: &mut Checker,
    metrics: &impl Metrics,
    start: &StartUsage,
    workload: &Workload,
    per_cpu: bool,
) -> Result<()> {
    if metrics.is_live() {
        workload.burn_cpu();
    }

    let controller = Controller::Cpuacct;
    checker.expect_not_decreased(controller, "usage", start.total, metrics.cpu_usage())?;
    checker.expect_not_decreased(controller, "usage_user", start.user, metrics.cpu_user_usage())?;
    checker.expect_not_decreased(
        controller,
        "usage_sys",
        start.system,
        metrics.cpu_system_usage(),
    )?;
    if per_cpu {
        let current = metrics.per_cpu_usage().iter().sum();
        checker.expect_not_decreased(controller, "usage_percpu", start.per_cpu_total, current)?;
    }
    Ok(())
}

fn check_memory_usage(
    checker: &mut Checker,
    metrics: &impl Metrics,
    workload: &Workload,
    max_usage: bool,
) -> Result<()> {
    let usage = metrics.memory_usage();
    let max = metrics.memory_max_usage();

    let chunks = if metrics.is_live() {
        workload.touch_memory(|| metrics.memory_usage() > usage)
    } else {
        Vec::new()
    };
    log::debug!(
        "Touched {} MiB of memory",
        chunks.len() * MEMORY_CHUNK_SIZE / (1024 * 1024)
    );

    let controller = Controller::Memory;
    checker.expect_not_decreased(controller, "usage", usage, metrics.memory_usage())?;
    if max_usage {
        checker.expect_not_decreased(controller, "max_usage", max, metrics.memory_max_usage())?;
    }
    drop(chunks);
    Ok(())
}
