use crate::cgroup::stats::CpuStat;
use crate::cgroup::{CgroupVersion, Controller, ControllerPaths, files, normalize};
use crate::provider::Metrics;

use super::{
    CgroupMetricsValidator, Checker, Report, Result, StartUsage, Workload,
    check_cpu_consumption, check_memory_usage,
};

/// Nanoseconds per `cpuacct.stat` tick, assuming `USER_HZ` is 100.
const NANOS_PER_TICK: i64 = 10_000_000;

/// Validator for hosts with per-controller (v1) hierarchies.
pub struct V1Validator<M> {
    metrics: M,
    paths: ControllerPaths,
    checker: Checker,
    start: StartUsage,
    workload: Workload,
}

impl<M: Metrics> V1Validator<M> {
    /// Captures the provider's starting CPU counters for [`CgroupMetricsValidator::test_cpu_consumption`].
    pub fn new(metrics: M, paths: ControllerPaths) -> Self {
        let start = StartUsage::capture(&metrics);
        Self {
            metrics,
            paths,
            checker: Checker::default(),
            start,
            workload: Workload::default(),
        }
    }

    pub fn with_workload(mut self, workload: Workload) -> Self {
        self.workload = workload;
        self
    }
}

impl<M: Metrics> CgroupMetricsValidator for V1Validator<M> {
    fn version(&self) -> CgroupVersion {
        CgroupVersion::V1
    }

    fn test_memory_subsystem(&mut self) -> Result<()> {
        let controller = Controller::Memory;
        let Some(dir) = self.paths.get(controller) else {
            self.checker.skip_group("memory");
            return Ok(());
        };
        let metrics = &self.metrics;
        let limit = |file: &str| files::read_long(dir, file).map(normalize::limit_v1);

        self.checker.expect(
            controller,
            "memory.limit_in_bytes",
            metrics.memory_limit(),
            limit("memory.limit_in_bytes"),
        )?;
        self.checker.expect(
            controller,
            "memory.soft_limit_in_bytes",
            metrics.memory_soft_limit(),
            limit("memory.soft_limit_in_bytes"),
        )?;
        self.checker.expect(
            controller,
            "memory.memsw.limit_in_bytes",
            metrics.memory_and_swap_limit(),
            limit("memory.memsw.limit_in_bytes"),
        )?;
        self.checker.expect_flag(
            controller,
            "memory.oom_control",
            metrics.is_memory_oom_kill_enabled(),
            files::read_table_value(dir, "memory.oom_control", "oom_kill_disable")
                .map(|disabled| disabled == 0),
        )?;

        self.checker.observe(
            controller,
            "memory.usage_in_bytes",
            metrics.memory_usage(),
            files::read_long(dir, "memory.usage_in_bytes"),
        );
        self.checker.observe(
            controller,
            "memory.max_usage_in_bytes",
            metrics.memory_max_usage(),
            files::read_long(dir, "memory.max_usage_in_bytes"),
        );
        self.checker.observe(
            controller,
            "memory.failcnt",
            metrics.memory_fail_count(),
            files::read_long(dir, "memory.failcnt"),
        );
        self.checker.observe(
            controller,
            "memory.memsw.usage_in_bytes",
            metrics.memory_and_swap_usage(),
            files::read_long(dir, "memory.memsw.usage_in_bytes"),
        );
        Ok(())
    }

    fn test_cpu_accounting(&mut self) -> Result<()> {
        let controller = Controller::Cpuacct;
        let Some(dir) = self.paths.get(controller) else {
            self.checker.skip_group("cpuacct");
            return Ok(());
        };
        let metrics = &self.metrics;
        // Older kernels only expose user and system time as ticks in cpuacct.stat.
        let split_usage = |file: &str, key: &str| {
            files::read_long(dir, file).or_else(|| {
                files::read_table_value(dir, "cpuacct.stat", key)
                    .map(|ticks| ticks.saturating_mul(NANOS_PER_TICK))
            })
        };

        self.checker.observe(
            controller,
            "cpuacct.usage",
            metrics.cpu_usage(),
            files::read_long(dir, "cpuacct.usage"),
        );
        self.checker.observe(
            controller,
            "cpuacct.usage_user",
            metrics.cpu_user_usage(),
            split_usage("cpuacct.usage_user", "user"),
        );
        self.checker.observe(
            controller,
            "cpuacct.usage_sys",
            metrics.cpu_system_usage(),
            split_usage("cpuacct.usage_sys", "system"),
        );
        self.checker.observe_list(
            controller,
            "cpuacct.usage_percpu",
            &metrics.per_cpu_usage(),
            files::read_scalar(dir, "cpuacct.usage_percpu").map(|raw| normalize::parse_longs(&raw)),
        );
        Ok(())
    }

    fn test_cpu_scheduling(&mut self) -> Result<()> {
        let controller = Controller::Cpu;
        let Some(dir) = self.paths.get(controller) else {
            self.checker.skip_group("cpu");
            return Ok(());
        };
        let metrics = &self.metrics;

        self.checker.expect(
            controller,
            "cpu.cfs_period_us",
            metrics.cpu_period(),
            files::read_long(dir, "cpu.cfs_period_us"),
        )?;
        self.checker.expect(
            controller,
            "cpu.cfs_quota_us",
            metrics.cpu_quota(),
            files::read_long(dir, "cpu.cfs_quota_us"),
        )?;
        self.checker.expect(
            controller,
            "cpu.shares",
            metrics.cpu_shares(),
            files::read_long(dir, "cpu.shares").map(normalize::shares_v1),
        )?;

        let stat = files::read_stat::<CpuStat>(dir, "cpu.stat");
        self.checker.observe(
            controller,
            "cpu.stat nr_periods",
            metrics.cpu_num_periods(),
            stat.as_ref().map(|s| normalize::counter(s.nr_periods)),
        );
        self.checker.observe(
            controller,
            "cpu.stat nr_throttled",
            metrics.cpu_num_throttled(),
            stat.as_ref().map(|s| normalize::counter(s.nr_throttled)),
        );
        self.checker.observe(
            controller,
            "cpu.stat throttled_time",
            metrics.cpu_throttled_time(),
            stat.as_ref().map(|s| normalize::counter(s.throttled_time)),
        );
        Ok(())
    }

    fn test_cpusets(&mut self) -> Result<()> {
        let controller = Controller::Cpuset;
        let Some(dir) = self.paths.get(controller) else {
            self.checker.skip_group("cpuset");
            return Ok(());
        };
        let metrics = &self.metrics;

        self.checker.expect_set(
            controller,
            "cpuset.cpus",
            metrics.cpu_set_cpus(),
            files::try_read_range_list(dir, "cpuset.cpus"),
        )?;
        self.checker.expect_set(
            controller,
            "cpuset.effective_cpus",
            metrics.effective_cpu_set_cpus(),
            files::try_read_range_list(dir, "cpuset.effective_cpus"),
        )?;
        self.checker.expect_set(
            controller,
            "cpuset.mems",
            metrics.cpu_set_mems(),
            files::try_read_range_list(dir, "cpuset.mems"),
        )?;
        self.checker.expect_set(
            controller,
            "cpuset.effective_mems",
            metrics.effective_cpu_set_mems(),
            files::try_read_range_list(dir, "cpuset.effective_mems"),
        )?;
        self.checker.expect_flag(
            controller,
            "cpuset.memory_pressure_enabled",
            metrics.is_cpu_set_memory_pressure_enabled(),
            files::read_long(dir, "cpuset.memory_pressure_enabled").map(|enabled| enabled != 0),
        )?;
        self.checker.observe_f64(
            controller,
            "cpuset.memory_pressure",
            metrics.cpu_set_memory_pressure(),
            files::read_long(dir, "cpuset.memory_pressure").map(|pressure| pressure as f64),
        );
        Ok(())
    }

    fn test_io(&mut self) -> Result<()> {
        let controller = Controller::Blkio;
        let Some(dir) = self.paths.get(controller) else {
            self.checker.skip_group("blkio");
            return Ok(());
        };
        let metrics = &self.metrics;

        self.checker.observe(
            controller,
            "blkio.throttle.io_serviced",
            metrics.blkio_service_count(),
            files::read_table_value(dir, "blkio.throttle.io_serviced", "Total"),
        );
        self.checker.observe(
            controller,
            "blkio.throttle.io_service_bytes",
            metrics.blkio_serviced(),
            files::read_table_value(dir, "blkio.throttle.io_service_bytes", "Total"),
        );
        Ok(())
    }

    fn test_cpu_consumption(&mut self) -> Result<()> {
        if self.paths.get(Controller::Cpuacct).is_none() {
            self.checker.skip_group("cpu consumption");
            return Ok(());
        }
        check_cpu_consumption(
            &mut self.checker,
            &self.metrics,
            &self.start,
            &self.workload,
            true,
        )
    }

    fn test_memory_usage(&mut self) -> Result<()> {
        if self.paths.get(Controller::Memory).is_none() {
            self.checker.skip_group("memory usage");
            return Ok(());
        }
        check_memory_usage(&mut self.checker, &self.metrics, &self.workload, true)
    }

    fn test_misc(&mut self) -> Result<()> {
        self.checker
            .expect_provider(CgroupVersion::V1, self.metrics.provider_name())
    }

    fn report(&self) -> &Report {
        self.checker.report()
    }
}
