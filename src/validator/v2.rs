use crate::cgroup::normalize::{self, UNLIMITED};
use crate::cgroup::stats::{CpuMax, CpuStat, IoStat};
use crate::cgroup::{CgroupVersion, Controller, ControllerPaths, files};
use crate::provider::Metrics;

use super::{
    CgroupMetricsValidator, Checker, Report, Result, StartUsage, Workload,
    check_cpu_consumption, check_memory_usage,
};

const NANOS_PER_MICRO: i64 = 1000;

/// Validator for hosts with the unified (v2) hierarchy.
///
/// Every controller resolves to the same directory; a controller that is not enabled
/// for the group simply has no files there.
pub struct V2Validator<M> {
    metrics: M,
    paths: ControllerPaths,
    checker: Checker,
    start: StartUsage,
    workload: Workload,
}

impl<M: Metrics> V2Validator<M> {
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

/// `memory.max` plus `memory.swap.max`. Without swap accounting the memory limit alone
/// bounds both.
fn memory_and_swap_limit(memory: Option<i64>, swap: Option<i64>) -> Option<i64> {
    match (memory?, swap) {
        (memory, Some(swap)) if memory == UNLIMITED || swap == UNLIMITED => Some(UNLIMITED),
        (memory, Some(swap)) => Some(memory.saturating_add(swap)),
        (memory, None) => Some(memory),
    }
}

fn micros_to_nanos(micros: u64) -> i64 {
    normalize::counter(micros).saturating_mul(NANOS_PER_MICRO)
}

impl<M: Metrics> CgroupMetricsValidator for V2Validator<M> {
    fn version(&self) -> CgroupVersion {
        CgroupVersion::V2
    }

    fn test_memory_subsystem(&mut self) -> Result<()> {
        let controller = Controller::Memory;
        let Some(dir) = self.paths.get(controller) else {
            self.checker.skip_group("memory");
            return Ok(());
        };
        let metrics = &self.metrics;
        let limit = |file: &str| files::read_scalar(dir, file).map(|raw| normalize::limit_v2(&raw));
        let memory_max = limit("memory.max");

        self.checker.expect(
            controller,
            "memory.max",
            metrics.memory_limit(),
            memory_max,
        )?;
        self.checker.expect(
            controller,
            "memory.low",
            metrics.memory_soft_limit(),
            limit("memory.low"),
        )?;
        self.checker.expect(
            controller,
            "memory.swap.max",
            metrics.memory_and_swap_limit(),
            memory_and_swap_limit(memory_max, limit("memory.swap.max")),
        )?;

        let current = files::read_long(dir, "memory.current");
        self.checker.observe(
            controller,
            "memory.current",
            metrics.memory_usage(),
            current,
        );
        self.checker.observe(
            controller,
            "memory.peak",
            metrics.memory_max_usage(),
            files::read_long(dir, "memory.peak"),
        );
        self.checker.observe(
            controller,
            "memory.events max",
            metrics.memory_fail_count(),
            files::read_table_value(dir, "memory.events", "max"),
        );
        let swap_current = files::read_long(dir, "memory.swap.current").unwrap_or(0);
        self.checker.observe(
            controller,
            "memory.swap.current",
            metrics.memory_and_swap_usage(),
            current.map(|current| current.saturating_add(swap_current)),
        );
        Ok(())
    }

    fn test_cpu_accounting(&mut self) -> Result<()> {
        let controller = Controller::Cpu;
        let Some(dir) = self.paths.get(controller) else {
            self.checker.skip_group("cpuacct");
            return Ok(());
        };
        let metrics = &self.metrics;
        let stat = files::read_stat::<CpuStat>(dir, "cpu.stat");

        self.checker.observe(
            controller,
            "cpu.stat usage_usec",
            metrics.cpu_usage(),
            stat.as_ref().map(|s| micros_to_nanos(s.usage_usec)),
        );
        self.checker.observe(
            controller,
            "cpu.stat user_usec",
            metrics.cpu_user_usage(),
            stat.as_ref().map(|s| micros_to_nanos(s.user_usec)),
        );
        self.checker.observe(
            controller,
            "cpu.stat system_usec",
            metrics.cpu_system_usage(),
            stat.as_ref().map(|s| micros_to_nanos(s.system_usec)),
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
        let cpu_max = files::read_scalar(dir, "cpu.max").map(|raw| CpuMax::parse(&raw));

        self.checker.expect(
            controller,
            "cpu.max period",
            metrics.cpu_period(),
            cpu_max.as_ref().map(|max| max.period),
        )?;
        self.checker.expect(
            controller,
            "cpu.max quota",
            metrics.cpu_quota(),
            cpu_max.as_ref().map(|max| max.quota),
        )?;
        self.checker.expect(
            controller,
            "cpu.weight",
            metrics.cpu_shares(),
            files::read_long(dir, "cpu.weight").map(normalize::weight_to_shares),
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
            "cpu.stat throttled_usec",
            metrics.cpu_throttled_time(),
            stat.as_ref().map(|s| micros_to_nanos(s.throttled_usec)),
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
        // An empty configured set means the group inherits its parent's effective set.
        let configured = |file: &str, effective: &str| {
            files::try_read_range_list(dir, file)
                .filter(|set| !set.is_empty())
                .or_else(|| files::try_read_range_list(dir, effective))
        };

        self.checker.expect_set(
            controller,
            "cpuset.cpus",
            metrics.cpu_set_cpus(),
            configured("cpuset.cpus", "cpuset.cpus.effective"),
        )?;
        self.checker.expect_set(
            controller,
            "cpuset.cpus.effective",
            metrics.effective_cpu_set_cpus(),
            files::try_read_range_list(dir, "cpuset.cpus.effective"),
        )?;
        self.checker.expect_set(
            controller,
            "cpuset.mems",
            metrics.cpu_set_mems(),
            configured("cpuset.mems", "cpuset.mems.effective"),
        )?;
        self.checker.expect_set(
            controller,
            "cpuset.mems.effective",
            metrics.effective_cpu_set_mems(),
            files::try_read_range_list(dir, "cpuset.mems.effective"),
        )?;
        Ok(())
    }

    fn test_io(&mut self) -> Result<()> {
        let controller = Controller::Blkio;
        let Some(dir) = self.paths.get(controller) else {
            self.checker.skip_group("io");
            return Ok(());
        };
        let metrics = &self.metrics;
        let stat = files::read_stat::<IoStat>(dir, "io.stat");

        self.checker.observe(
            controller,
            "io.stat rios+wios",
            metrics.blkio_service_count(),
            stat.as_ref().map(|s| normalize::counter(s.service_count())),
        );
        self.checker.observe(
            controller,
            "io.stat rbytes+wbytes",
            metrics.blkio_serviced(),
            stat.as_ref().map(|s| normalize::counter(s.service_bytes())),
        );
        Ok(())
    }

    fn test_cpu_consumption(&mut self) -> Result<()> {
        if self.paths.get(Controller::Cpu).is_none() {
            self.checker.skip_group("cpu consumption");
            return Ok(());
        }
        check_cpu_consumption(
            &mut self.checker,
            &self.metrics,
            &self.start,
            &self.workload,
            false,
        )
    }

    fn test_memory_usage(&mut self) -> Result<()> {
        let Some(dir) = self.paths.get(Controller::Memory) else {
            self.checker.skip_group("memory usage");
            return Ok(());
        };
        // `memory.peak` only exists on kernels 5.19 and later.
        let has_peak = dir.join("memory.peak").exists();
        check_memory_usage(&mut self.checker, &self.metrics, &self.workload, has_peak)
    }

    fn test_misc(&mut self) -> Result<()> {
        self.checker
            .expect_provider(CgroupVersion::V2, self.metrics.provider_name())
    }

    fn report(&self) -> &Report {
        self.checker.report()
    }
}
