use std::fmt;

/// The cgroup controllers whose metric files are validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Controller {
    Memory,
    Cpuset,
    Cpu,
    Cpuacct,
    Blkio,
}

impl Controller {
    pub const ALL: [Controller; 5] = [
        Controller::Memory,
        Controller::Cpuset,
        Controller::Cpu,
        Controller::Cpuacct,
        Controller::Blkio,
    ];

    /// The v1 controller name as it appears in `mountinfo` and `/proc/self/cgroup`.
    pub fn name(self) -> &'static str {
        match self {
            Controller::Memory => "memory",
            Controller::Cpuset => "cpuset",
            Controller::Cpu => "cpu",
            Controller::Cpuacct => "cpuacct",
            Controller::Blkio => "blkio",
        }
    }

    /// Maps a controller name to a known [`Controller`], or `None` for anything else
    /// (`rw`, `name=systemd`, `pids`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl fmt::Display for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The two cgroup filesystem layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CgroupVersion {
    /// One independent hierarchy per controller (or group of co-mounted controllers).
    V1,
    /// A single unified hierarchy for all controllers.
    V2,
}

impl CgroupVersion {
    /// The name a metrics provider reports for this layout.
    pub fn provider_name(self) -> &'static str {
        match self {
            CgroupVersion::V1 => "cgroupv1",
            CgroupVersion::V2 => "cgroupv2",
        }
    }
}

impl fmt::Display for CgroupVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.provider_name())
    }
}
