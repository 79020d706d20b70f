//! Resolution of per-controller cgroup directories for a process.
//!
//! A controller's metric files live at `<mount point>/<cgroup path relative to the mount root>`.
//! The mount root is usually `/`, but differs when the hierarchy is bind-mounted from a
//! subtree (for example inside a container sharing the host's cgroup namespace), in which
//! case the process's cgroup path has to be rebased onto the mount point.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::ResultOkLogExt;
use crate::fsutil;
use crate::mountinfo::{self, MountEntry};

use super::membership::{ProcessCgroupEntry, parse_process_cgroups};
use super::{CgroupVersion, Controller};

/// Snapshot of the cgroup mounts and memberships visible to one process.
///
/// Cgroup migrations after the snapshot is taken are not observed.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    mounts: Vec<MountEntry>,
    memberships: Vec<ProcessCgroupEntry>,
}

impl Topology {
    /// Reads `<proc_dir>/mountinfo` and `<proc_dir>/cgroup`, e.g. with `/proc/self`.
    ///
    /// Unreadable files are logged and leave the corresponding half of the topology
    /// empty, so every controller resolves as unavailable.
    pub fn from_proc(proc_dir: impl AsRef<Path>) -> Self {
        let proc_dir = proc_dir.as_ref();
        let mounts = mountinfo::read_mount_entries(proc_dir.join("mountinfo"))
            .ok_log()
            .unwrap_or_default();
        let memberships = fsutil::read_optional_to_string(proc_dir.join("cgroup"))
            .ok_warn()
            .flatten()
            .map(|contents| parse_process_cgroups(&contents))
            .unwrap_or_default();

        Self {
            mounts,
            memberships,
        }
    }

    /// Builds a topology from in-memory `mountinfo` and `/proc/[pid]/cgroup` content.
    pub fn parse(mountinfo: &str, cgroup: &str) -> Self {
        Self {
            mounts: mountinfo::parse_mount_entries(mountinfo),
            memberships: parse_process_cgroups(cgroup),
        }
    }

    pub fn mounts(&self) -> &[MountEntry] {
        &self.mounts
    }

    pub fn memberships(&self) -> &[ProcessCgroupEntry] {
        &self.memberships
    }

    /// Detects the layout in use.
    ///
    /// Any v1 mount carrying a known controller makes this a v1 host, even when a
    /// cgroup2 hierarchy is mounted alongside (hybrid setups). Returns `None` if no
    /// cgroup filesystem is mounted at all.
    pub fn version(&self) -> Option<CgroupVersion> {
        if self
            .mounts
            .iter()
            .any(|m| m.version == CgroupVersion::V1 && !m.controllers.is_empty())
        {
            Some(CgroupVersion::V1)
        } else if self.mounts.iter().any(|m| m.version == CgroupVersion::V2) {
            Some(CgroupVersion::V2)
        } else {
            None
        }
    }

    /// Computes the directory holding `controller`'s files, or `None` if the controller
    /// is not mounted, the process is not a member, or the process's cgroup lies outside
    /// the mounted subtree.
    pub fn resolve(&self, controller: Controller) -> Option<PathBuf> {
        let (mount, membership) = match self.version()? {
            CgroupVersion::V1 => (
                self.mounts
                    .iter()
                    .find(|m| m.version == CgroupVersion::V1 && m.has_controller(controller))?,
                self.memberships
                    .iter()
                    .find(|e| e.has_controller(controller.name()))?,
            ),
            CgroupVersion::V2 => (
                self.mounts
                    .iter()
                    .find(|m| m.version == CgroupVersion::V2)?,
                self.memberships.iter().find(|e| e.is_unified())?,
            ),
        };

        let resolved = combine_paths(&mount.root, &mount.mount_point, &membership.cgroup_path);
        match &resolved {
            Some(dir) => log::debug!("Resolved `{}` controller to `{}`", controller, dir.display()),
            None => log::debug!(
                "Cgroup path `{}` of `{}` controller is outside mount root `{}`",
                membership.cgroup_path,
                controller,
                mount.root
            ),
        }
        resolved
    }

    /// Resolves every known controller once.
    pub fn resolve_all(&self) -> ControllerPaths {
        ControllerPaths(
            Controller::ALL
                .into_iter()
                .filter_map(|c| self.resolve(c).map(|dir| (c, dir)))
                .collect(),
        )
    }
}

/// Immutable map from controller to its resolved directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerPaths(HashMap<Controller, PathBuf>);

impl ControllerPaths {
    pub fn get(&self, controller: Controller) -> Option<&Path> {
        self.0.get(&controller).map(PathBuf::as_path)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<(Controller, PathBuf)> for ControllerPaths {
    fn from_iter<I: IntoIterator<Item = (Controller, PathBuf)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Rebases a process's cgroup path onto the mount point of its hierarchy.
///
/// - root `/`: the cgroup path is appended to the mount point (`/` adds nothing).
/// - cgroup path equal to root: the mount point itself.
/// - cgroup path below root: the remainder after the root prefix is appended.
/// - otherwise: `None`.
///
/// Prefixes only match at path component boundaries.
///
/// # Example
///
/// ```
/// use std::path::{Path, PathBuf};
/// use cgroup_metrics_validator::cgroup::combine_paths;
///
/// let dir = combine_paths("/", Path::new("/sys/fs/cgroup/memory"), "/docker/abc123");
/// assert_eq!(dir, Some(PathBuf::from("/sys/fs/cgroup/memory/docker/abc123")));
/// ```
pub fn combine_paths(root: &str, mount_point: &Path, cgroup_path: &str) -> Option<PathBuf> {
    let root = root.trim_end_matches('/');
    let relative = if root.is_empty() {
        cgroup_path
    } else if cgroup_path.trim_end_matches('/') == root {
        ""
    } else {
        let rest = cgroup_path.strip_prefix(root)?;
        if !rest.starts_with('/') {
            return None;
        }
        rest
    };

    let relative = relative.trim_matches('/');
    if relative.is_empty() {
        Some(mount_point.to_path_buf())
    } else {
        Some(mount_point.join(relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const V1_MOUNTINFO: &str = "\
26 25 0:23 / /sys/fs/cgroup ro,nosuid - tmpfs tmpfs ro,mode=755
27 26 0:24 / /sys/fs/cgroup/unified rw,nosuid - cgroup2 cgroup2 rw,nsdelegate
28 26 0:25 / /sys/fs/cgroup/systemd rw,nosuid - cgroup cgroup rw,xattr,name=systemd
30 26 0:27 / /sys/fs/cgroup/memory rw,nosuid - cgroup cgroup rw,memory
31 26 0:28 / /sys/fs/cgroup/cpu,cpuacct rw,nosuid - cgroup cgroup rw,cpu,cpuacct
32 26 0:29 /docker/abc123 /sys/fs/cgroup/cpuset rw,nosuid - cgroup cgroup rw,cpuset
";

    const V1_CGROUP: &str = "\
11:cpuset:/docker/abc123/nested
5:cpu,cpuacct:/
4:memory:/docker/abc123
1:name=systemd:/docker/abc123
0::/docker/abc123
";

    #[test]
    fn test_combine_root_slash_and_cgroup_slash_is_mount_point() {
        let dir = combine_paths("/", Path::new("/sys/fs/cgroup/memory"), "/");
        assert_eq!(dir, Some(PathBuf::from("/sys/fs/cgroup/memory")));
        assert_eq!(
            dir.unwrap().as_os_str().to_str(),
            Some("/sys/fs/cgroup/memory")
        );
    }

    #[test]
    fn test_combine_root_slash_appends_cgroup_path() {
        let dir = combine_paths("/", Path::new("/sys/fs/cgroup/memory"), "/docker/abc123");
        assert_eq!(
            dir.unwrap().as_os_str().to_str(),
            Some("/sys/fs/cgroup/memory/docker/abc123")
        );
    }

    #[test]
    fn test_combine_equal_root_and_path_is_mount_point() {
        let dir = combine_paths("/docker/abc123", Path::new("/sys/fs/cgroup/cpu"), "/docker/abc123");
        assert_eq!(dir, Some(PathBuf::from("/sys/fs/cgroup/cpu")));
    }

    #[test]
    fn test_combine_strips_root_prefix_without_doubled_separator() {
        let dir = combine_paths(
            "/docker/abc123",
            Path::new("/sys/fs/cgroup/cpu"),
            "/docker/abc123/nested/leaf",
        );
        assert_eq!(
            dir.unwrap().as_os_str().to_str(),
            Some("/sys/fs/cgroup/cpu/nested/leaf")
        );
    }

    #[test]
    fn test_combine_outside_root_is_unresolvable() {
        assert_eq!(
            combine_paths("/docker/abc123", Path::new("/sys/fs/cgroup/cpu"), "/system.slice"),
            None
        );
        assert_eq!(
            combine_paths("/docker/abc", Path::new("/sys/fs/cgroup/cpu"), "/docker/abcdef"),
            None
        );
    }

    #[test]
    fn test_v1_topology_resolution() {
        let topology = Topology::parse(V1_MOUNTINFO, V1_CGROUP);
        assert_eq!(topology.version(), Some(CgroupVersion::V1));

        assert_eq!(
            topology.resolve(Controller::Memory),
            Some(PathBuf::from("/sys/fs/cgroup/memory/docker/abc123"))
        );
        assert_eq!(
            topology.resolve(Controller::Cpu),
            Some(PathBuf::from("/sys/fs/cgroup/cpu,cpuacct"))
        );
        assert_eq!(
            topology.resolve(Controller::Cpuacct),
            Some(PathBuf::from("/sys/fs/cgroup/cpu,cpuacct"))
        );
        assert_eq!(
            topology.resolve(Controller::Cpuset),
            Some(PathBuf::from("/sys/fs/cgroup/cpuset/nested"))
        );
        assert_eq!(topology.resolve(Controller::Blkio), None);

        let paths = topology.resolve_all();
        assert_eq!(paths.len(), 4);
        assert_eq!(paths.get(Controller::Blkio), None);
    }

    #[test]
    fn test_v2_topology_resolution() {
        let mountinfo = "35 25 0:30 / /sys/fs/cgroup rw,nosuid - cgroup2 cgroup2 rw,nsdelegate\n";
        let topology = Topology::parse(mountinfo, "0::/user.slice/session-3.scope\n");
        assert_eq!(topology.version(), Some(CgroupVersion::V2));

        let expected = PathBuf::from("/sys/fs/cgroup/user.slice/session-3.scope");
        for controller in Controller::ALL {
            assert_eq!(topology.resolve(controller).as_ref(), Some(&expected));
        }
    }

    #[test]
    fn test_v2_without_unified_membership_is_unavailable() {
        let mountinfo = "35 25 0:30 / /sys/fs/cgroup rw - cgroup2 cgroup2 rw\n";
        let topology = Topology::parse(mountinfo, "");
        assert_eq!(topology.version(), Some(CgroupVersion::V2));
        assert!(topology.resolve_all().is_empty());
    }

    #[test]
    fn test_memory_end_to_end_scenario() {
        let mountinfo = "30 26 0:27 / /sys/fs/cgroup/memory rw,nosuid - cgroup cgroup rw,memory\n";
        let topology = Topology::parse(mountinfo, "4:memory:/\n");
        assert_eq!(
            topology.resolve(Controller::Memory),
            Some(PathBuf::from("/sys/fs/cgroup/memory"))
        );

        let topology = Topology::parse(mountinfo, "4:memory:/docker/abc123\n");
        assert_eq!(
            topology.resolve(Controller::Memory),
            Some(PathBuf::from("/sys/fs/cgroup/memory/docker/abc123"))
        );
    }

    #[test]
    fn test_no_cgroups_at_all() {
        let topology = Topology::parse("25 1 8:1 / / rw - ext4 /dev/sda1 rw\n", "");
        assert_eq!(topology.version(), None);
        assert!(topology.resolve_all().is_empty());
    }

    #[test]
    fn test_from_proc_with_missing_files_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let topology = Topology::from_proc(dir.path());
        assert!(topology.mounts().is_empty());
        assert!(topology.memberships().is_empty());
        assert_eq!(topology.version(), None);
    }

    #[test]
    fn test_from_proc_reads_both_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mountinfo"), V1_MOUNTINFO).unwrap();
        std::fs::write(dir.path().join("cgroup"), V1_CGROUP).unwrap();

        let topology = Topology::from_proc(dir.path());
        assert_eq!(topology.mounts().len(), 5);
        assert_eq!(topology.memberships().len(), 5);
        assert_eq!(topology.resolve_all().len(), 4);
    }
}
