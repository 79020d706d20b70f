use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::cgroup::{CgroupVersion, Controller};
use crate::fsutil;

use super::parser::parse_mount_info_line;
use super::{Error, Result};

/// A cgroup (v1) or cgroup2 (v2) mount found in `mountinfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    /// Which hierarchy layout this mount belongs to.
    pub version: CgroupVersion,
    /// Known controllers attached to the hierarchy. Always empty for v2, where every
    /// enabled controller lives in the single unified hierarchy.
    pub controllers: BTreeSet<Controller>,
    /// The cgroup path the mount was bound at.
    pub root: String,
    /// Absolute directory where the hierarchy is visible to the process.
    pub mount_point: PathBuf,
}

impl MountEntry {
    /// Returns `true` if this v1 mount carries the given controller.
    pub fn has_controller(&self, controller: Controller) -> bool {
        self.controllers.contains(&controller)
    }
}

/// Reads the cgroup mounts from a `mountinfo` file.
///
/// # Errors
///
/// - [`Error::Read`] if the file exists but cannot be read.
/// - [`Error::Missing`] if the file does not exist.
///
/// # Example
///
/// ```no_run
/// use cgroup_metrics_validator::mountinfo::read_mount_entries;
///
/// for entry in read_mount_entries("/proc/self/mountinfo").unwrap() {
///     println!("{:?} mounted at {}", entry.controllers, entry.mount_point.display());
/// }
/// ```
pub fn read_mount_entries(path: impl AsRef<Path>) -> Result<Vec<MountEntry>> {
    let path = path.as_ref();
    let contents = fsutil::read_optional_to_string(path)?.ok_or_else(|| Error::Missing {
        path: path.to_path_buf(),
    })?;
    Ok(parse_mount_entries(&contents))
}

/// Extracts one [`MountEntry`] per `cgroup`/`cgroup2` line of `mountinfo` text.
///
/// Lines that are not cgroup mounts are ignored, and so are malformed lines: a
/// partially readable topology is more useful than none.
pub fn parse_mount_entries(contents: &str) -> Vec<MountEntry> {
    let mut entries = Vec::new();
    for (lineno, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let info = match parse_mount_info_line(line) {
            Ok(info) => info,
            Err(err) => {
                log::debug!("Skipping mountinfo line {}: {}", lineno + 1, err);
                continue;
            }
        };

        let (version, controllers) = match info.fs_type {
            "cgroup" => (CgroupVersion::V1, controllers_from_options(info.super_options)),
            "cgroup2" => (CgroupVersion::V2, BTreeSet::new()),
            _ => continue,
        };

        log::debug!(
            "Found `{}` mount with root `{}` at `{}`, controllers: {:?}",
            info.fs_type,
            info.root,
            info.mount_point,
            controllers
        );
        entries.push(MountEntry {
            version,
            controllers,
            root: info.root.into_owned(),
            mount_point: PathBuf::from(info.mount_point.into_owned()),
        });
    }

    entries
}

/// Picks the known controller names out of comma-separated super options.
fn controllers_from_options(super_options: &str) -> BTreeSet<Controller> {
    super_options
        .split(',')
        .filter_map(Controller::from_name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const V1_MOUNTINFO: &str = "\
25 1 8:1 / / rw,relatime shared:1 - ext4 /dev/sda1 rw
26 25 0:23 / /sys/fs/cgroup ro,nosuid,nodev,noexec shared:9 - tmpfs tmpfs ro,mode=755
27 26 0:24 / /sys/fs/cgroup/unified rw,nosuid,nodev,noexec,relatime shared:10 - cgroup2 cgroup2 rw,nsdelegate
28 26 0:25 / /sys/fs/cgroup/systemd rw,nosuid,nodev,noexec,relatime shared:11 - cgroup cgroup rw,xattr,name=systemd
30 26 0:27 / /sys/fs/cgroup/memory rw,nosuid,nodev,noexec,relatime shared:13 - cgroup cgroup rw,memory
31 26 0:28 / /sys/fs/cgroup/cpu,cpuacct rw,nosuid,nodev,noexec,relatime shared:14 - cgroup cgroup rw,cpu,cpuacct
32 26 0:29 / /sys/fs/cgroup/cpuset rw,nosuid,nodev,noexec,relatime shared:15 - cgroup cgroup rw,cpuset
33 26 0:30 / /sys/fs/cgroup/blkio rw,nosuid,nodev,noexec,relatime shared:16 - cgroup cgroup rw,blkio
34 26 0:31 / /sys/fs/cgroup/pids rw,nosuid,nodev,noexec,relatime shared:17 - cgroup cgroup rw,pids
";

    #[test]
    fn test_parse_v1_entries() {
        let entries = parse_mount_entries(V1_MOUNTINFO);
        assert_eq!(entries.len(), 7);

        let v1: Vec<_> = entries
            .iter()
            .filter(|e| e.version == CgroupVersion::V1)
            .collect();
        assert_eq!(v1.len(), 6);

        let cpu = v1
            .iter()
            .find(|e| e.has_controller(Controller::Cpu))
            .unwrap();
        assert!(cpu.has_controller(Controller::Cpuacct));
        assert_eq!(cpu.mount_point, PathBuf::from("/sys/fs/cgroup/cpu,cpuacct"));
        assert_eq!(cpu.root, "/");

        let systemd = v1
            .iter()
            .find(|e| e.mount_point.ends_with("systemd"))
            .unwrap();
        assert!(systemd.controllers.is_empty());

        let pids = v1.iter().find(|e| e.mount_point.ends_with("pids")).unwrap();
        assert!(pids.controllers.is_empty());
    }

    #[test]
    fn test_parse_v2_entry() {
        let input = "42 35 0:39 / /sys/fs/cgroup rw,nosuid,nodev,noexec,relatime - cgroup2 cgroup2 rw\n";
        let entries = parse_mount_entries(input);
        assert_eq!(
            entries,
            vec![MountEntry {
                version: CgroupVersion::V2,
                controllers: BTreeSet::new(),
                root: "/".to_owned(),
                mount_point: PathBuf::from("/sys/fs/cgroup"),
            }]
        );
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let input = "\
garbage without separator
30 26 0:27 / /sys/fs/cgroup/memory rw - cgroup cgroup rw,memory
";
        let entries = parse_mount_entries(input);
        assert_eq!(entries.len(), 1);
        assert!(entries[0].has_controller(Controller::Memory));
    }

    #[test]
    fn test_unknown_controller_tokens_are_ignored() {
        let input = "30 26 0:27 / /sys/fs/cgroup/net rw - cgroup cgroup rw,net_cls,net_prio\n";
        let entries = parse_mount_entries(input);
        assert_eq!(entries.len(), 1);
        assert!(entries[0].controllers.is_empty());
    }

    #[test]
    fn test_read_from_tempfile() {
        let mut tmp = NamedTempFile::new().unwrap();
        write!(tmp, "{V1_MOUNTINFO}").unwrap();

        let entries = read_mount_entries(tmp.path()).unwrap();
        assert_eq!(entries.len(), 7);
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mountinfo");
        let err = read_mount_entries(&path).unwrap_err();
        match err {
            Error::Missing { path: err_path } => assert_eq!(err_path, path),
            other => panic!("unexpected error: {other}"),
        }
    }
}
