//! Parser for `/proc/[pid]/cgroup`.
//!
//! File format: `<hierarchy-id>:<controller-list>:<cgroup-path>`
//!
//! - `<hierarchy-id>`: arbitrary number in v1, always `0` for the v2 unified hierarchy.
//! - `<controller-list>`: comma-separated controllers in v1, empty in v2.
//! - `<cgroup-path>`: path of the process's cgroup relative to the hierarchy root.

use std::collections::BTreeSet;

/// Hierarchy id of the v2 unified hierarchy.
pub const UNIFIED_HIERARCHY_ID: &str = "0";

/// One hierarchy the process belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCgroupEntry {
    pub hierarchy_id: String,
    /// Every name in the controller list, including ones such as `name=systemd`.
    pub controllers: BTreeSet<String>,
    pub cgroup_path: String,
}

impl ProcessCgroupEntry {
    /// Returns `true` for the v2 unified hierarchy entry.
    pub fn is_unified(&self) -> bool {
        self.hierarchy_id == UNIFIED_HIERARCHY_ID
    }

    pub fn has_controller(&self, name: &str) -> bool {
        self.controllers.contains(name)
    }
}

/// Parses `/proc/[pid]/cgroup` content.
///
/// Lines with fewer than three colon-separated fields are skipped. The cgroup path is
/// everything after the second colon, so paths that themselves contain colons survive.
///
/// # Example
///
/// ```
/// use cgroup_metrics_validator::cgroup::parse_process_cgroups;
///
/// let entries = parse_process_cgroups("4:memory:/docker/abc123\n0::/\n");
/// assert_eq!(entries[0].cgroup_path, "/docker/abc123");
/// assert!(entries[1].is_unified());
/// ```
pub fn parse_process_cgroups(contents: &str) -> Vec<ProcessCgroupEntry> {
    contents
        .lines()
        .filter_map(|line| {
            let mut fields = line.splitn(3, ':');
            let (Some(id), Some(controllers), Some(path)) =
                (fields.next(), fields.next(), fields.next())
            else {
                if !line.trim().is_empty() {
                    log::debug!("Skipping malformed cgroup membership line: `{line}`");
                }
                return None;
            };

            let entry = ProcessCgroupEntry {
                hierarchy_id: id.to_owned(),
                controllers: controllers
                    .split(',')
                    .filter(|name| !name.is_empty())
                    .map(str::to_owned)
                    .collect(),
                cgroup_path: path.trim_end().to_owned(),
            };
            log::debug!(
                "Process belongs to hierarchy {} ({:?}) at `{}`",
                entry.hierarchy_id,
                entry.controllers,
                entry.cgroup_path
            );
            Some(entry)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_v1_memberships() {
        let data = "\
12:pids:/user.slice/user-1000.slice
11:cpu,cpuacct:/docker/abc123
4:memory:/docker/abc123
1:name=systemd:/user.slice
";
        let entries = parse_process_cgroups(data);
        assert_eq!(entries.len(), 4);

        let cpu = &entries[1];
        assert_eq!(cpu.hierarchy_id, "11");
        assert!(cpu.has_controller("cpu"));
        assert!(cpu.has_controller("cpuacct"));
        assert_eq!(cpu.cgroup_path, "/docker/abc123");
        assert!(!cpu.is_unified());

        assert!(entries[3].has_controller("name=systemd"));
    }

    #[test]
    fn test_parse_v2_membership() {
        let entries = parse_process_cgroups("0::/user.slice/session-2.scope\n");
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_unified());
        assert!(entries[0].controllers.is_empty());
        assert_eq!(entries[0].cgroup_path, "/user.slice/session-2.scope");
    }

    #[test]
    fn test_short_lines_are_skipped() {
        let entries = parse_process_cgroups("garbage\n4:memory\n\n4:memory:/\n");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].cgroup_path, "/");
    }

    #[test]
    fn test_path_with_colon_is_kept_whole() {
        let entries = parse_process_cgroups("0::/system.slice/a:b.scope\n");
        assert_eq!(entries[0].cgroup_path, "/system.slice/a:b.scope");
    }
}
