//! Locating and reading the cgroup files that describe a process's resource limits.
//!
//! Linux exposes cgroups in two layouts. v1 mounts one hierarchy per controller group
//! (e.g. `/sys/fs/cgroup/memory`, `/sys/fs/cgroup/cpu,cpuacct`), while v2 mounts a single
//! unified hierarchy. This module combines `/proc/<pid>/mountinfo` and `/proc/<pid>/cgroup`
//! into a per-controller directory, and provides readers and normalizers for the files
//! found there.
//!
//! # Key Components
//!
//! - [`Topology`]: the mounts and memberships of one process, and controller resolution.
//! - [`ControllerPaths`]: the resolved directories, built once per run.
//! - [`files`]: scalar, table, range-list and stat file readers.
//! - [`normalize`]: conversion of raw values into the provider's domain.
//! - [`stats`]: typed parsers for `cpu.stat`, `cpu.max` and `io.stat`.

mod controller;
pub mod files;
mod membership;
pub mod normalize;
mod resolver;
pub mod stats;

pub use controller::{CgroupVersion, Controller};
pub use membership::{ProcessCgroupEntry, UNIFIED_HIERARCHY_ID, parse_process_cgroups};
pub use resolver::{ControllerPaths, Topology, combine_paths};
