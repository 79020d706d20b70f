//! Readers for the three textual shapes of cgroup controller files.
//!
//! All readers take a resolved controller directory and a file name. A missing file is
//! the normal outcome for a disabled or undelegated controller and is reported as
//! `None` without logging; any other I/O failure is logged at `warn` level and treated
//! the same way.

use std::collections::BTreeSet;
use std::path::Path;

use crate::error::ResultOkLogExt;
use crate::fsutil;

use super::normalize;
use super::stats::KeyValueStat;

/// Reads a whole file with trailing whitespace removed.
pub fn read_scalar(dir: &Path, file: &str) -> Option<String> {
    let mut contents = fsutil::read_optional_to_string(dir.join(file))
        .ok_warn()
        .flatten()?;
    contents.truncate(contents.trim_end().len());
    Some(contents)
}

/// Reads a single integer, see [`normalize::parse_long`].
pub fn read_long(dir: &Path, file: &str) -> Option<i64> {
    read_scalar(dir, file).map(|value| normalize::parse_long(&value))
}

/// Looks up `key` in a `key value` table such as `memory.oom_control` or
/// `blkio.throttle.io_serviced`.
///
/// The first line whose first token equals `key` wins. Returns `Some(0)` if the file
/// exists but has no such line, and `None` if the file is absent.
///
/// # Example
///
/// ```
/// use cgroup_metrics_validator::cgroup::files::read_table_value;
///
/// let dir = tempfile::tempdir().unwrap();
/// std::fs::write(dir.path().join("memory.oom_control"), "oom_kill_disable 1\nunder_oom 0\n").unwrap();
///
/// assert_eq!(read_table_value(dir.path(), "memory.oom_control", "oom_kill_disable"), Some(1));
/// assert_eq!(read_table_value(dir.path(), "memory.oom_control", "oom_kill"), Some(0));
/// assert_eq!(read_table_value(dir.path(), "memory.events", "max"), None);
/// ```
pub fn read_table_value(dir: &Path, file: &str, key: &str) -> Option<i64> {
    let contents = read_scalar(dir, file)?;
    let value = contents
        .split(['\r', '\n'])
        .find_map(|line| {
            let mut tokens = line.split_whitespace();
            (tokens.next() == Some(key)).then(|| tokens.next().unwrap_or_default())
        })
        .map_or(0, normalize::parse_long);
    Some(value)
}

/// Reads and expands a range list such as `cpuset.cpus`. Absent and empty files both
/// yield an empty set.
pub fn read_range_list(dir: &Path, file: &str) -> BTreeSet<u32> {
    try_read_range_list(dir, file).unwrap_or_default()
}

/// [`read_range_list`] that keeps an absent file apart from an empty one.
pub fn try_read_range_list(dir: &Path, file: &str) -> Option<BTreeSet<u32>> {
    read_scalar(dir, file).map(|contents| normalize::expand_range_list(&contents))
}

/// Reads a structured stat file. Malformed content is logged and reported as absent.
pub fn read_stat<T: KeyValueStat>(dir: &Path, file: &str) -> Option<T> {
    let contents = read_scalar(dir, file)?;
    T::parse(&contents)
        .map_err(|err| {
            log::warn!("Ignoring malformed `{}`: {err}", dir.join(file).display());
            err
        })
        .ok()
}
