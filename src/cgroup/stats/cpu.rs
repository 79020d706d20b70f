//! Parsing of CPU statistics from cgroup files.
//!
//! - **`cpu.stat`** (both versions) is a key-value file. v2 reports usage and throttling
//!   in microseconds (`usage_usec`, `throttled_usec`, ...); v1 only carries the CFS
//!   throttling counters, with `throttled_time` in nanoseconds. Both map onto [`CpuStat`].
//! - **`cpu.max`** (v2) holds `<quota> <period>`, where the quota may be `max`. It is
//!   parsed into [`CpuMax`].
//!
//! # Examples
//!
//! ```rust
//! use cgroup_metrics_validator::cgroup::stats::{CpuMax, CpuStat, KeyValueStat};
//!
//! let stat = CpuStat::parse("usage_usec 1000000\nuser_usec 600000\nsystem_usec 400000\n").unwrap();
//! assert_eq!(stat.user_usec, 600_000);
//!
//! let max = CpuMax::parse("max 100000\n");
//! assert_eq!(max.quota, -1);
//! assert_eq!(max.period, 100_000);
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use super::KeyValueStat;
use crate::cgroup::normalize;

/// Parsed data from a cgroup `cpu.stat` file. Keys absent from the file stay 0.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CpuStat {
    /// Total CPU time in microseconds (v2).
    pub usage_usec: u64,
    /// User CPU time in microseconds (v2).
    pub user_usec: u64,
    /// System CPU time in microseconds (v2).
    pub system_usec: u64,
    /// Number of enforcement periods that elapsed.
    pub nr_periods: u64,
    /// Number of periods in which the group was throttled.
    pub nr_throttled: u64,
    /// Total throttled time in microseconds (v2).
    pub throttled_usec: u64,
    /// Total throttled time in nanoseconds (v1).
    pub throttled_time: u64,
}

impl CpuStat {
    fn set_usage_usec(&mut self, usage_usec: u64) {
        self.usage_usec = usage_usec;
    }

    fn set_user_usec(&mut self, user_usec: u64) {
        self.user_usec = user_usec;
    }

    fn set_system_usec(&mut self, system_usec: u64) {
        self.system_usec = system_usec;
    }

    fn set_nr_periods(&mut self, nr_periods: u64) {
        self.nr_periods = nr_periods;
    }

    fn set_nr_throttled(&mut self, nr_throttled: u64) {
        self.nr_throttled = nr_throttled;
    }

    fn set_throttled_usec(&mut self, throttled_usec: u64) {
        self.throttled_usec = throttled_usec;
    }

    fn set_throttled_time(&mut self, throttled_time: u64) {
        self.throttled_time = throttled_time;
    }
}

type Setter = fn(&mut CpuStat, u64);

static SETTERS: LazyLock<HashMap<&'static str, Setter>> = LazyLock::new(|| {
    let mut m: HashMap<&'static str, Setter> = HashMap::with_capacity(7);

    m.insert("usage_usec", CpuStat::set_usage_usec);
    m.insert("user_usec", CpuStat::set_user_usec);
    m.insert("system_usec", CpuStat::set_system_usec);
    m.insert("nr_periods", CpuStat::set_nr_periods);
    m.insert("nr_throttled", CpuStat::set_nr_throttled);
    m.insert("throttled_usec", CpuStat::set_throttled_usec);
    m.insert("throttled_time", CpuStat::set_throttled_time);

    m
});

impl KeyValueStat for CpuStat {
    const SPLIT_CHAR: Option<char> = None;
    const SKIP_VALUES: usize = 0;
    const ALLOW_DUPLICATE_KEYS: bool = false;
    const ALLOW_MULTIPLE_KV_PER_LINE: bool = false;

    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)> {
        &SETTERS
    }
}

/// CPU bandwidth limit from v2 `cpu.max`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuMax {
    /// Allowed CPU time per period in microseconds, `-1` when unlimited.
    pub quota: i64,
    /// Enforcement period in microseconds.
    pub period: i64,
}

/// Kernel default CFS period in microseconds.
pub const DEFAULT_PERIOD: i64 = 100_000;

impl Default for CpuMax {
    fn default() -> Self {
        Self {
            quota: normalize::UNLIMITED,
            period: DEFAULT_PERIOD,
        }
    }
}

impl CpuMax {
    /// Parses `cpu.max` content.
    ///
    /// Never fails: a missing or unparseable quota is unlimited, and a missing or
    /// unparseable period falls back to [`DEFAULT_PERIOD`].
    pub fn parse(content: &str) -> Self {
        let mut parts = content.split_whitespace();
        let quota = normalize::limit_v2(parts.next().unwrap_or("max"));
        let period = parts
            .next()
            .and_then(|p| p.parse::<i64>().ok())
            .unwrap_or(DEFAULT_PERIOD);

        Self { quota, period }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgroup::stats::StatParseError;

    #[test]
    fn test_parse_empty_cpu_stat() {
        let stat = CpuStat::parse("").unwrap();
        assert_eq!(stat, CpuStat::default());
    }

    #[test]
    fn test_parse_v2_cpu_stat() {
        let data = "\
usage_usec 623932088000
user_usec 421230248000
system_usec 202701840000
nr_periods 12
nr_throttled 3
throttled_usec 4500
nr_bursts 0
burst_usec 0
";
        let stat = CpuStat::parse(data).unwrap();

        assert_eq!(stat.usage_usec, 623_932_088_000);
        assert_eq!(stat.user_usec, 421_230_248_000);
        assert_eq!(stat.system_usec, 202_701_840_000);
        assert_eq!(stat.nr_periods, 12);
        assert_eq!(stat.nr_throttled, 3);
        assert_eq!(stat.throttled_usec, 4500);
        assert_eq!(stat.throttled_time, 0);
    }

    #[test]
    fn test_parse_v1_cpu_stat_with_crlf() {
        let data = "nr_periods 7\r\nnr_throttled 2\r\nthrottled_time 123456789\r\n";
        let stat = CpuStat::parse(data).unwrap();
        assert_eq!(stat.nr_periods, 7);
        assert_eq!(stat.nr_throttled, 2);
        assert_eq!(stat.throttled_time, 123_456_789);
        assert_eq!(stat.usage_usec, 0);
    }

    #[test]
    fn test_parse_invalid_cpu_stat() {
        let data = "\
invalid_line
usage_usec abc
user_usec 42
";
        let err = CpuStat::parse(data).unwrap_err();
        match err {
            StatParseError::InvalidKeyValue {
                key, value, line, ..
            } => {
                assert_eq!(key, "usage_usec");
                assert_eq!(value, "abc");
                assert_eq!(line, 2);
            }
            _ => panic!("Expected InvalidKeyValue error"),
        }
    }

    #[test]
    fn test_duplicate_field_errors() {
        let data = "\
usage_usec 100
usage_usec 200
";
        let err = CpuStat::parse(data).unwrap_err();
        match err {
            StatParseError::DuplicateField { field, line } => {
                assert_eq!(field, "usage_usec");
                assert_eq!(line, 2);
            }
            _ => panic!("Expected DuplicateField error"),
        }
    }

    #[test]
    fn test_parse_cpu_max() {
        assert_eq!(
            CpuMax::parse("50000 100000\n"),
            CpuMax {
                quota: 50_000,
                period: 100_000
            }
        );
        assert_eq!(
            CpuMax::parse("max 250000"),
            CpuMax {
                quota: -1,
                period: 250_000
            }
        );
    }

    #[test]
    fn test_parse_degenerate_cpu_max() {
        assert_eq!(CpuMax::parse(""), CpuMax::default());
        assert_eq!(CpuMax::parse("max"), CpuMax::default());
        assert_eq!(CpuMax::parse("abc xyz"), CpuMax::default());
    }
}
