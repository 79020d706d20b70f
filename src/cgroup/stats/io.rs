//! Parsing of v2 `io.stat`.
//!
//! Each line starts with a device id (e.g. `8:0`) followed by `key=value` tokens. The
//! parser sums the byte and operation counters over every device, which is what a
//! metrics provider reports as the group's block I/O totals. Unknown keys (`dbytes`,
//! `dios`, ...) and malformed pairs are ignored.
//!
//! # Example
//!
//! ```rust
//! use cgroup_metrics_validator::cgroup::stats::{IoStat, KeyValueStat};
//!
//! let data = "\
//! 8:0 rbytes=1024 wbytes=2048 rios=12 wios=24
//! 254:0 rbytes=1024 wbytes=2048 rios=12 wios=24
//! ";
//! let io_stat = IoStat::parse(data).unwrap();
//!
//! assert_eq!(io_stat.service_bytes(), 6144);
//! assert_eq!(io_stat.service_count(), 72);
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use super::parser::KeyValueStat;

/// Block I/O counters from `io.stat`, summed across all devices.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IoStat {
    /// Bytes read.
    pub rbytes: u64,
    /// Bytes written.
    pub wbytes: u64,
    /// Read operations.
    pub rios: u64,
    /// Write operations.
    pub wios: u64,
}

impl IoStat {
    /// Bytes read and written.
    pub fn service_bytes(&self) -> u64 {
        self.rbytes.saturating_add(self.wbytes)
    }

    /// Read and write operations.
    pub fn service_count(&self) -> u64 {
        self.rios.saturating_add(self.wios)
    }

    fn add_rbytes(&mut self, rbytes: u64) {
        self.rbytes = self.rbytes.saturating_add(rbytes);
    }

    fn add_wbytes(&mut self, wbytes: u64) {
        self.wbytes = self.wbytes.saturating_add(wbytes);
    }

    fn add_rios(&mut self, rios: u64) {
        self.rios = self.rios.saturating_add(rios);
    }

    fn add_wios(&mut self, wios: u64) {
        self.wios = self.wios.saturating_add(wios);
    }
}

type Accumulator = fn(&mut IoStat, u64);

static ACCUMULATORS: LazyLock<HashMap<&'static str, Accumulator>> = LazyLock::new(|| {
    let mut m: HashMap<&'static str, Accumulator> = HashMap::with_capacity(4);

    m.insert("rbytes", IoStat::add_rbytes);
    m.insert("wbytes", IoStat::add_wbytes);
    m.insert("rios", IoStat::add_rios);
    m.insert("wios", IoStat::add_wios);

    m
});

impl KeyValueStat for IoStat {
    const SPLIT_CHAR: Option<char> = Some('=');
    const SKIP_VALUES: usize = 1;
    const ALLOW_DUPLICATE_KEYS: bool = true;
    const ALLOW_MULTIPLE_KV_PER_LINE: bool = true;

    #[inline]
    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)> {
        &ACCUMULATORS
    }
}
