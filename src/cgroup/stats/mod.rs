//! Typed parsers for the structured cgroup stat files.
//!
//! - [`CpuStat`]: `cpu.stat` (v1 throttling counters, v2 usage and throttling).
//! - [`CpuMax`]: v2 `cpu.max`.
//! - [`IoStat`]: v2 `io.stat`, aggregated over devices.
//!
//! Single values and plain `key value` lookups are read through [`crate::cgroup::files`]
//! instead.

mod cpu;
mod error;
mod io;
mod parser;

pub use cpu::{CpuMax, CpuStat, DEFAULT_PERIOD};
pub use error::StatParseError;
pub use io::IoStat;
pub use parser::KeyValueStat;
