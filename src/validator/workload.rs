//! Synthetic load used to move the live counters between two readings.

use std::hint::black_box;
use std::time::{Duration, Instant};

pub const MEMORY_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// How much work the consumption and memory usage checks induce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Workload {
    pub cpu_burn: Duration,
    /// Upper bound of [`MEMORY_CHUNK_SIZE`] chunks touched while waiting for usage to grow.
    pub memory_chunks: usize,
}

impl Default for Workload {
    fn default() -> Self {
        Self {
            cpu_burn: Duration::from_millis(200),
            memory_chunks: 32,
        }
    }
}

impl Workload {
    /// Spins the current thread for [`Workload::cpu_burn`].
    pub fn burn_cpu(&self) -> u64 {
        let deadline = Instant::now() + self.cpu_burn;
        let mut acc = 0u64;
        while Instant::now() < deadline {
            for i in 0..10_000u64 {
                acc = black_box(acc.wrapping_mul(31).wrapping_add(i));
            }
        }
        acc
    }

    /// Allocates and touches memory one chunk at a time until `grown` reports that the
    /// provider observed it, or the chunk budget is spent.
    ///
    /// The chunks are returned so the caller decides how long they stay resident.
    pub fn touch_memory(&self, mut grown: impl FnMut() -> bool) -> Vec<Vec<u8>> {
        let mut chunks = Vec::with_capacity(self.memory_chunks);
        for _ in 0..self.memory_chunks {
            chunks.push(black_box(vec![1u8; MEMORY_CHUNK_SIZE]));
            if grown() {
                break;
            }
        }
        chunks
    }
}
