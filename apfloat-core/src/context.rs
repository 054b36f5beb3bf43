//! The configuration contract of §6: default radix, cache L1 size, max
//! memory block, block I/O size, number of processors, and a filename
//! generator for temp files — read once at strategy-creation time and never
//! observed to mutate afterward.
//!
//! Held as plain struct fields rather than a global, the way
//! `ntt::NTTEngine` and `ntt::workload_size` keep their tuning constants as
//! struct state / `const fn`s instead of a process-wide singleton.
use std::path::PathBuf;

/// Target single-thread workload size for `T`, mirroring
/// `ntt::workload_size`: close to half an L1 cache line budget.
pub const fn workload_size<T>() -> usize {
    const CACHE_BUDGET: usize = 1 << 15;
    CACHE_BUDGET / std::mem::size_of::<T>()
}

#[derive(Debug, Clone)]
pub struct Context {
    /// Default external radix (e.g. 10) when a caller doesn't specify one.
    pub radix: u64,
    /// L1 cache size in bytes, used by the strategy selector (§4.G).
    pub cache_l1_bytes: usize,
    /// Largest transform the selector will keep entirely in RAM.
    pub max_memory_block_bytes: usize,
    /// Block size used for direct I/O against disk-backed storage (never the
    /// 8 KiB default of a naive channel copy, per §4.B).
    pub block_io_bytes: usize,
    /// Number of worker threads the `ParallelRunner` fans out across.
    pub num_processors: usize,
    /// Directory new `DataStorage::Disk` temp files are created under.
    pub temp_dir: PathBuf,
}

impl Context {
    pub fn new(radix: u64) -> Self {
        Self {
            radix,
            ..Self::default()
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Context {
            radix: 10,
            cache_l1_bytes: 1 << 15,
            max_memory_block_bytes: 1 << 30,
            block_io_bytes: 1 << 20,
            num_processors: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            temp_dir: std::env::temp_dir(),
        }
    }
}
