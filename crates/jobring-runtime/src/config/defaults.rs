//! Compile-time defaults for `PoolConfig`

use jobring_core::constants::DEFAULT_SPIN_LIMIT;

/// Worker threads when `available_parallelism()` cannot be queried
pub const NUM_WORKERS: usize = 4;

/// Ceiling applied to `available_parallelism()` by `PoolConfig::auto_workers`
pub const MAX_AUTO_WORKERS: usize = 64;

/// Queue capacity hint (rounded up to a power of two)
pub const QUEUE_CAPACITY: usize = 1024;

/// Backoff exponent cap for blocking enqueue and `wait()`
pub const SPIN_LIMIT: u32 = DEFAULT_SPIN_LIMIT;

/// Worker thread name prefix; workers are named `<prefix>-<id>`
pub const THREAD_NAME: &str = "jobring-worker";

/// Worker stack size in bytes, 0 = std default
pub const STACK_SIZE: usize = 0;
