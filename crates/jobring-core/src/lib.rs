//! # jobring-core
//!
//! Core types for the jobring worker pool.
//!
//! This crate is platform-agnostic and contains no OS-specific code.
//! Platform semaphores, the worker loop and the pool itself live in
//! `jobring-runtime`.
//!
//! ## Modules
//!
//! - `queue` - Bounded lock-free MPMC ring buffer (Vyukov slot sequences)
//! - `semaphore` - Counting semaphore trait + portable condvar implementation
//! - `backoff` - Spin-then-yield backoff for retry loops
//! - `pad` - Cache-line padding for hot atomics
//! - `error` - Error types
//! - `kprint` - Kernel-style leveled logging macros
//! - `env` - Environment variable utilities

pub mod backoff;
pub mod env;
pub mod error;
pub mod kprint;
pub mod pad;
pub mod queue;
pub mod semaphore;

// Re-exports for convenience
pub use backoff::Backoff;
pub use env::{env_get, env_get_bool, env_get_opt};
pub use error::{Full, PoolError, PoolResult, SignalError};
pub use pad::CachePadded;
pub use queue::BoundedQueue;
pub use semaphore::{CondvarSemaphore, Semaphore};

/// Constants shared by the core and the runtime
pub mod constants {
    /// Smallest ring the queue will build (one slot in flight, one free)
    pub const MIN_CAPACITY: usize = 2;

    /// Largest ring the queue will build
    pub const MAX_CAPACITY: usize = 1 << 30;

    /// Upper bound on worker threads per pool
    pub const MAX_WORKERS: usize = 256;

    /// Cache line size for alignment
    pub const CACHE_LINE_SIZE: usize = 64;

    /// Default backoff exponent: spin up to 2^6 pause hints before yielding
    pub const DEFAULT_SPIN_LIMIT: u32 = 6;
}
