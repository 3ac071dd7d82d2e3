//! # jobring-runtime
//!
//! Platform-specific runtime for the jobring worker pool.
//!
//! This crate provides:
//! - Counting semaphores (Linux futex, POSIX `sem_t`, condvar fallback)
//! - Pool configuration with environment overrides
//! - The worker loop
//! - `WorkerPool`: submit / wait / shutdown over a `BoundedQueue`

pub mod config;
pub mod job;
pub mod pool;
pub mod sema;
pub mod worker;

// Re-exports
pub use config::{ConfigError, PoolConfig};
pub use job::{Job, Task};
pub use pool::{PoolState, WorkerPool};
pub use sema::PlatformSemaphore;
pub use worker::current_worker_id;

/// Queue type the pool runs on: core ring + this platform's semaphore
pub type JobQueue<T> = jobring_core::BoundedQueue<T, PlatformSemaphore>;
