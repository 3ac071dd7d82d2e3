//! # jobring - fixed-size worker pool over a lock-free ring
//!
//! Any thread can hand work to the pool without taking a lock. Jobs land in
//! a bounded multi-producer/multi-consumer ring buffer; a fixed set of OS
//! threads drain it. When the ring is full, `submit` says so (`QueueFull`)
//! and `submit_blocking` backs off until a slot frees up.
//!
//! ## Quick Start
//!
//! ```ignore
//! use jobring::WorkerPool;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let pool = WorkerPool::new(4, 1024)?;
//! let done = Arc::new(AtomicUsize::new(0));
//!
//! for _ in 0..100 {
//!     let done = done.clone();
//!     pool.submit_blocking(move || {
//!         done.fetch_add(1, Ordering::Relaxed);
//!     })?;
//! }
//!
//! pool.wait();
//! assert_eq!(done.load(Ordering::Relaxed), 100);
//! pool.shutdown(true);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │              Producers (any thread)                      │
//! │         submit() / submit_blocking()                     │
//! └──────────────────────────────────────────────────────────┘
//!                          │ CAS enqueue_pos, publish, post
//!                          ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │   BoundedQueue: [seq|job][seq|job][seq|job][seq|job]     │
//! │   power-of-two ring + counting semaphore                 │
//! └──────────────────────────────────────────────────────────┘
//!                          │ wait, CAS dequeue_pos, recycle
//!          ┌───────────────┼───────────────┐
//!          ▼               ▼               ▼
//!    ┌───────────┐   ┌───────────┐   ┌───────────┐
//!    │  Worker   │   │  Worker   │   │  Worker   │
//!    │  busy/    │   │  queued   │   │  counters │
//!    └───────────┘   └───────────┘   └───────────┘
//! ```

// Re-export core types
pub use jobring_core::{
    BoundedQueue,
    CondvarSemaphore,
    Full,
    PoolError,
    PoolResult,
    Semaphore,
    SignalError,
};

// Re-export kprint macros for leveled logging
pub use jobring_core::{kdebug, kerror, kinfo, ktrace, kwarn};
pub use jobring_core::kprint::{init as init_logging, set_flush_enabled, set_log_level, LogLevel};

// Re-export env utilities
pub use jobring_core::{env_get, env_get_bool, env_get_opt};

// Re-export runtime types
pub use jobring_runtime::{
    current_worker_id,
    ConfigError,
    Job,
    JobQueue,
    PlatformSemaphore,
    PoolConfig,
    PoolState,
    WorkerPool,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_quick_start() {
        let pool = WorkerPool::new(4, 1024).unwrap();
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..100 {
            let done = done.clone();
            pool.submit_blocking(move || {
                done.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();
        }

        pool.wait();
        assert_eq!(done.load(Ordering::Relaxed), 100);
        pool.shutdown(true);
    }

    #[test]
    fn test_platform_queue() {
        let queue: JobQueue<u64> = JobQueue::new(3).unwrap();
        assert_eq!(queue.capacity(), 4);
        queue.try_enqueue(11).unwrap();
        assert_eq!(queue.dequeue(), Ok(11));
    }
}
