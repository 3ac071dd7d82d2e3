//! Basic jobring example
//!
//! Submits a batch of jobs, shows backpressure on a tiny queue, then shuts
//! the pool down gracefully.
//!
//! # Environment Variables
//!
//! - `JR_LOG_LEVEL=debug` - Set log level (off, error, warn, info, debug, trace)
//! - `JR_FLUSH_EPRINT=1` - Flush log output immediately
//! - `JR_NUM_WORKERS`, `JR_QUEUE_CAPACITY`, ... - see `PoolConfig::from_env`

use jobring::{current_worker_id, kdebug, kinfo, PoolConfig, PoolError, WorkerPool};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

// JR_LOG_LEVEL=debug cargo run -p jobring-basic -- 1000
fn main() -> Result<(), PoolError> {
    println!("=== jobring Basic Example ===\n");

    let num_jobs: usize = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(1000);

    let config = PoolConfig::from_env();
    config.log();

    let pool = WorkerPool::with_config(config)?;
    println!(
        "Pool: {} workers, queue capacity {}",
        pool.num_workers(),
        pool.capacity()
    );

    // Every job bumps a shared counter and records which worker ran it
    let completed = Arc::new(AtomicUsize::new(0));
    let per_worker: Arc<Vec<AtomicUsize>> =
        Arc::new((0..pool.num_workers()).map(|_| AtomicUsize::new(0)).collect());

    let start = Instant::now();
    for i in 0..num_jobs {
        let completed = Arc::clone(&completed);
        let per_worker = Arc::clone(&per_worker);
        pool.submit_blocking(move || {
            if let Some(id) = current_worker_id() {
                per_worker[id].fetch_add(1, Ordering::Relaxed);
            }
            if i % 250 == 0 {
                kdebug!("job {} running", i);
            }
            completed.fetch_add(1, Ordering::Relaxed);
        })?;
    }
    pool.wait();
    let elapsed = start.elapsed();

    println!(
        "\nCompleted {} / {} jobs in {:?}",
        completed.load(Ordering::Relaxed),
        num_jobs,
        elapsed
    );
    for (id, count) in per_worker.iter().enumerate() {
        println!("  worker {:>2}: {} jobs", id, count.load(Ordering::Relaxed));
    }

    pool.shutdown(true);

    // Backpressure: one slow worker, a 4-slot ring
    println!("\n--- Backpressure ---");
    let pool = WorkerPool::new(1, 4)?;
    let mut accepted = 0;
    let mut rejected = 0;
    for _ in 0..16 {
        match pool.submit(|| std::thread::sleep(Duration::from_millis(5))) {
            Ok(()) => accepted += 1,
            Err(PoolError::QueueFull) => rejected += 1,
            Err(e) => return Err(e),
        }
    }
    println!("accepted {}, queue full {}", accepted, rejected);
    kinfo!("draining backpressure pool");
    pool.shutdown(true);

    println!("\n=== Done ===");
    Ok(())
}
