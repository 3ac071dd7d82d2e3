//! Throughput benchmark
//!
//! 1. Raw queue: P producers / C consumers moving `u64`s through a
//!    `JobQueue`, against `crossbeam_queue::ArrayQueue` with the same
//!    capacity (ArrayQueue has no blocking pop, its consumers spin).
//! 2. Pool: submit_blocking throughput of empty jobs.
//!
//! Usage: `benchmark [items] [producers] [consumers] [capacity]`

use crossbeam_queue::ArrayQueue;
use jobring::{Full, JobQueue, PoolError, WorkerPool};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

struct Params {
    items: u64,
    producers: u64,
    consumers: u64,
    capacity: usize,
}

impl Params {
    fn from_args() -> Self {
        let arg = |n: usize, default: u64| -> u64 {
            std::env::args()
                .nth(n)
                .and_then(|s| s.parse().ok())
                .unwrap_or(default)
        };
        Self {
            items: arg(1, 2_000_000),
            producers: arg(2, 4).max(1),
            consumers: arg(3, 4).max(1),
            capacity: arg(4, 1024) as usize,
        }
    }

    fn per_producer(&self) -> u64 {
        self.items / self.producers
    }

    fn total(&self) -> u64 {
        self.per_producer() * self.producers
    }
}

fn report(name: &str, total: u64, elapsed: Duration, checksum: u64, expected: u64) {
    let rate = total as f64 / elapsed.as_secs_f64() / 1e6;
    let ok = if checksum == expected { "ok" } else { "CHECKSUM MISMATCH" };
    println!("{:<24} {:>10.2?}  {:>8.2} M items/s  [{}]", name, elapsed, rate, ok);
}

fn expected_checksum(total: u64) -> u64 {
    // Items are 1..=total
    total * (total + 1) / 2
}

fn bench_jobring(p: &Params) -> Result<(), PoolError> {
    // 0 is the stop marker
    let queue: Arc<JobQueue<u64>> = Arc::new(JobQueue::new(p.capacity)?);
    let sum = Arc::new(AtomicU64::new(0));
    let start = Instant::now();

    let consumers: Vec<_> = (0..p.consumers)
        .map(|_| {
            let queue = Arc::clone(&queue);
            let sum = Arc::clone(&sum);
            thread::spawn(move || {
                let mut local = 0u64;
                loop {
                    match queue.dequeue() {
                        Ok(0) => break,
                        Ok(v) => local += v,
                        Err(_) => continue,
                    }
                }
                sum.fetch_add(local, Ordering::Relaxed);
            })
        })
        .collect();

    let per = p.per_producer();
    let producers: Vec<_> = (0..p.producers)
        .map(|id| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..per {
                    queue.enqueue(id * per + i + 1);
                }
            })
        })
        .collect();

    for h in producers {
        let _ = h.join();
    }
    for _ in 0..p.consumers {
        queue.enqueue(0);
    }
    for h in consumers {
        let _ = h.join();
    }

    report(
        "jobring BoundedQueue",
        p.total(),
        start.elapsed(),
        sum.load(Ordering::Relaxed),
        expected_checksum(p.total()),
    );
    Ok(())
}

fn bench_crossbeam(p: &Params) {
    let queue: Arc<ArrayQueue<u64>> = Arc::new(ArrayQueue::new(p.capacity.max(1)));
    let sum = Arc::new(AtomicU64::new(0));
    let start = Instant::now();

    let consumers: Vec<_> = (0..p.consumers)
        .map(|_| {
            let queue = Arc::clone(&queue);
            let sum = Arc::clone(&sum);
            thread::spawn(move || {
                let mut local = 0u64;
                loop {
                    match queue.pop() {
                        Some(0) => break,
                        Some(v) => local += v,
                        None => std::hint::spin_loop(),
                    }
                }
                sum.fetch_add(local, Ordering::Relaxed);
            })
        })
        .collect();

    let per = p.per_producer();
    let producers: Vec<_> = (0..p.producers)
        .map(|id| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..per {
                    let mut v = id * per + i + 1;
                    while let Err(back) = queue.push(v) {
                        v = back;
                        thread::yield_now();
                    }
                }
            })
        })
        .collect();

    for h in producers {
        let _ = h.join();
    }
    for _ in 0..p.consumers {
        while queue.push(0).is_err() {
            thread::yield_now();
        }
    }
    for h in consumers {
        let _ = h.join();
    }

    report(
        "crossbeam ArrayQueue",
        p.total(),
        start.elapsed(),
        sum.load(Ordering::Relaxed),
        expected_checksum(p.total()),
    );
}

fn bench_pool(p: &Params) -> Result<(), PoolError> {
    let pool = WorkerPool::new(p.consumers as usize, p.capacity)?;
    let sum = Arc::new(AtomicU64::new(0));
    let total = p.total().min(500_000);
    let start = Instant::now();

    for i in 1..=total {
        let sum = Arc::clone(&sum);
        pool.submit_blocking(move || {
            sum.fetch_add(i, Ordering::Relaxed);
        })?;
    }
    pool.wait();

    report(
        "WorkerPool submit",
        total,
        start.elapsed(),
        sum.load(Ordering::Relaxed),
        expected_checksum(total),
    );

    // How often a non-blocking submit bounces off a saturated ring
    let mut full = 0u64;
    for _ in 0..total.min(100_000) {
        match pool.submit(|| {}) {
            Ok(()) => {}
            Err(PoolError::QueueFull) => full += 1,
            Err(e) => return Err(e),
        }
    }
    pool.wait();
    println!("{:<24} {} of {} non-blocking submits hit QueueFull", "", full, total.min(100_000));

    pool.shutdown(true);
    Ok(())
}

fn main() -> Result<(), PoolError> {
    let p = Params::from_args();
    println!("=== jobring Benchmark ===");
    println!(
        "items={} producers={} consumers={} capacity={}\n",
        p.total(),
        p.producers,
        p.consumers,
        p.capacity
    );

    bench_jobring(&p)?;
    bench_crossbeam(&p);
    bench_pool(&p)?;

    // Sanity: a full ring hands the value back
    let tiny: JobQueue<u64> = JobQueue::new(2)?;
    tiny.try_enqueue(1).ok();
    tiny.try_enqueue(2).ok();
    if let Err(Full(v)) = tiny.try_enqueue(3) {
        println!("\nfull ring returned item {} to the producer", v);
    }
    Ok(())
}
