//! `WorkerPool`: a fixed set of OS threads draining one bounded MPMC queue.
//!
//! Producers on any thread call `submit` (never blocks, fails with
//! `QueueFull` under backpressure) or `submit_blocking` (backs off until a
//! slot frees up). `wait` busy-polls until nothing is queued or running.
//!
//! # Lifecycle
//!
//! ```text
//! Created ──► Running ──► Draining ──► Stopping ──► Terminated
//!            accepting    !accepting   poisons sent  workers joined
//!            running      running      !running      queue dropped
//! ```
//!
//! There is no way back to `Running`.

use crate::config::PoolConfig;
use crate::job::Task;
use crate::worker::worker_loop;
use crate::JobQueue;

use jobring_core::{kdebug, kerror, Backoff, Full, PoolError, PoolResult};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Pool lifecycle state
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PoolState {
    /// Queue built, workers being spawned
    Created = 0,
    /// Accepting submissions
    Running = 1,
    /// Submissions rejected, workers still draining
    Draining = 2,
    /// Poisons enqueued, waiting for workers to exit
    Stopping = 3,
    /// Workers joined
    Terminated = 4,
}

impl PoolState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => PoolState::Created,
            1 => PoolState::Running,
            2 => PoolState::Draining,
            3 => PoolState::Stopping,
            _ => PoolState::Terminated,
        }
    }
}

/// State shared between the pool handle and its workers
pub(crate) struct Shared {
    pub(crate) queue: JobQueue<Task>,
    /// Cleared once poisons are sent; a failed wait then means "exit"
    pub(crate) running: AtomicBool,
    /// Cleared when shutdown begins; submit checks it first
    pub(crate) accepting: AtomicBool,
    /// Jobs currently executing
    pub(crate) busy: AtomicUsize,
    /// Jobs submitted and not yet finished (includes executing ones)
    pub(crate) queued: AtomicUsize,
    state: AtomicU8,
}

impl Shared {
    fn set_state(&self, state: PoolState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn state(&self) -> PoolState {
        PoolState::from_u8(self.state.load(Ordering::Acquire))
    }
}

/// Fixed-size worker pool over a lock-free bounded queue
pub struct WorkerPool {
    shared: Arc<Shared>,
    handles: Vec<JoinHandle<()>>,
    config: PoolConfig,
}

impl WorkerPool {
    /// Create a pool with `num_workers` threads and room for at least
    /// `queue_capacity` pending jobs (rounded up to a power of two).
    pub fn new(num_workers: usize, queue_capacity: usize) -> PoolResult<Self> {
        Self::with_config(
            PoolConfig::new()
                .num_workers(num_workers)
                .queue_capacity(queue_capacity),
        )
    }

    /// One worker per CPU (capped), with the given queue capacity
    pub fn auto_sized(queue_capacity: usize) -> PoolResult<Self> {
        Self::with_config(PoolConfig::new().queue_capacity(queue_capacity))
    }

    /// Pool configured from `JR_*` environment variables
    pub fn from_env() -> PoolResult<Self> {
        Self::with_config(PoolConfig::from_env())
    }

    pub fn with_config(config: PoolConfig) -> PoolResult<Self> {
        config.validate()?;

        let queue = JobQueue::<Task>::with_spin_limit(config.queue_capacity, config.spin_limit)?;

        let mut handles = Vec::new();
        handles
            .try_reserve_exact(config.num_workers)
            .map_err(|_| PoolError::AllocationFailure)?;

        let shared = Arc::new(Shared {
            queue,
            running: AtomicBool::new(true),
            accepting: AtomicBool::new(true),
            busy: AtomicUsize::new(0),
            queued: AtomicUsize::new(0),
            state: AtomicU8::new(PoolState::Created as u8),
        });

        let mut pool = WorkerPool { shared, handles, config };

        for worker_id in 0..pool.config.num_workers {
            match pool.spawn_worker(worker_id) {
                Ok(handle) => pool.handles.push(handle),
                Err(e) => {
                    kerror!("failed to spawn worker {}: {}", worker_id, e);
                    // Poisons go only to the workers that did start
                    pool.stop(false);
                    return Err(PoolError::SpawnFailed(e.raw_os_error().unwrap_or(0)));
                }
            }
        }

        pool.shared.set_state(PoolState::Running);
        kdebug!(
            "pool started: {} workers, queue capacity {}",
            pool.handles.len(),
            pool.shared.queue.capacity()
        );
        Ok(pool)
    }

    fn spawn_worker(&self, worker_id: usize) -> std::io::Result<JoinHandle<()>> {
        let shared = Arc::clone(&self.shared);
        let mut builder =
            thread::Builder::new().name(format!("{}-{}", self.config.thread_name, worker_id));
        if self.config.stack_size > 0 {
            builder = builder.stack_size(self.config.stack_size);
        }
        builder.spawn(move || worker_loop(shared, worker_id))
    }

    /// Submit a job without blocking.
    ///
    /// - `Err(Rejected)` once shutdown has begun
    /// - `Err(QueueFull)` when no slot is free; the job is dropped unrun
    pub fn submit<F>(&self, f: F) -> PoolResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        if !self.shared.accepting.load(Ordering::Acquire) {
            return Err(PoolError::Rejected);
        }

        // Counted before publishing so a worker can never finish it first
        self.shared.queued.fetch_add(1, Ordering::Relaxed);
        match self.shared.queue.try_enqueue(Task::run(f)) {
            Ok(()) => Ok(()),
            Err(Full(_)) => {
                self.shared.queued.fetch_sub(1, Ordering::Release);
                Err(PoolError::QueueFull)
            }
        }
    }

    /// Submit a job, backing off until a slot is free.
    ///
    /// Only fails with `Rejected`, if shutdown has begun.
    pub fn submit_blocking<F>(&self, f: F) -> PoolResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        if !self.shared.accepting.load(Ordering::Acquire) {
            return Err(PoolError::Rejected);
        }

        self.shared.queued.fetch_add(1, Ordering::Relaxed);
        self.shared.queue.enqueue(Task::run(f));
        Ok(())
    }

    /// Spin until no job is queued or executing.
    ///
    /// Observes a momentary quiescent point only: other threads may keep
    /// submitting. Calling this from inside a job never returns.
    pub fn wait(&self) {
        let mut backoff = Backoff::with_spin_limit(self.config.spin_limit);
        let mut last_queued = usize::MAX;
        loop {
            let queued = self.shared.queued.load(Ordering::Acquire);
            if queued == 0 && self.shared.busy.load(Ordering::Acquire) == 0 {
                return;
            }
            // Jobs are still completing, go back to spinning
            if queued < last_queued && backoff.is_yielding() {
                backoff.reset();
            }
            last_queued = queued;
            backoff.snooze();
        }
    }

    /// Stop accepting submissions without tearing the pool down.
    ///
    /// Already queued jobs keep running; finish with `shutdown`.
    pub fn close(&self) {
        if self.shared.accepting.swap(false, Ordering::AcqRel) {
            self.shared.set_state(PoolState::Draining);
            kdebug!("pool closed to new submissions");
        }
    }

    /// Shut the pool down and join every worker.
    ///
    /// With `wait_for_jobs`, everything already submitted finishes first.
    /// Without it, workers are poisoned right away; jobs queued ahead of a
    /// worker's poison may still run, nothing submitted after `close`
    /// does.
    pub fn shutdown(mut self, wait_for_jobs: bool) {
        self.stop(wait_for_jobs);
    }

    fn stop(&mut self, wait_for_jobs: bool) {
        if self.shared.state() == PoolState::Terminated {
            return;
        }

        self.close();
        if wait_for_jobs {
            self.wait();
        }
        kdebug!(
            "pool stopping: {} workers, {} jobs unclaimed",
            self.handles.len(),
            self.shared.queue.ready_hint()
        );

        for _ in 0..self.handles.len() {
            self.shared.queue.enqueue(Task::Poison);
        }
        self.shared.running.store(false, Ordering::Release);
        self.shared.set_state(PoolState::Stopping);

        for (worker_id, handle) in self.handles.drain(..).enumerate() {
            if handle.join().is_err() {
                kerror!("worker {} terminated by a panicking job", worker_id);
            }
        }

        self.shared.set_state(PoolState::Terminated);
        kdebug!(
            "pool terminated (busy={}, queued={})",
            self.shared.busy.load(Ordering::Relaxed),
            self.shared.queued.load(Ordering::Relaxed)
        );
    }

    #[inline]
    pub fn state(&self) -> PoolState {
        self.shared.state()
    }

    #[inline]
    pub fn is_accepting(&self) -> bool {
        self.shared.accepting.load(Ordering::Acquire)
    }

    /// Jobs currently executing
    #[inline]
    pub fn busy(&self) -> usize {
        self.shared.busy.load(Ordering::Relaxed)
    }

    /// Jobs submitted and not yet finished
    #[inline]
    pub fn queued(&self) -> usize {
        self.shared.queued.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn num_workers(&self) -> usize {
        self.config.num_workers
    }

    /// Effective queue capacity (power of two)
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.queue.capacity()
    }

    #[inline]
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop(false);
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("state", &self.state())
            .field("workers", &self.num_workers())
            .field("capacity", &self.capacity())
            .field("busy", &self.busy())
            .field("queued", &self.queued())
            .field("ready", &self.shared.queue.ready_hint())
            .finish()
    }
}
