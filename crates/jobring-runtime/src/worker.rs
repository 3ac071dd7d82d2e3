//! Worker thread main loop
//!
//! Each worker blocks in `dequeue`, runs what it gets, and keeps the pool's
//! `busy` / `queued` counters in step. It exits on a poison task, or on a
//! failed semaphore wait once the pool has stopped running.

use crate::job::Task;
use crate::pool::Shared;

use jobring_core::{kdebug, ktrace};
use std::cell::Cell;
use std::sync::atomic::Ordering;
use std::sync::Arc;

thread_local! {
    static CURRENT_WORKER_ID: Cell<usize> = const { Cell::new(usize::MAX) };
}

/// Index of the pool worker running on this thread, `None` off-pool
#[inline]
pub fn current_worker_id() -> Option<usize> {
    let id = CURRENT_WORKER_ID.with(|cell| cell.get());
    (id != usize::MAX).then_some(id)
}

/// Settles the counters for one job, also when the job unwinds
struct JobGuard<'a> {
    shared: &'a Shared,
}

impl Drop for JobGuard<'_> {
    fn drop(&mut self) {
        self.shared.busy.fetch_sub(1, Ordering::Release);
        // Release: job effects are visible to whoever sees queued reach 0
        self.shared.queued.fetch_sub(1, Ordering::Release);
    }
}

pub(crate) fn worker_loop(shared: Arc<Shared>, worker_id: usize) {
    CURRENT_WORKER_ID.with(|cell| cell.set(worker_id));
    ktrace!("worker {} started", worker_id);

    let mut executed: u64 = 0;
    loop {
        let task = match shared.queue.dequeue() {
            Ok(task) => task,
            Err(err) => {
                if !shared.running.load(Ordering::Acquire) {
                    kdebug!("worker {}: {} after stop, exiting", worker_id, err);
                    break;
                }
                ktrace!("worker {}: {}, retrying", worker_id, err);
                continue;
            }
        };

        match task {
            Task::Poison => break,
            Task::Run(job) => {
                shared.busy.fetch_add(1, Ordering::Relaxed);
                let _guard = JobGuard { shared: &shared };
                job();
                executed += 1;
            }
        }
    }

    ktrace!("worker {} exiting after {} jobs", worker_id, executed);
}
