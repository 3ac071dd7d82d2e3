//! Units of work carried through the queue

use std::fmt;

/// A type-erased job: the closure owns whatever argument it needs
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// What a worker pulls off the queue
///
/// `Poison` is only ever enqueued by the pool itself during shutdown,
/// one per worker. The public submit API only accepts closures, so a
/// producer cannot stop a worker by accident.
pub enum Task {
    /// Run the job, then account for it
    Run(Job),
    /// Worker must exit
    Poison,
}

impl Task {
    /// Wrap a closure as a runnable task
    #[inline]
    pub fn run<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Task::Run(Box::new(f))
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Run(_) => f.write_str("Task::Run(..)"),
            Task::Poison => f.write_str("Task::Poison"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_run_invokes_closure() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let task = Task::run(move || {
            h.fetch_add(1, Ordering::Relaxed);
        });
        assert!(matches!(task, Task::Run(_)));

        match task {
            Task::Run(job) => job(),
            Task::Poison => unreachable!(),
        }
        assert_eq!(hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_poison() {
        assert_eq!(format!("{:?}", Task::Poison), "Task::Poison");
    }
}
