//! Counting semaphore abstraction
//!
//! The queue only uses a semaphore to let consumers sleep while the ring is
//! empty: producers `post` once per published slot, consumers `wait` once
//! per claim. Everything platform-specific (futex, POSIX `sem_t`, named
//! semaphore emulation) sits behind this trait in `jobring-runtime`.
//!
//! `CondvarSemaphore` is the portable implementation and the one used when
//! no faster primitive exists for the target.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::error::SignalError;

/// Counting semaphore used for consumer blocking
///
/// Destruction happens in `Drop`.
pub trait Semaphore: Send + Sync {
    /// Create a semaphore holding `initial` permits
    fn new(initial: u32) -> Result<Self, SignalError>
    where
        Self: Sized;

    /// Add one permit, waking a blocked waiter if there is one.
    /// Never blocks.
    fn post(&self);

    /// Block until a permit is available, then take it
    ///
    /// An `Err` means no permit was taken.
    fn wait(&self) -> Result<(), SignalError>;

    /// Take a permit if one is immediately available
    fn try_wait(&self) -> bool;

    /// Permits currently available (hint, may be stale)
    fn count_hint(&self) -> u32;
}

/// Portable semaphore built on `Mutex` + `Condvar`
pub struct CondvarSemaphore {
    permits: Mutex<u32>,
    cond: Condvar,
}

impl CondvarSemaphore {
    // A poisoned lock only means some waiter panicked; the count is still valid.
    fn lock(&self) -> MutexGuard<'_, u32> {
        self.permits.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Semaphore for CondvarSemaphore {
    fn new(initial: u32) -> Result<Self, SignalError> {
        Ok(Self {
            permits: Mutex::new(initial),
            cond: Condvar::new(),
        })
    }

    fn post(&self) {
        {
            let mut permits = self.lock();
            *permits = permits.saturating_add(1);
        }
        self.cond.notify_one();
    }

    fn wait(&self) -> Result<(), SignalError> {
        let mut permits = self.lock();
        while *permits == 0 {
            permits = self.cond.wait(permits).unwrap_or_else(PoisonError::into_inner);
        }
        *permits -= 1;
        Ok(())
    }

    fn try_wait(&self) -> bool {
        let mut permits = self.lock();
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    fn count_hint(&self) -> u32 {
        *self.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_counting() {
        let sem = CondvarSemaphore::new(2).unwrap();
        assert_eq!(sem.count_hint(), 2);
        assert!(sem.try_wait());
        assert!(sem.try_wait());
        assert!(!sem.try_wait());

        sem.post();
        assert_eq!(sem.count_hint(), 1);
        sem.wait().unwrap();
        assert_eq!(sem.count_hint(), 0);
    }

    #[test]
    fn test_post_wakes_waiter() {
        let sem = Arc::new(CondvarSemaphore::new(0).unwrap());
        let sem2 = Arc::clone(&sem);

        let handle = thread::spawn(move || sem2.wait());

        thread::sleep(Duration::from_millis(20));
        sem.post();

        assert!(handle.join().unwrap().is_ok());
        assert_eq!(sem.count_hint(), 0);
    }
}
