//! Platform counting semaphores
//!
//! The queue blocks consumers on a `Semaphore` while the ring is empty.
//! Which primitive backs it is a per-target decision:
//!
//! | Target | `PlatformSemaphore` |
//! |--------|---------------------|
//! | Linux | `FutexSemaphore` (or `PosixSemaphore` with `posix-sem`) |
//! | macOS / other unix | `PosixSemaphore` (named `sem_open` on Apple) |
//! | everything else | `CondvarSemaphore` from jobring-core |

pub use jobring_core::semaphore::{CondvarSemaphore, Semaphore};

#[cfg(target_os = "linux")]
mod futex_linux;
#[cfg(target_os = "linux")]
pub use futex_linux::FutexSemaphore;

#[cfg(unix)]
mod posix;
#[cfg(unix)]
pub use posix::PosixSemaphore;

cfg_if::cfg_if! {
    if #[cfg(all(target_os = "linux", not(feature = "posix-sem")))] {
        pub use futex_linux::FutexSemaphore as PlatformSemaphore;
    } else if #[cfg(unix)] {
        pub use posix::PosixSemaphore as PlatformSemaphore;
    } else {
        pub use jobring_core::semaphore::CondvarSemaphore as PlatformSemaphore;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn check_counting<S: Semaphore>() {
        let sem = S::new(2).unwrap();
        assert!(sem.try_wait());
        assert!(sem.try_wait());
        assert!(!sem.try_wait());

        sem.post();
        sem.post();
        sem.wait().unwrap();
        sem.wait().unwrap();
        assert!(!sem.try_wait());
    }

    fn check_post_wakes_waiter<S: Semaphore + 'static>() {
        let sem = Arc::new(S::new(0).unwrap());
        let sem2 = Arc::clone(&sem);

        let handle = thread::spawn(move || sem2.wait());

        // Give thread time to block
        thread::sleep(Duration::from_millis(50));
        sem.post();

        assert!(handle.join().unwrap().is_ok());
        assert!(!sem.try_wait());
    }

    fn check_many_waiters<S: Semaphore + 'static>() {
        const WAITERS: usize = 4;
        const ROUNDS: usize = 500;

        let sem = Arc::new(S::new(0).unwrap());
        let taken = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..WAITERS)
            .map(|_| {
                let sem = Arc::clone(&sem);
                let taken = Arc::clone(&taken);
                thread::spawn(move || {
                    for _ in 0..ROUNDS {
                        while sem.wait().is_err() {}
                        taken.fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect();

        for _ in 0..WAITERS * ROUNDS {
            sem.post();
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(taken.load(Ordering::Relaxed), WAITERS * ROUNDS);
        assert!(!sem.try_wait());
    }

    #[test]
    fn test_platform_semaphore() {
        check_counting::<PlatformSemaphore>();
        check_post_wakes_waiter::<PlatformSemaphore>();
        check_many_waiters::<PlatformSemaphore>();
    }

    #[test]
    fn test_condvar_semaphore() {
        check_many_waiters::<CondvarSemaphore>();
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_futex_semaphore() {
        check_counting::<FutexSemaphore>();
        check_post_wakes_waiter::<FutexSemaphore>();
        check_many_waiters::<FutexSemaphore>();
    }

    #[cfg(unix)]
    #[test]
    fn test_posix_semaphore() {
        check_counting::<PosixSemaphore>();
        check_post_wakes_waiter::<PosixSemaphore>();
        check_many_waiters::<PosixSemaphore>();
    }
}
