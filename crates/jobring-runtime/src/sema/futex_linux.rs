//! Linux futex-based counting semaphore
//!
//! The futex word IS the permit count:
//! - `post` bumps it and issues FUTEX_WAKE(1) if anyone is sleeping
//! - `wait` decrements it by CAS while it is non-zero, otherwise
//!   FUTEX_WAIT on the value 0
//!
//! `waiters` lets `post` skip the syscall on the uncontended path. Both
//! sides touch `count` and `waiters` with SeqCst so that either the poster
//! sees the sleeper registered, or the sleeper's FUTEX_WAIT sees the new
//! count and returns EAGAIN.

use jobring_core::{Semaphore, SignalError};
use nix::errno::Errno;
use std::sync::atomic::{AtomicU32, Ordering};

pub struct FutexSemaphore {
    /// Futex word: available permits
    count: AtomicU32,

    /// Threads inside (or about to enter) FUTEX_WAIT
    waiters: AtomicU32,
}

impl FutexSemaphore {
    fn futex_wait(&self, expected: u32) -> Result<(), Errno> {
        let ret = unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.count.as_ptr(),
                libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG,
                expected,
                std::ptr::null::<libc::timespec>(),
                std::ptr::null::<u32>(),
                0u32,
            )
        };
        if ret == 0 {
            Ok(())
        } else {
            Err(Errno::last())
        }
    }

    fn futex_wake(&self, n: i32) {
        unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.count.as_ptr(),
                libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
                n,
                std::ptr::null::<libc::timespec>(),
                std::ptr::null::<u32>(),
                0u32,
            );
        }
    }
}

impl Semaphore for FutexSemaphore {
    fn new(initial: u32) -> Result<Self, SignalError> {
        Ok(Self {
            count: AtomicU32::new(initial),
            waiters: AtomicU32::new(0),
        })
    }

    fn post(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
        if self.waiters.load(Ordering::SeqCst) > 0 {
            self.futex_wake(1);
        }
    }

    fn wait(&self) -> Result<(), SignalError> {
        loop {
            if self.try_wait() {
                return Ok(());
            }

            self.waiters.fetch_add(1, Ordering::SeqCst);
            let result = self.futex_wait(0);
            self.waiters.fetch_sub(1, Ordering::SeqCst);

            match result {
                // Woken, count changed under us, or a signal: recheck
                Ok(()) | Err(Errno::EAGAIN) | Err(Errno::EINTR) => {}
                Err(errno) => return Err(SignalError(errno as i32)),
            }
        }
    }

    fn try_wait(&self) -> bool {
        let mut current = self.count.load(Ordering::Relaxed);
        while current > 0 {
            match self.count.compare_exchange_weak(
                current,
                current - 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
        false
    }

    fn count_hint(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }
}
