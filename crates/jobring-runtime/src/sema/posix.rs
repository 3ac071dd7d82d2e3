//! POSIX `sem_t` counting semaphore
//!
//! Apple platforms do not implement unnamed semaphores (`sem_init` returns
//! ENOSYS), so there each semaphore is a named one created with
//! `O_CREAT | O_EXCL` under a process-unique name and unlinked on drop.
//! Everywhere else it is an unnamed, process-private `sem_t` kept in a
//! stable heap allocation.

use jobring_core::{kerror, Semaphore, SignalError};
use nix::errno::Errno;

cfg_if::cfg_if! {
    if #[cfg(target_vendor = "apple")] {
        use std::ffi::CString;
        use std::sync::atomic::{AtomicU32, Ordering};

        /// Name counter for this process's semaphores
        static NAME_COUNTER: AtomicU32 = AtomicU32::new(0);

        /// Creation attempts before giving up on EEXIST collisions
        const NAME_ATTEMPTS: u32 = 16;

        struct RawSem {
            ptr: *mut libc::sem_t,
            name: CString,
        }

        impl RawSem {
            fn create(initial: u32) -> Result<Self, SignalError> {
                let id = NAME_COUNTER.fetch_add(1, Ordering::Relaxed);
                let pid = std::process::id();
                for attempt in 0..NAME_ATTEMPTS {
                    let name = CString::new(format!("/jobring_{}_{}_{}", pid, id, attempt))
                        .map_err(|_| SignalError(libc::EINVAL))?;
                    let ptr = unsafe {
                        libc::sem_open(
                            name.as_ptr(),
                            libc::O_CREAT | libc::O_EXCL,
                            0o600 as libc::c_uint,
                            initial as libc::c_uint,
                        )
                    };
                    if ptr != libc::SEM_FAILED {
                        return Ok(Self { ptr, name });
                    }
                    let errno = Errno::last();
                    if errno != Errno::EEXIST {
                        return Err(SignalError(errno as i32));
                    }
                }
                Err(SignalError(libc::EEXIST))
            }

            #[inline]
            fn as_ptr(&self) -> *mut libc::sem_t {
                self.ptr
            }
        }

        impl Drop for RawSem {
            fn drop(&mut self) {
                unsafe {
                    libc::sem_close(self.ptr);
                    libc::sem_unlink(self.name.as_ptr());
                }
            }
        }
    } else {
        use std::cell::UnsafeCell;

        struct RawSem {
            // sem_t must not move after sem_init
            cell: Box<UnsafeCell<libc::sem_t>>,
        }

        impl RawSem {
            fn create(initial: u32) -> Result<Self, SignalError> {
                let cell: Box<UnsafeCell<libc::sem_t>> =
                    Box::new(UnsafeCell::new(unsafe { std::mem::zeroed() }));
                let ret = unsafe { libc::sem_init(cell.get(), 0, initial as libc::c_uint) };
                if ret != 0 {
                    return Err(SignalError(Errno::last() as i32));
                }
                Ok(Self { cell })
            }

            #[inline]
            fn as_ptr(&self) -> *mut libc::sem_t {
                self.cell.get()
            }
        }

        impl Drop for RawSem {
            fn drop(&mut self) {
                unsafe {
                    libc::sem_destroy(self.cell.get());
                }
            }
        }
    }
}

/// Counting semaphore over the host's POSIX semaphore
pub struct PosixSemaphore {
    raw: RawSem,
}

// Safety: sem_t operations are thread-safe by POSIX contract
unsafe impl Send for PosixSemaphore {}
unsafe impl Sync for PosixSemaphore {}

impl Semaphore for PosixSemaphore {
    fn new(initial: u32) -> Result<Self, SignalError> {
        Ok(Self { raw: RawSem::create(initial)? })
    }

    fn post(&self) {
        let ret = unsafe { libc::sem_post(self.raw.as_ptr()) };
        if ret != 0 {
            kerror!("sem_post failed: {}", Errno::last());
        }
    }

    fn wait(&self) -> Result<(), SignalError> {
        let ret = unsafe { libc::sem_wait(self.raw.as_ptr()) };
        if ret != 0 {
            return Err(SignalError(Errno::last() as i32));
        }
        Ok(())
    }

    fn try_wait(&self) -> bool {
        unsafe { libc::sem_trywait(self.raw.as_ptr()) == 0 }
    }

    fn count_hint(&self) -> u32 {
        let mut value: libc::c_int = 0;
        let ret = unsafe { libc::sem_getvalue(self.raw.as_ptr(), &mut value) };
        // Apple returns ENOSYS here
        if ret != 0 || value < 0 {
            return 0;
        }
        value as u32
    }
}
