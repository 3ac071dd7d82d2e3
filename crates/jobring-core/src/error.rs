//! Error types for the jobring pool and queue

use core::fmt;

/// Result type for pool operations
pub type PoolResult<T> = Result<T, PoolError>;

/// Errors that can occur in pool and queue operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Slot array, handle array or semaphore could not be created
    AllocationFailure,

    /// Non-blocking submit found no free slot
    QueueFull,

    /// Submit attempted after shutdown began
    Rejected,

    /// Blocking wait on the availability semaphore failed
    Signal(SignalError),

    /// Failed to spawn a worker thread (OS error code, 0 if unknown)
    SpawnFailed(i32),

    /// Pool configuration rejected by validation
    InvalidConfig(&'static str),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::AllocationFailure => write!(f, "allocation failed"),
            PoolError::QueueFull => write!(f, "queue full"),
            PoolError::Rejected => write!(f, "pool is shutting down"),
            PoolError::Signal(e) => write!(f, "signal error: {}", e),
            PoolError::SpawnFailed(code) => {
                write!(f, "failed to spawn worker thread: errno {}", code)
            }
            PoolError::InvalidConfig(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for PoolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PoolError::Signal(e) => Some(e),
            _ => None,
        }
    }
}

/// The semaphore wait (or setup) failed with the given OS error code
///
/// A dequeue that returns this did NOT take an item off the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalError(pub i32);

impl SignalError {
    /// OS error code, 0 when the failure did not come from the OS
    #[inline]
    pub fn code(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for SignalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "semaphore wait failed: errno {}", self.0)
    }
}

impl std::error::Error for SignalError {}

impl From<SignalError> for PoolError {
    fn from(e: SignalError) -> Self {
        PoolError::Signal(e)
    }
}

/// Error returned by `try_enqueue` on a full queue, handing the value back
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Full<T>(pub T);

impl<T> Full<T> {
    /// Recover the value that could not be enqueued
    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Full(..)")
    }
}

impl<T> fmt::Display for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue full")
    }
}

impl<T> From<Full<T>> for PoolError {
    fn from(_: Full<T>) -> Self {
        PoolError::QueueFull
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(format!("{}", PoolError::QueueFull), "queue full");
        assert_eq!(format!("{}", PoolError::Rejected), "pool is shutting down");

        let e = PoolError::Signal(SignalError(4));
        assert_eq!(format!("{}", e), "signal error: semaphore wait failed: errno 4");
    }

    #[test]
    fn test_error_conversion() {
        let e: PoolError = SignalError(22).into();
        assert!(matches!(e, PoolError::Signal(SignalError(22))));

        let e: PoolError = Full(Box::new(5u32)).into();
        assert_eq!(e, PoolError::QueueFull);
    }

    #[test]
    fn test_full_returns_value() {
        let full = Full(String::from("job"));
        assert_eq!(full.into_inner(), "job");
    }
}
