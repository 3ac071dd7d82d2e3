//! Spin-then-yield backoff
//!
//! Used wherever a thread has to retry without a blocking primitive:
//! blocking enqueue on a full ring, a consumer waiting for a producer to
//! finish publishing a slot, and the busy-polling `wait()` on the pool.
//!
//! Step `n` issues `2^n` pause hints until `n` reaches the spin limit,
//! after which every step is a `thread::yield_now()`.

use crate::constants::DEFAULT_SPIN_LIMIT;

/// Exponential backoff state for one retry loop
#[derive(Debug)]
pub struct Backoff {
    step: u32,
    spin_limit: u32,
}

impl Backoff {
    /// Backoff with the default spin limit
    #[inline]
    pub const fn new() -> Self {
        Self::with_spin_limit(DEFAULT_SPIN_LIMIT)
    }

    /// Backoff that spins up to `2^spin_limit` hints per step before yielding
    #[inline]
    pub const fn with_spin_limit(spin_limit: u32) -> Self {
        // 2^16 pause hints is already tens of microseconds
        let spin_limit = if spin_limit > 16 { 16 } else { spin_limit };
        Backoff { step: 0, spin_limit }
    }

    /// Short busy-spin, for retries expected to succeed almost immediately
    #[inline]
    pub fn spin(&mut self) {
        let exp = self.step.min(self.spin_limit);
        for _ in 0..(1u32 << exp) {
            core::hint::spin_loop();
        }
        if self.step <= self.spin_limit {
            self.step += 1;
        }
    }

    /// Spin while the exponent is below the limit, then yield the CPU
    #[inline]
    pub fn snooze(&mut self) {
        if self.step < self.spin_limit {
            for _ in 0..(1u32 << self.step) {
                core::hint::spin_loop();
            }
            self.step += 1;
        } else {
            std::thread::yield_now();
        }
    }

    /// True once `snooze` has moved on to yielding
    #[inline]
    pub fn is_yielding(&self) -> bool {
        self.step >= self.spin_limit
    }

    #[inline]
    pub fn reset(&mut self) {
        self.step = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snooze_reaches_yield() {
        let mut backoff = Backoff::with_spin_limit(3);
        for _ in 0..3 {
            assert!(!backoff.is_yielding());
            backoff.snooze();
        }
        assert!(backoff.is_yielding());

        // Stays yielding
        backoff.snooze();
        assert!(backoff.is_yielding());

        backoff.reset();
        assert!(!backoff.is_yielding());
    }

    #[test]
    fn test_zero_limit_yields_immediately() {
        let backoff = Backoff::with_spin_limit(0);
        assert!(backoff.is_yielding());
    }

    #[test]
    fn test_limit_is_capped() {
        let mut backoff = Backoff::with_spin_limit(u32::MAX);
        for _ in 0..40 {
            backoff.spin();
        }
        assert!(backoff.is_yielding());
    }
}
