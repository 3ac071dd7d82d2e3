//! Cache-line padding
//!
//! The enqueue and dequeue cursors are hammered by different threads.
//! Keeping them on separate lines stops producers and consumers from
//! invalidating each other's cache line on every CAS.

use core::ops::{Deref, DerefMut};

/// Pads and aligns a value to the length of a cache line
#[repr(C, align(64))]
#[derive(Debug, Default)]
pub struct CachePadded<T> {
    value: T,
}

impl<T> CachePadded<T> {
    #[inline]
    pub const fn new(value: T) -> Self {
        CachePadded { value }
    }

    #[inline]
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for CachePadded<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for CachePadded<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::CACHE_LINE_SIZE;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_alignment() {
        assert_eq!(core::mem::align_of::<CachePadded<u8>>(), CACHE_LINE_SIZE);
        assert_eq!(core::mem::size_of::<CachePadded<AtomicUsize>>(), CACHE_LINE_SIZE);
    }

    #[test]
    fn test_deref() {
        let padded = CachePadded::new(AtomicUsize::new(7));
        padded.fetch_add(1, Ordering::Relaxed);
        assert_eq!(padded.into_inner().into_inner(), 8);
    }
}
