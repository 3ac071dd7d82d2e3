//! Bounded lock-free MPMC queue
//!
//! Ring buffer of slots, each carrying a sequence number (Dmitry Vyukov's
//! bounded MPMC design). Two monotonically increasing cursors,
//! `enqueue_pos` and `dequeue_pos`, are advanced by CAS; the slot's
//! sequence alone says who may touch the slot next:
//!
//! ```text
//!   slot i = g & mask, generation g
//!
//!   sequence == g            free, producer of generation g may write
//!   sequence == g + 1        published, consumer of generation g may read
//!   sequence == g + capacity recycled, producer of generation g + capacity
//! ```
//!
//! Memory ordering: sequence stores are `Release`, sequence loads are
//! `Acquire`, and the cursors are `Relaxed`. The acquire/release pair on a
//! slot's sequence is the only happens-before edge between the producer
//! writing a value and the consumer reading it.
//!
//! A counting semaphore is posted once per published slot so consumers can
//! sleep instead of spinning on an empty ring. Producers never touch it
//! except to post.

use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::backoff::Backoff;
use crate::constants::{DEFAULT_SPIN_LIMIT, MAX_CAPACITY, MIN_CAPACITY};
use crate::error::{Full, PoolError, PoolResult, SignalError};
use crate::pad::CachePadded;
use crate::semaphore::Semaphore;

struct Slot<T> {
    sequence: AtomicUsize,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    fn new(sequence: usize) -> Self {
        Slot {
            sequence: AtomicUsize::new(sequence),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }
}

/// Fixed-capacity multi-producer multi-consumer queue
///
/// `try_enqueue` and `enqueue` never take a lock; `dequeue` blocks on the
/// semaphore `S` until an item has been published.
pub struct BoundedQueue<T, S: Semaphore> {
    slots: Box<[Slot<T>]>,
    mask: usize,
    enqueue_pos: CachePadded<AtomicUsize>,
    dequeue_pos: CachePadded<AtomicUsize>,
    available: S,
    spin_limit: u32,
}

// Safety: values move between threads through the slot protocol; a slot is
// only accessed by the single thread that won its (slot, generation) CAS.
unsafe impl<T: Send, S: Semaphore> Send for BoundedQueue<T, S> {}
unsafe impl<T: Send, S: Semaphore> Sync for BoundedQueue<T, S> {}

/// Capacity the queue builds for a requested size: next power of two, at least 2
pub fn round_capacity(capacity_hint: usize) -> Option<usize> {
    let capacity = capacity_hint.max(MIN_CAPACITY).checked_next_power_of_two()?;
    if capacity > MAX_CAPACITY {
        return None;
    }
    Some(capacity)
}

impl<T, S: Semaphore> BoundedQueue<T, S> {
    /// Create a queue holding at least `capacity_hint` items
    ///
    /// Fails with `AllocationFailure` if the rounded capacity is too large,
    /// the slot array cannot be allocated, or the semaphore cannot be
    /// created.
    pub fn new(capacity_hint: usize) -> PoolResult<Self> {
        Self::with_spin_limit(capacity_hint, DEFAULT_SPIN_LIMIT)
    }

    /// Like `new`, with the backoff spin limit used by blocking enqueue
    pub fn with_spin_limit(capacity_hint: usize, spin_limit: u32) -> PoolResult<Self> {
        let capacity = round_capacity(capacity_hint).ok_or(PoolError::AllocationFailure)?;

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| PoolError::AllocationFailure)?;
        slots.extend((0..capacity).map(Slot::new));

        // `slots` is released on the error path by its own Drop
        let available = S::new(0).map_err(|_| PoolError::AllocationFailure)?;

        Ok(BoundedQueue {
            slots: slots.into_boxed_slice(),
            mask: capacity - 1,
            enqueue_pos: CachePadded::new(AtomicUsize::new(0)),
            dequeue_pos: CachePadded::new(AtomicUsize::new(0)),
            available,
            spin_limit,
        })
    }

    /// Number of slots (a power of two)
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn mask(&self) -> usize {
        self.mask
    }

    /// Items reserved but not yet claimed (approximate under contention)
    pub fn len(&self) -> usize {
        let tail = self.enqueue_pos.load(Ordering::Relaxed);
        let head = self.dequeue_pos.load(Ordering::Relaxed);
        tail.wrapping_sub(head).min(self.capacity())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Published items no consumer has been signalled for yet (may be stale)
    #[inline]
    pub fn ready_hint(&self) -> u32 {
        self.available.count_hint()
    }

    /// Enqueue without blocking
    ///
    /// Returns `Err(Full(value))` when the slot at the enqueue cursor still
    /// holds an unconsumed item from the previous lap.
    pub fn try_enqueue(&self, value: T) -> Result<(), Full<T>> {
        let mut pos = self.enqueue_pos.load(Ordering::Relaxed);
        loop {
            let slot = &self.slots[pos & self.mask];
            let seq = slot.sequence.load(Ordering::Acquire);
            let diff = seq.wrapping_sub(pos) as isize;

            if diff == 0 {
                match self.enqueue_pos.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // Safety: winning the CAS for generation `pos` gives
                        // exclusive write access until the Release below.
                        unsafe { (*slot.value.get()).write(value) };
                        slot.sequence.store(pos.wrapping_add(1), Ordering::Release);
                        self.available.post();
                        return Ok(());
                    }
                    Err(current) => pos = current,
                }
            } else if diff < 0 {
                return Err(Full(value));
            } else {
                pos = self.enqueue_pos.load(Ordering::Relaxed);
            }
        }
    }

    /// Enqueue, backing off (spin, then yield) until a slot frees up
    pub fn enqueue(&self, mut value: T) {
        let mut backoff = Backoff::with_spin_limit(self.spin_limit);
        loop {
            match self.try_enqueue(value) {
                Ok(()) => return,
                Err(Full(returned)) => {
                    value = returned;
                    backoff.snooze();
                }
            }
        }
    }

    /// Block until an item is available and take it
    ///
    /// `Err(SignalError)` means the semaphore wait failed and nothing was
    /// dequeued.
    pub fn dequeue(&self) -> Result<T, SignalError> {
        self.available.wait()?;
        Ok(self.claim())
    }

    /// Take an item only if one has already been signalled
    pub fn try_dequeue(&self) -> Option<T> {
        if !self.available.try_wait() {
            return None;
        }
        Some(self.claim())
    }

    // Caller holds a semaphore permit, so some generation at or after the
    // cursor is (or is about to be) published for us.
    fn claim(&self) -> T {
        let mut backoff = Backoff::with_spin_limit(self.spin_limit);
        let mut pos = self.dequeue_pos.load(Ordering::Relaxed);
        loop {
            let slot = &self.slots[pos & self.mask];
            let seq = slot.sequence.load(Ordering::Acquire);
            let diff = seq.wrapping_sub(pos.wrapping_add(1)) as isize;

            if diff == 0 {
                match self.dequeue_pos.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // Safety: the Acquire load saw the producer's Release
                        // publish, and the CAS makes us the only reader.
                        let value = unsafe { (*slot.value.get()).assume_init_read() };
                        slot.sequence
                            .store(pos.wrapping_add(self.mask).wrapping_add(1), Ordering::Release);
                        return value;
                    }
                    Err(current) => pos = current,
                }
            } else {
                // diff < 0: producer reserved this slot but has not published yet
                if diff < 0 {
                    backoff.spin();
                }
                pos = self.dequeue_pos.load(Ordering::Relaxed);
            }
        }
    }
}

impl<T, S: Semaphore> Drop for BoundedQueue<T, S> {
    fn drop(&mut self) {
        if !core::mem::needs_drop::<T>() {
            return;
        }
        let head = *self.dequeue_pos.get_mut();
        let tail = *self.enqueue_pos.get_mut();
        let mut pos = head;
        while pos != tail {
            let slot = &mut self.slots[pos & self.mask];
            if *slot.sequence.get_mut() == pos.wrapping_add(1) {
                // Safety: published and never claimed
                unsafe { slot.value.get_mut().assume_init_drop() };
            }
            pos = pos.wrapping_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semaphore::CondvarSemaphore;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;
    use std::thread;

    type Queue<T> = BoundedQueue<T, CondvarSemaphore>;

    #[test]
    fn test_capacity_rounding() {
        let q: Queue<usize> = Queue::new(3).unwrap();
        assert_eq!(q.capacity(), 4);
        assert_eq!(q.mask(), 3);

        let q: Queue<usize> = Queue::new(2).unwrap();
        assert_eq!(q.capacity(), 2);
        assert_eq!(q.mask(), 1);

        let q: Queue<usize> = Queue::new(1).unwrap();
        assert_eq!(q.capacity(), 2);

        let q: Queue<usize> = Queue::new(1000).unwrap();
        assert_eq!(q.capacity(), 1024);
    }

    #[test]
    fn test_capacity_too_large() {
        assert!(round_capacity(usize::MAX).is_none());
        assert!(round_capacity(MAX_CAPACITY + 1).is_none());
        assert_eq!(round_capacity(MAX_CAPACITY), Some(MAX_CAPACITY));

        let res: PoolResult<Queue<usize>> = Queue::new(usize::MAX);
        assert_eq!(res.err(), Some(PoolError::AllocationFailure));
    }

    #[test]
    fn test_ready_hint_tracks_published() {
        let q: Queue<u32> = Queue::new(4).unwrap();
        assert_eq!(q.ready_hint(), 0);
        q.try_enqueue(1).unwrap();
        q.try_enqueue(2).unwrap();
        assert_eq!(q.ready_hint(), 2);
        assert_eq!(q.try_dequeue(), Some(1));
        assert_eq!(q.ready_hint(), 1);
    }

    #[test]
    fn test_basic_fifo_and_full() {
        let q: Queue<usize> = Queue::new(4).unwrap();
        for i in 0..4 {
            assert!(q.try_enqueue(i + 1).is_ok());
        }
        assert_eq!(q.len(), 4);

        let extra = q.try_enqueue(99);
        assert_eq!(extra.map_err(Full::into_inner), Err(99));

        for i in 0..4 {
            assert_eq!(q.dequeue().unwrap(), i + 1);
        }
        assert!(q.is_empty());

        // Slot is reusable after the lap completes
        assert!(q.try_enqueue(99).is_ok());
        assert_eq!(q.dequeue().unwrap(), 99);
    }

    #[test]
    fn test_try_dequeue_empty() {
        let q: Queue<u32> = Queue::new(2).unwrap();
        assert_eq!(q.try_dequeue(), None);
        q.try_enqueue(7).unwrap();
        assert_eq!(q.try_dequeue(), Some(7));
        assert_eq!(q.try_dequeue(), None);
    }

    #[test]
    fn test_wraparound_stability() {
        let q: Queue<usize> = Queue::new(2).unwrap();
        for i in 0..10_000 {
            q.try_enqueue(i).unwrap();
            assert_eq!(q.dequeue().unwrap(), i);
        }
    }

    #[test]
    fn test_blocking_enqueue_waits_for_space() {
        let q: Arc<Queue<usize>> = Arc::new(Queue::new(2).unwrap());
        q.try_enqueue(0).unwrap();
        q.try_enqueue(1).unwrap();

        let producer = {
            let q = Arc::clone(&q);
            thread::spawn(move || q.enqueue(2))
        };

        assert_eq!(q.dequeue().unwrap(), 0);
        producer.join().unwrap();
        assert_eq!(q.dequeue().unwrap(), 1);
        assert_eq!(q.dequeue().unwrap(), 2);
    }

    #[test]
    fn test_drop_releases_pending_items() {
        struct Tracked(Arc<AtomicU32>);
        impl Drop for Tracked {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::Relaxed);
            }
        }

        let drops = Arc::new(AtomicU32::new(0));
        {
            let q: Queue<Tracked> = Queue::new(4).unwrap();
            for _ in 0..3 {
                assert!(q.try_enqueue(Tracked(Arc::clone(&drops))).is_ok());
            }
            // One consumed, two left behind
            drop(q.dequeue().unwrap());
            assert_eq!(drops.load(Ordering::Relaxed), 1);
        }
        assert_eq!(drops.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_mpmc_concurrency() {
        const PRODUCERS: usize = 4;
        const CONSUMERS: usize = 3;
        const PER_PRODUCER: usize = 10_000;
        const TOTAL: usize = PRODUCERS * PER_PRODUCER;

        // None is the per-consumer stop marker
        let q: Arc<Queue<Option<usize>>> = Arc::new(Queue::new(64).unwrap());
        let seen: Arc<Vec<AtomicU32>> = Arc::new((0..TOTAL).map(|_| AtomicU32::new(0)).collect());

        let consumers: Vec<_> = (0..CONSUMERS)
            .map(|_| {
                let q = Arc::clone(&q);
                let seen = Arc::clone(&seen);
                thread::spawn(move || {
                    let mut consumed = 0usize;
                    loop {
                        match q.dequeue() {
                            Ok(Some(id)) => {
                                assert!(id < TOTAL);
                                seen[id].fetch_add(1, Ordering::Relaxed);
                                consumed += 1;
                            }
                            Ok(None) => break,
                            Err(_) => continue,
                        }
                    }
                    consumed
                })
            })
            .collect();

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let q = Arc::clone(&q);
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        let mut item = Some(p * PER_PRODUCER + i);
                        while let Err(Full(back)) = q.try_enqueue(item) {
                            item = back;
                            thread::yield_now();
                        }
                    }
                })
            })
            .collect();

        for h in producers {
            h.join().unwrap();
        }
        for _ in 0..CONSUMERS {
            q.enqueue(None);
        }

        let consumed: usize = consumers.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(consumed, TOTAL);

        for (id, count) in seen.iter().enumerate() {
            assert_eq!(count.load(Ordering::Relaxed), 1, "id {} seen wrong number of times", id);
        }
    }
}
