//! The bounded ring buffer shared by the SPSC and MPSC queues.
//!
//! Storage is one boxed slice of slots addressed by two monotonically
//! increasing counters:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │ head (cache-line padded) - next position to read      │
//! ├───────────────────────────────────────────────────────┤
//! │ tail (cache-line padded) - next position to write     │
//! ├───────────────────────────────────────────────────────┤
//! │ slots: [MaybeUninit<T>; capacity]                     │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! The queue holds positions `[head, tail)`. A position maps to slot
//! `pos & mask`, and `0 <= tail - head <= capacity` always holds.

use std::mem::MaybeUninit;

use crossbeam_utils::{Backoff, CachePadded};

use crate::error::{Error, Result};
use crate::sync::{AtomicUsize, Ordering, UnsafeCell};

type Slot<T> = UnsafeCell<MaybeUninit<T>>;

/// Fixed-capacity circular buffer with one write counter and one read counter.
pub struct RingBuffer<T> {
    /// Consumer's read position. Written only by the consumer.
    head: CachePadded<AtomicUsize>,
    /// Producer's write position. Advanced by producer(s) only.
    tail: CachePadded<AtomicUsize>,

    slots: Box<[Slot<T>]>,
    capacity: usize,
    mask: usize,
}

// Safety: slots are only touched by the thread that reserved them, and every
// handoff goes through an acquire/release pair on head, tail or a slot stamp.
unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Send> Sync for RingBuffer<T> {}

impl<T> RingBuffer<T> {
    /// Creates a ring buffer with exactly `capacity` slots.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCapacity`] unless `capacity` is a non-zero power
    /// of two. The capacity is never rounded.
    pub fn new(capacity: usize) -> Result<Self> {
        if !capacity.is_power_of_two() {
            tracing::debug!(capacity, "rejected ring buffer capacity");
            return Err(Error::InvalidCapacity { capacity });
        }

        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect();

        Ok(Self {
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
            slots,
            capacity,
            mask: capacity - 1,
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of occupied positions, `tail - head`, observed at one instant.
    ///
    /// Advisory under concurrency. `head` is loaded first so the difference
    /// can't underflow; the clamp covers a consumer racing ahead between loads.
    #[inline]
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        tail.wrapping_sub(head).min(self.capacity)
    }

    #[inline(always)]
    fn slot(&self, pos: usize) -> &Slot<T> {
        // Safety: pos & mask < capacity == slots.len()
        unsafe { self.slots.get_unchecked(pos & self.mask) }
    }

    // === Producer side ===

    /// Claims the next write position among any number of producers.
    ///
    /// On success `tail` has been advanced by one and the returned position is
    /// owned by the caller. The slot is *not* yet readable; the caller must
    /// publish it by some other means (the MPSC queue uses per-slot stamps).
    /// Returns `None` when full.
    #[inline]
    pub fn reserve_write(&self) -> Option<usize> {
        // head before tail: any tail we read afterwards is >= head.
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Relaxed);

        if tail.wrapping_sub(head) >= self.capacity {
            return None;
        }

        match self.tail.compare_exchange_weak(
            tail,
            tail.wrapping_add(1),
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => Some(tail),
            Err(_) => self.reserve_write_contended(),
        }
    }

    #[cold]
    fn reserve_write_contended(&self) -> Option<usize> {
        let backoff = Backoff::new();

        loop {
            let head = self.head.load(Ordering::Acquire);
            let tail = self.tail.load(Ordering::Relaxed);

            if tail.wrapping_sub(head) >= self.capacity {
                return None;
            }

            if self
                .tail
                .compare_exchange_weak(
                    tail,
                    tail.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                )
                .is_ok()
            {
                return Some(tail);
            }

            backoff.spin();
        }
    }

    /// Single-producer form: the next write position, without advancing `tail`.
    ///
    /// `tail` is read relaxed (only the caller writes it) and `head` with
    /// acquire, so the slot the consumer last vacated is free to overwrite.
    /// Publish with [`commit_write`](Self::commit_write).
    #[inline]
    pub fn reserve_write_exclusive(&self) -> Option<usize> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        (tail.wrapping_sub(head) < self.capacity).then_some(tail)
    }

    /// Publishes every position below `new_tail` to the consumer.
    #[inline]
    pub fn commit_write(&self, new_tail: usize) {
        self.tail.store(new_tail, Ordering::Release);
    }

    // === Consumer side ===

    /// The consumer's own read position.
    ///
    /// Relaxed: only the consumer writes `head`.
    #[inline]
    pub fn consumer_head(&self) -> usize {
        self.head.load(Ordering::Relaxed)
    }

    /// The next readable position, if `head < tail`. Does not advance `head`.
    ///
    /// Only valid when `tail` is the publication signal (single producer).
    /// Release the slot with [`commit_read`](Self::commit_read) after moving
    /// the value out.
    #[inline]
    pub fn reserve_read(&self) -> Option<usize> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        (head != tail).then_some(head)
    }

    /// Like [`reserve_read`](Self::reserve_read) for up to `max` positions.
    ///
    /// Returns the first position and how many are readable from it.
    #[inline]
    pub fn reserve_read_many(&self, max: usize) -> (usize, usize) {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        (head, tail.wrapping_sub(head).min(max))
    }

    /// Hands every position below `new_head` back to producers.
    #[inline]
    pub fn commit_read(&self, new_head: usize) {
        self.head.store(new_head, Ordering::Release);
    }

    /// Moves both counters to `pos`, as if `pos` values had passed through.
    #[cfg(all(test, not(loom)))]
    pub fn seed_counters(&self, pos: usize) {
        self.head.store(pos, Ordering::Relaxed);
        self.tail.store(pos, Ordering::Relaxed);
    }

    // === Slot access ===

    /// Moves `value` into the slot for `pos`.
    ///
    /// # Safety
    ///
    /// `pos` must be reserved for writing by the caller, and the slot must be
    /// vacant (`pos - head < capacity` as observed with acquire).
    #[inline]
    pub unsafe fn write(&self, pos: usize, value: T) {
        self.slot(pos).with_mut(|slot| unsafe {
            (*slot).write(value);
        });
    }

    /// Moves the value out of the slot for `pos`.
    ///
    /// # Safety
    ///
    /// The slot must hold a value whose write happens-before this call, and
    /// it must be read exactly once before `head` moves past `pos`.
    #[inline]
    pub unsafe fn read(&self, pos: usize) -> T {
        self.slot(pos)
            .with(|slot| unsafe { (*slot).assume_init_read() })
    }
}

impl<T> Drop for RingBuffer<T> {
    fn drop(&mut self) {
        // Sole owner: every position in [head, tail) holds a written value.
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);

        let mut pos = head;
        while pos != tail {
            self.slot(pos)
                .with_mut(|slot| unsafe { (*slot).assume_init_drop() });
            pos = pos.wrapping_add(1);
        }
    }
}
