//! Multi-producer single-consumer (MPSC) bounded queue that drops on overflow.
//!
//! Any number of producers push concurrently; one consumer pops. When the
//! queue is full, [`Producer::push_or_drop`] discards the value, bumps a drop
//! counter and returns. Producers never block and never wait on the consumer.
//!
//! # Overflow Policy
//!
//! Memory is bounded and producer rate is not. Under sustained overload the
//! queue trades completeness for producer throughput: values that don't fit
//! are lost and counted in [`drop_count`](Producer::drop_count). This suits
//! telemetry-like data. It does not suit data that must be delivered; use
//! [`Producer::try_push`] and retry, or the [`spsc`](crate::spsc) queue, for that.
//!
//! # Example
//!
//! ```
//! use relay_queue::mpsc;
//! use std::thread;
//!
//! let (tx, mut rx) = mpsc::channel::<u64>(4).unwrap();
//!
//! let handles: Vec<_> = (0..2)
//!     .map(|p| {
//!         let tx = tx.clone();
//!         thread::spawn(move || {
//!             for i in 0..10 {
//!                 tx.push_or_drop(p * 100 + i);
//!             }
//!         })
//!     })
//!     .collect();
//! for h in handles {
//!     h.join().unwrap();
//! }
//!
//! // Nobody popped: 4 values fit, the other 16 were dropped.
//! let mut received = 0;
//! while rx.try_pop().is_some() {
//!     received += 1;
//! }
//! assert_eq!(received, 4);
//! assert_eq!(rx.drop_count(), 16);
//! ```
//!
//! # Slot Claiming
//!
//! Unlike SPSC, producers race for `tail`, so a slot is claimed with a
//! compare-and-swap on `tail`. A separate load-then-store of `tail` would
//! let two producers claim the same slot and lose one of the updates.
//!
//! A claimed `tail` is advanced before the value is written, so `tail` can't
//! tell the consumer a slot is ready. Each slot carries a stamp instead:
//!
//! ```text
//! Producer:                              Consumer:
//! ─────────────────────                  ─────────────────────
//! load(head, Acquire)                    load(head, Relaxed)
//! CAS(tail, pos → pos+1)                 load(stamp[head], Acquire)
//! write slot[pos]                          == head+1 ? else empty
//! store(stamp[pos], pos+1, Release) ───► read slot[head]
//!                                        store(head+1, Release)
//! ```
//!
//! Values from one producer keep their relative order. Across producers the
//! order is whatever order the claims were won in.

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;

use crossbeam_utils::CachePadded;

use crate::error::{Full, Result};
use crate::ring::RingBuffer;
use crate::sync::{Arc, AtomicU64, AtomicUsize, Ordering};

/// Creates an MPSC drop queue with exactly `capacity` slots.
///
/// # Errors
///
/// Returns [`Error::InvalidCapacity`](crate::Error::InvalidCapacity) unless
/// `capacity` is a non-zero power of two.
pub fn channel<T>(capacity: usize) -> Result<(Producer<T>, Consumer<T>)> {
    let ring = RingBuffer::new(capacity)?;
    let stamps = (0..capacity).map(|_| AtomicUsize::new(0)).collect();

    let shared = Arc::new(Shared {
        ring,
        stamps,
        drop_count: CachePadded::new(AtomicU64::new(0)),
    });
    tracing::debug!(capacity, "created mpsc drop queue");

    Ok((
        Producer {
            shared: Arc::clone(&shared),
        },
        Consumer {
            shared,
            _not_sync: PhantomData,
        },
    ))
}

struct Shared<T> {
    ring: RingBuffer<T>,
    /// `stamps[pos & mask] == pos + 1` once the value at `pos` is written.
    stamps: Box<[AtomicUsize]>,
    drop_count: CachePadded<AtomicU64>,
}

impl<T> Shared<T> {
    #[inline(always)]
    fn stamp(&self, pos: usize) -> &AtomicUsize {
        // Safety: pos & (capacity - 1) < capacity == stamps.len()
        unsafe { self.stamps.get_unchecked(pos & (self.ring.capacity() - 1)) }
    }

    #[inline]
    fn is_ready(&self, pos: usize) -> bool {
        self.stamp(pos).load(Ordering::Acquire) == pos.wrapping_add(1)
    }

    #[inline]
    fn drop_count(&self) -> u64 {
        self.drop_count.load(Ordering::Relaxed)
    }
}

/// The push side of an MPSC drop queue.
///
/// Clone it to add producers; all clones share the same queue.
pub struct Producer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Producer<T> {
    /// Pushes `value`, or drops it and counts the drop if the queue is full.
    ///
    /// Returns `true` if the value was enqueued, `false` if it was dropped.
    /// A drop is the documented overload behavior, not an error.
    #[inline]
    pub fn push_or_drop(&self, value: T) -> bool {
        if let Err(Full(dropped)) = self.try_push(value) {
            // Statistic only, never used for flow control.
            self.shared.drop_count.fetch_add(1, Ordering::Relaxed);
            drop(dropped);
            return false;
        }
        true
    }

    /// Attempts to push a value without counting a drop on failure.
    ///
    /// # Errors
    ///
    /// Returns `Err(Full(value))` if the queue is full.
    #[inline]
    pub fn try_push(&self, value: T) -> std::result::Result<(), Full<T>> {
        let Some(pos) = self.shared.ring.reserve_write() else {
            return Err(Full(value));
        };

        // Safety: the CAS gave us pos exclusively and pos - head < capacity.
        unsafe { self.shared.ring.write(pos, value) };
        self.shared
            .stamp(pos)
            .store(pos.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    /// Returns the number of values dropped so far. Advisory.
    #[inline]
    pub fn drop_count(&self) -> u64 {
        self.shared.drop_count()
    }

    /// Returns the capacity of the queue.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.ring.capacity()
    }

    /// Returns the number of claimed slots, including ones still being written.
    ///
    /// Note: This is a snapshot and may be immediately stale in concurrent contexts.
    #[inline]
    pub fn len(&self) -> usize {
        self.shared.ring.len()
    }

    /// Returns `true` if the queue appears empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Clone for Producer<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("capacity", &self.capacity())
            .field("drop_count", &self.drop_count())
            .finish_non_exhaustive()
    }
}

/// The pop side of an MPSC drop queue. There is only one: `Send`, but not
/// `Sync` or `Clone`.
///
/// ```compile_fail
/// fn assert_sync<T: Sync>(_: &T) {}
/// let (_tx, rx) = relay_queue::mpsc::channel::<u64>(4).unwrap();
/// assert_sync(&rx);
/// ```
pub struct Consumer<T> {
    shared: Arc<Shared<T>>,
    _not_sync: PhantomData<Cell<()>>,
}

impl<T> Consumer<T> {
    /// Attempts to pop the oldest published value.
    ///
    /// Returns `None` when the queue is empty, and also when the next slot is
    /// claimed but its producer hasn't finished writing it yet.
    #[inline]
    pub fn try_pop(&mut self) -> Option<T> {
        let ring = &self.shared.ring;
        let head = ring.consumer_head();

        if !self.shared.is_ready(head) {
            return None;
        }

        // Safety: the acquired stamp shows the write to this slot completed.
        let value = unsafe { ring.read(head) };
        ring.commit_read(head.wrapping_add(1));
        Some(value)
    }

    /// Pops up to `max` consecutive published values into `out`.
    ///
    /// Stops early at the first slot that isn't ready. `head` is released once
    /// for the whole batch.
    pub fn pop_batch(&mut self, out: &mut Vec<T>, max: usize) -> usize {
        let ring = &self.shared.ring;
        let head = ring.consumer_head();

        out.reserve(max.min(ring.capacity()));

        let mut count = 0;
        while count < max && self.shared.is_ready(head.wrapping_add(count)) {
            // Safety: as in try_pop, per slot.
            out.push(unsafe { ring.read(head.wrapping_add(count)) });
            count += 1;
        }

        if count > 0 {
            ring.commit_read(head.wrapping_add(count));
        }
        count
    }

    /// Returns the number of values dropped so far. Advisory.
    #[inline]
    pub fn drop_count(&self) -> u64 {
        self.shared.drop_count()
    }

    /// Returns the capacity of the queue.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.ring.capacity()
    }

    /// Returns the number of claimed slots, including ones still being written.
    ///
    /// Note: This is a snapshot and may be immediately stale in concurrent contexts.
    #[inline]
    pub fn len(&self) -> usize {
        self.shared.ring.len()
    }

    /// Returns `true` if the queue appears empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("capacity", &self.capacity())
            .field("drop_count", &self.drop_count())
            .finish_non_exhaustive()
    }
}
