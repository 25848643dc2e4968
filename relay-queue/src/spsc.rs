//! Single-producer single-consumer (SPSC) bounded queue.
//!
//! Lossless: when the queue is full, [`Producer::try_push`] hands the value
//! back and leaves the queue untouched. The caller decides whether to retry,
//! yield or drop.
//!
//! # Example
//!
//! ```
//! use relay_queue::spsc;
//!
//! let (mut tx, mut rx) = spsc::channel::<u64>(4).unwrap();
//!
//! for i in 1..=4 {
//!     tx.try_push(i).unwrap();
//! }
//! assert!(tx.try_push(5).is_err());
//!
//! assert_eq!(rx.try_pop(), Some(1));
//! tx.try_push(5).unwrap();
//! ```
//!
//! # Memory Ordering
//!
//! ```text
//! Producer:                              Consumer:
//! ─────────────────────                  ─────────────────────
//! load(tail, Relaxed)   own index        load(head, Relaxed)   own index
//! load(head, Acquire)   ◄─────┐   ┌───►  load(tail, Acquire)
//! write slot[tail]            │   │      read slot[head]
//! store(tail+1, Release) ─────┼───┘      store(head+1, Release)
//!                             └──────────────────┘
//! ```
//!
//! The release on `tail` paired with the consumer's acquire makes the slot
//! write visible before the slot is seen as present. The release on `head`
//! paired with the producer's acquire makes the slot free before it's reused.
//! Each index has exactly one writer, so no read-modify-write is needed.

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;

use crate::error::{Full, Result};
use crate::ring::RingBuffer;
use crate::sync::Arc;

/// Creates an SPSC queue with exactly `capacity` slots.
///
/// # Errors
///
/// Returns [`Error::InvalidCapacity`](crate::Error::InvalidCapacity) unless
/// `capacity` is a non-zero power of two.
///
/// # Example
///
/// ```
/// use relay_queue::{spsc, Error};
///
/// assert!(matches!(
///     spsc::channel::<u64>(5),
///     Err(Error::InvalidCapacity { capacity: 5 })
/// ));
///
/// let (tx, _rx) = spsc::channel::<u64>(4096).unwrap();
/// assert_eq!(tx.capacity(), 4096);
/// ```
pub fn channel<T>(capacity: usize) -> Result<(Producer<T>, Consumer<T>)> {
    let ring = Arc::new(RingBuffer::new(capacity)?);
    tracing::debug!(capacity, "created spsc queue");

    Ok((
        Producer {
            ring: Arc::clone(&ring),
            _not_sync: PhantomData,
        },
        Consumer {
            ring,
            _not_sync: PhantomData,
        },
    ))
}

/// The push side of an SPSC queue.
///
/// `Send` but not `Sync` or `Clone`, and pushing takes `&mut self`, so there
/// is exactly one producer for the lifetime of the queue.
///
/// ```compile_fail
/// fn assert_sync<T: Sync>(_: &T) {}
/// let (tx, _rx) = relay_queue::spsc::channel::<u64>(4).unwrap();
/// assert_sync(&tx);
/// ```
pub struct Producer<T> {
    ring: Arc<RingBuffer<T>>,
    _not_sync: PhantomData<Cell<()>>,
}

impl<T> Producer<T> {
    /// Attempts to push a value.
    ///
    /// # Errors
    ///
    /// Returns `Err(Full(value))` without changing the queue if it is full.
    #[inline]
    pub fn try_push(&mut self, value: T) -> std::result::Result<(), Full<T>> {
        let Some(pos) = self.ring.reserve_write_exclusive() else {
            return Err(Full(value));
        };

        // Safety: we are the only producer and pos - head < capacity.
        unsafe { self.ring.write(pos, value) };
        self.ring.commit_write(pos.wrapping_add(1));
        Ok(())
    }

    /// Returns the capacity of the queue.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Returns the number of queued values.
    ///
    /// Note: This is a snapshot and may be immediately stale in concurrent contexts.
    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` if the queue appears empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

/// The pop side of an SPSC queue. `Send` but not `Sync`.
///
/// ```compile_fail
/// fn assert_sync<T: Sync>(_: &T) {}
/// let (_tx, rx) = relay_queue::spsc::channel::<u64>(4).unwrap();
/// assert_sync(&rx);
/// ```
pub struct Consumer<T> {
    ring: Arc<RingBuffer<T>>,
    _not_sync: PhantomData<Cell<()>>,
}

impl<T> Consumer<T> {
    /// Attempts to pop the oldest value. Returns `None` when empty.
    #[inline]
    pub fn try_pop(&mut self) -> Option<T> {
        let pos = self.ring.reserve_read()?;

        // Safety: we are the only consumer and pos < tail (acquired).
        let value = unsafe { self.ring.read(pos) };
        self.ring.commit_read(pos.wrapping_add(1));
        Some(value)
    }

    /// Pops up to `max` values into `out`, returning how many were moved.
    ///
    /// The whole batch is handed back to the producer with a single release
    /// store of `head`, instead of one per value.
    ///
    /// # Example
    ///
    /// ```
    /// use relay_queue::spsc;
    ///
    /// let (mut tx, mut rx) = spsc::channel::<u32>(8).unwrap();
    /// for i in 0..5 {
    ///     tx.try_push(i).unwrap();
    /// }
    ///
    /// let mut batch = Vec::new();
    /// assert_eq!(rx.pop_batch(&mut batch, 3), 3);
    /// assert_eq!(rx.pop_batch(&mut batch, 64), 2);
    /// assert_eq!(batch, vec![0, 1, 2, 3, 4]);
    /// ```
    pub fn pop_batch(&mut self, out: &mut Vec<T>, max: usize) -> usize {
        let (head, count) = self.ring.reserve_read_many(max);
        if count == 0 {
            return 0;
        }

        out.reserve(count);
        for i in 0..count {
            // Safety: every position in [head, head + count) is below the acquired tail.
            out.push(unsafe { self.ring.read(head.wrapping_add(i)) });
        }
        self.ring.commit_read(head.wrapping_add(count));
        count
    }

    /// Returns the capacity of the queue.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Returns the number of queued values.
    ///
    /// Note: This is a snapshot and may be immediately stale in concurrent contexts.
    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
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
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn capacity_four_scenario() {
        let (mut tx, mut rx) = channel::<u64>(4).unwrap();

        for i in 1..=4 {
            tx.try_push(i).unwrap();
        }
        assert_eq!(tx.try_push(5), Err(Full(5)));

        assert_eq!(rx.try_pop(), Some(1));
        tx.try_push(5).unwrap();

        for expected in 2..=5 {
            assert_eq!(rx.try_pop(), Some(expected));
        }
        assert_eq!(rx.len(), 0);
        assert_eq!(rx.try_pop(), None);
    }

    #[test]
    fn non_power_of_two_rejected() {
        assert!(matches!(
            channel::<u64>(5),
            Err(Error::InvalidCapacity { capacity: 5 })
        ));
        assert!(matches!(
            channel::<u64>(0),
            Err(Error::InvalidCapacity { capacity: 0 })
        ));
    }

    #[test]
    fn fill_4096_then_reject() {
        let (mut tx, rx) = channel::<u32>(4096).unwrap();

        for i in 0..4096 {
            tx.try_push(i).unwrap();
        }
        assert_eq!(tx.len(), 4096);
        assert_eq!(rx.len(), 4096);
        assert!(tx.try_push(4096).is_err());
    }

    #[test]
    fn fifo_order() {
        let (mut tx, mut rx) = channel::<u64>(16).unwrap();

        for i in 0..16 {
            tx.try_push(i).unwrap();
        }
        for i in 0..16 {
            assert_eq!(rx.try_pop(), Some(i));
        }
    }

    #[test]
    fn full_push_leaves_queue_untouched() {
        let (mut tx, mut rx) = channel::<String>(2).unwrap();

        tx.try_push("a".into()).unwrap();
        tx.try_push("b".into()).unwrap();

        let Err(Full(rejected)) = tx.try_push("c".into()) else {
            panic!("expected full");
        };
        assert_eq!(rejected, "c");
        assert_eq!(tx.len(), 2);

        assert_eq!(rx.try_pop().as_deref(), Some("a"));
        assert_eq!(rx.try_pop().as_deref(), Some("b"));
        assert_eq!(rx.try_pop(), None);
    }

    #[test]
    fn multiple_wraparounds() {
        let (mut tx, mut rx) = channel::<u64>(4).unwrap();

        for round in 0..50 {
            for i in 0..3 {
                tx.try_push(round * 10 + i).unwrap();
            }
            for i in 0..3 {
                assert_eq!(rx.try_pop(), Some(round * 10 + i));
            }
        }
        assert!(rx.is_empty());
    }

    #[test]
    fn pop_batch_respects_max_and_order() {
        let (mut tx, mut rx) = channel::<u64>(8).unwrap();
        let mut out = Vec::new();

        assert_eq!(rx.pop_batch(&mut out, 8), 0);

        for i in 0..8 {
            tx.try_push(i).unwrap();
        }
        assert_eq!(rx.pop_batch(&mut out, 5), 5);
        assert_eq!(out, vec![0, 1, 2, 3, 4]);

        // Space freed by the batch is reusable.
        for i in 8..13 {
            tx.try_push(i).unwrap();
        }
        out.clear();
        assert_eq!(rx.pop_batch(&mut out, usize::MAX), 8);
        assert_eq!(out, (5..13).collect::<Vec<_>>());
        assert!(rx.is_empty());
    }

    #[test]
    fn drop_releases_queued_values() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let drop_count = std::sync::Arc::new(AtomicUsize::new(0));

        #[derive(Debug)]
        struct DropCounter(std::sync::Arc<AtomicUsize>);
        impl Drop for DropCounter {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let (mut tx, mut rx) = channel::<DropCounter>(8).unwrap();
        for _ in 0..3 {
            tx.try_push(DropCounter(std::sync::Arc::clone(&drop_count)))
                .unwrap();
        }

        drop(rx.try_pop());
        assert_eq!(drop_count.load(Ordering::SeqCst), 1);

        drop(tx);
        assert_eq!(drop_count.load(Ordering::SeqCst), 1);
        drop(rx);
        assert_eq!(drop_count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn handles_are_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Producer<String>>();
        assert_send::<Consumer<String>>();
        assert_send::<crate::mpsc::Producer<String>>();
        assert_send::<crate::mpsc::Consumer<String>>();
    }

    #[test]
    fn cross_thread_fifo() {
        use std::thread;

        const COUNT: u64 = 100_000;

        let (mut tx, mut rx) = channel::<u64>(64).unwrap();

        let producer = thread::spawn(move || {
            for i in 0..COUNT {
                let mut value = i;
                while let Err(Full(v)) = tx.try_push(value) {
                    value = v;
                    std::hint::spin_loop();
                }
            }
        });

        let mut expected = 0;
        while expected < COUNT {
            if let Some(v) = rx.try_pop() {
                assert_eq!(v, expected);
                expected += 1;
            } else {
                std::hint::spin_loop();
            }
        }

        producer.join().unwrap();
        assert_eq!(rx.try_pop(), None);
    }
}
