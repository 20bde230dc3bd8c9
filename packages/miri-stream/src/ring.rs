// Slot ring shared between the transport callback and the reader
//
// The producer copies each burst into slot `tail`; the consumer hands out
// slot `head` and gives it back with `release`. Index, count and flag
// transitions happen under `lock`, and so does the producer's copy into the
// free slot. The only unlocked access is the consumer reading the slot on
// loan, which stays counted (out of the producer's reach) until its
// `SlotHandle` is released.

use crate::config::BYTES_PER_SAMPLE;
use crate::error::{StreamError, StreamResult};
use crate::types::Outcome;
use parking_lot::{Condvar, Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

static NEXT_RING_ID: AtomicU64 = AtomicU64::new(0);

/// Exclusive token for a slot on loan to the consumer.
///
/// Not `Clone`: releasing consumes it, and the ring refuses to hand out a
/// second one while this one is alive.
#[derive(Debug, PartialEq, Eq)]
pub struct SlotHandle {
    ring: u64,
    index: usize,
}

impl SlotHandle {
    /// Index of the slot inside the ring.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// A slot handed out by [`RingBuffer::acquire`].
#[derive(Debug)]
pub struct Acquired {
    pub handle: SlotHandle,
    /// Number of interleaved I/Q pairs held by the slot.
    pub elements: usize,
}

/// Counters for ring activity
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RingMetrics {
    pub bursts_produced: u64,
    pub bursts_dropped: u64,
    pub overflow_events: u64,
    pub bytes_produced: u64,
    pub current_size: usize,
    pub peak_size: usize,
    pub capacity: usize,
}

/// Fixed-size ring of byte slots with overflow and reset handling.
pub struct RingBuffer {
    id: u64,
    slots: Box<[UnsafeCell<Vec<u8>>]>,
    slot_capacity: usize,

    // Next slot to hand out.
    head: AtomicUsize,
    // Next slot to fill.
    tail: AtomicUsize,
    // Produced but not yet released.
    count: AtomicUsize,

    overflow: AtomicBool,
    reset: AtomicBool,
    in_flight: AtomicBool,
    interrupted: AtomicBool,

    lock: Mutex<()>,
    available: Condvar,

    bursts_produced: AtomicU64,
    bursts_dropped: AtomicU64,
    overflow_events: AtomicU64,
    bytes_produced: AtomicU64,
    peak_size: AtomicUsize,
}

// SAFETY: slot contents are written only under `lock`, and only for slot
// `tail` while it is uncounted. A slot is read without the lock only through
// a `SlotHandle` issued by this ring. At most one exists at a time
// (`in_flight` is checked and set under `lock`), its slot stays counted
// until `release` consumes the handle, and `data` ties the returned slice to
// that handle.
unsafe impl Sync for RingBuffer {}

impl RingBuffer {
    /// Allocate `num_slots` slots of `slot_capacity` bytes each.
    pub fn new(num_slots: usize, slot_capacity: usize) -> StreamResult<Self> {
        if num_slots == 0 {
            return Err(StreamError::EmptyRing);
        }

        let slots = (0..num_slots)
            .map(|_| UnsafeCell::new(vec![0u8; slot_capacity]))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            id: NEXT_RING_ID.fetch_add(1, Ordering::Relaxed),
            slots,
            slot_capacity,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            count: AtomicUsize::new(0),
            overflow: AtomicBool::new(false),
            reset: AtomicBool::new(false),
            in_flight: AtomicBool::new(false),
            interrupted: AtomicBool::new(false),
            lock: Mutex::new(()),
            available: Condvar::new(),
            bursts_produced: AtomicU64::new(0),
            bursts_dropped: AtomicU64::new(0),
            overflow_events: AtomicU64::new(0),
            bytes_produced: AtomicU64::new(0),
            peak_size: AtomicUsize::new(0),
        })
    }

    /// Copy one burst into the next free slot (producer side).
    ///
    /// Never waits for space. Returns `false` if the ring was full, in which
    /// case the whole burst is dropped and the overflow flag is raised.
    pub fn produce(&self, data: &[u8]) -> bool {
        let capacity = self.slots.len();

        let guard = self.lock.lock();
        if self.count.load(Ordering::Acquire) == capacity {
            self.overflow.store(true, Ordering::Release);
            self.bursts_dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let tail = self.tail.load(Ordering::Relaxed);

        // SAFETY: `lock` is held and `tail` is uncounted (count < capacity),
        // so no handle refers to it and no other producer is writing it.
        let slot = unsafe { &mut *self.slots[tail].get() };
        slot.clear();
        slot.extend_from_slice(data);

        self.tail.store((tail + 1) % capacity, Ordering::Relaxed);
        let filled = self.count.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak_size.fetch_max(filled, Ordering::Relaxed);
        drop(guard);
        self.available.notify_one();

        self.bursts_produced.fetch_add(1, Ordering::Relaxed);
        self.bytes_produced
            .fetch_add(data.len() as u64, Ordering::Relaxed);
        log::trace!("Produced burst of {} bytes into slot {}", data.len(), tail);
        true
    }

    /// Take the oldest filled slot (consumer side).
    ///
    /// A pending reset silently discards everything queued. A pending
    /// overflow discards everything queued and is reported once. Otherwise
    /// waits up to `timeout` for the producer.
    pub fn acquire(&self, timeout: Duration) -> StreamResult<Outcome<Acquired>> {
        let mut guard = self.lock.lock();

        if self.in_flight.load(Ordering::Acquire) {
            return Err(StreamError::HandleOutstanding);
        }

        if self.reset.swap(false, Ordering::AcqRel) {
            self.drain_locked(&guard);
            self.overflow.store(false, Ordering::Release);
        }

        if self.overflow.swap(false, Ordering::AcqRel) {
            self.drain_locked(&guard);
            self.overflow_events.fetch_add(1, Ordering::Relaxed);
            drop(guard);
            log::warn!("Ring overflow: consumer fell behind, queued bursts discarded");
            return Ok(Outcome::Overflow);
        }

        if self.count.load(Ordering::Acquire) == 0 {
            let deadline = Instant::now().checked_add(timeout);
            while self.count.load(Ordering::Acquire) == 0
                && !self.interrupted.load(Ordering::Acquire)
            {
                match deadline {
                    Some(deadline) => {
                        if self.available.wait_until(&mut guard, deadline).timed_out() {
                            break;
                        }
                    }
                    None => self.available.wait(&mut guard),
                }
            }
            if self.count.load(Ordering::Acquire) == 0 {
                return Ok(Outcome::Timeout);
            }
            // The lock was released while waiting; another caller may have
            // taken the slot in the meantime.
            if self.in_flight.load(Ordering::Acquire) {
                return Err(StreamError::HandleOutstanding);
            }
        }

        let index = self.head.load(Ordering::Relaxed);
        self.head
            .store((index + 1) % self.slots.len(), Ordering::Relaxed);
        self.in_flight.store(true, Ordering::Release);

        // SAFETY: `lock` is held and `index` is counted, so the producer is
        // not writing it.
        let bytes = unsafe { (*self.slots[index].get()).len() };
        drop(guard);

        Ok(Outcome::Ready(Acquired {
            handle: SlotHandle {
                ring: self.id,
                index,
            },
            elements: bytes / BYTES_PER_SAMPLE / 2,
        }))
    }

    /// Give a slot back to the producer.
    ///
    /// A handle issued by another ring is ignored.
    pub fn release(&self, handle: SlotHandle) {
        if handle.ring != self.id {
            log::warn!("Ignoring release of a slot handle from another ring");
            return;
        }

        let _guard = self.lock.lock();
        debug_assert!(self.in_flight.load(Ordering::Acquire));
        self.in_flight.store(false, Ordering::Release);
        let previous = self.count.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "release with no filled slot");
    }

    /// Raw bytes of the slot on loan.
    ///
    /// The slice borrows the handle, so the handle cannot be released while
    /// the slice is alive:
    ///
    /// ```compile_fail
    /// use miri_stream::{Outcome, RingBuffer};
    /// use std::time::Duration;
    ///
    /// let ring = RingBuffer::new(1, 8).unwrap();
    /// ring.produce(&[1; 4]);
    /// if let Ok(Outcome::Ready(acquired)) = ring.acquire(Duration::ZERO) {
    ///     let view = ring.data(&acquired.handle);
    ///     ring.release(acquired.handle);
    ///     assert_eq!(view, &[1; 4]);
    /// }
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `handle` was issued by a different ring.
    pub fn data<'a>(&'a self, handle: &'a SlotHandle) -> &'a [u8] {
        assert_eq!(
            handle.ring, self.id,
            "slot handle used with a different ring"
        );
        // SAFETY: the handle is this ring's only outstanding loan. Its slot
        // stays counted, and so unwritten, until `release` consumes the
        // handle, which the returned borrow rules out.
        unsafe { (*self.slots[handle.index].get()).as_slice() }
    }

    /// O(1) flush: jump `head` past everything filled.
    fn drain_locked(&self, _guard: &MutexGuard<'_, ()>) {
        let drained = self.count.swap(0, Ordering::AcqRel);
        let head = self.head.load(Ordering::Relaxed);
        self.head
            .store((head + drained) % self.slots.len(), Ordering::Relaxed);
        if drained > 0 {
            log::debug!("Drained {} queued slots", drained);
        }
    }

    /// Discard queued data on the next acquire.
    pub fn request_reset(&self) {
        self.reset.store(true, Ordering::Release);
    }

    pub fn is_reset_pending(&self) -> bool {
        self.reset.load(Ordering::Acquire)
    }

    pub fn is_overflowed(&self) -> bool {
        self.overflow.load(Ordering::Acquire)
    }

    /// Wake a blocked acquire and keep later ones from waiting while the
    /// ring is empty.
    pub fn interrupt(&self) {
        {
            let _guard = self.lock.lock();
            self.interrupted.store(true, Ordering::Release);
        }
        self.available.notify_all();
    }

    /// Undo [`interrupt`](Self::interrupt).
    pub fn resume(&self) {
        let _guard = self.lock.lock();
        self.interrupted.store(false, Ordering::Release);
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::Acquire)
    }

    /// Whether a slot is currently on loan.
    pub fn has_outstanding(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Number of produced, unreleased slots.
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn slot_capacity(&self) -> usize {
        self.slot_capacity
    }

    pub fn metrics(&self) -> RingMetrics {
        RingMetrics {
            bursts_produced: self.bursts_produced.load(Ordering::Relaxed),
            bursts_dropped: self.bursts_dropped.load(Ordering::Relaxed),
            overflow_events: self.overflow_events.load(Ordering::Relaxed),
            bytes_produced: self.bytes_produced.load(Ordering::Relaxed),
            current_size: self.len(),
            peak_size: self.peak_size.load(Ordering::Relaxed),
            capacity: self.capacity(),
        }
    }
}
