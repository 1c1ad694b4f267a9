//! Bounded SPSC slot ring with producer/consumer leases
//!
//! The ring preallocates its slots and hands out RAII leases instead of
//! moving items: a producer acquires the next free slot, fills it in place
//! and releases it for the consumer, which reads in place and frees it.
//! This is the HTTP JPEG ring — overflow is the producer's problem (the
//! stream loop drops frames when the consumer lags), never the consumer's.
//!
//! Slot protocol: `FREE → WRITING → READY → READING → FREE`, advanced
//! strictly in slot order on both sides. At most one producer and one
//! consumer lease exist per slot at any instant.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};

const FREE: u8 = 0;
const WRITING: u8 = 1;
const READY: u8 = 2;
const READING: u8 = 3;

/// Internal wait granularity while a slot is contended
const SPIN_SLEEP: Duration = Duration::from_micros(200);

struct Slot<T> {
    state: AtomicU8,
    item: Mutex<T>,
}

/// Bounded single-producer single-consumer slot ring
pub struct Ring<T> {
    slots: Box<[Slot<T>]>,
    write: AtomicUsize,
    read: AtomicUsize,
}

impl<T> Ring<T> {
    /// Create a ring with `n` slots, each initialized by `init`
    pub fn with_slots(n: usize, mut init: impl FnMut() -> T) -> Self {
        assert!(n > 0, "ring needs at least one slot");
        let slots = (0..n)
            .map(|_| Slot {
                state: AtomicU8::new(FREE),
                item: Mutex::new(init()),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            slots,
            write: AtomicUsize::new(0),
            read: AtomicUsize::new(0),
        }
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always false; rings are fixed-size
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Acquire the next slot for writing
    ///
    /// Returns `None` when no slot frees up within `timeout` (ring full).
    /// A zero timeout checks exactly once. The lease publishes the slot to
    /// the consumer on drop.
    pub fn producer_acquire(&self, timeout: Duration) -> Option<ProducerLease<'_, T>> {
        let index = self.acquire(&self.write, FREE, WRITING, timeout)?;
        Some(ProducerLease {
            ring: self,
            index,
            guard: Some(self.slots[index].item.lock()),
        })
    }

    /// Acquire the next readable slot
    ///
    /// Returns `None` when nothing becomes readable within `timeout`.
    /// The lease frees the slot on drop.
    pub fn consumer_acquire(&self, timeout: Duration) -> Option<ConsumerLease<'_, T>> {
        let index = self.acquire(&self.read, READY, READING, timeout)?;
        Some(ConsumerLease {
            ring: self,
            index,
            guard: Some(self.slots[index].item.lock()),
        })
    }

    fn acquire(&self, cursor: &AtomicUsize, from: u8, to: u8, timeout: Duration) -> Option<usize> {
        let deadline = Instant::now() + timeout;
        loop {
            let index = cursor.load(Ordering::Acquire);
            if self.slots[index]
                .state
                .compare_exchange(from, to, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                cursor.store((index + 1) % self.slots.len(), Ordering::Release);
                return Some(index);
            }
            if Instant::now() >= deadline {
                return None;
            }
            std::thread::sleep(SPIN_SLEEP);
        }
    }

    fn release(&self, index: usize, to: u8) {
        self.slots[index].state.store(to, Ordering::Release);
    }
}

/// Write lease over a ring slot
///
/// Dereferences to the slot contents; dropping the lease marks the slot
/// ready for the consumer.
pub struct ProducerLease<'a, T> {
    ring: &'a Ring<T>,
    index: usize,
    guard: Option<MutexGuard<'a, T>>,
}

impl<T> ProducerLease<'_, T> {
    /// Slot index of this lease
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<T> Deref for ProducerLease<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.guard.as_ref().expect("lease guard present")
    }
}

impl<T> DerefMut for ProducerLease<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.guard.as_mut().expect("lease guard present")
    }
}

impl<T> Drop for ProducerLease<'_, T> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.ring.release(self.index, READY);
    }
}

/// Read lease over a ring slot
///
/// Dereferences to the slot contents; dropping the lease frees the slot
/// for the producer.
pub struct ConsumerLease<'a, T> {
    ring: &'a Ring<T>,
    index: usize,
    guard: Option<MutexGuard<'a, T>>,
}

impl<T> ConsumerLease<'_, T> {
    /// Slot index of this lease
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<T> Deref for ConsumerLease<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.guard.as_ref().expect("lease guard present")
    }
}

impl<T> Drop for ConsumerLease<'_, T> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.ring.release(self.index, FREE);
    }
}
