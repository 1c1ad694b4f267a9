//! Bounded blocking queue with timed handoff
//!
//! A small mailbox used by the buffer-release fan-out: each releaser thread
//! owns a depth-1 queue, which makes "at most one release in flight per
//! buffer index" a structural guarantee rather than a convention.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Why a [`Queue::put`] did not hand the item over
///
/// Both variants return the rejected item so the caller keeps ownership.
#[derive(Debug)]
pub enum PutError<T> {
    /// No capacity freed up within the timeout
    Full(T),
    /// The queue was closed
    Closed(T),
}

/// Why a [`Queue::get`] returned nothing
#[derive(Debug, PartialEq, Eq)]
pub enum GetError {
    /// Nothing arrived within the timeout
    Empty,
    /// The queue was closed and fully drained
    Closed,
}

struct Inner<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Bounded blocking queue
pub struct Queue<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

impl<T> Queue<T> {
    /// Create a queue holding at most `capacity` items
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "queue needs capacity of at least one");
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    /// Maximum number of queued items
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Hand an item over, waiting up to `timeout` for free capacity
    pub fn put(&self, item: T, timeout: Duration) -> Result<(), PutError<T>> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        loop {
            if inner.closed {
                return Err(PutError::Closed(item));
            }
            if inner.items.len() < self.capacity {
                inner.items.push_back(item);
                self.not_empty.notify_one();
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(PutError::Full(item));
            }
            self.not_full.wait_until(&mut inner, deadline);
        }
    }

    /// Take an item, waiting up to `timeout` for one to arrive
    ///
    /// A closed queue still drains its remaining items before reporting
    /// [`GetError::Closed`].
    pub fn get(&self, timeout: Duration) -> Result<T, GetError> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        loop {
            if let Some(item) = inner.items.pop_front() {
                self.not_full.notify_one();
                return Ok(item);
            }
            if inner.closed {
                return Err(GetError::Closed);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(GetError::Empty);
            }
            self.not_empty.wait_until(&mut inner, deadline);
        }
    }

    /// Close the queue and wake every waiter
    ///
    /// Pending items stay readable; further puts are rejected.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }
}
