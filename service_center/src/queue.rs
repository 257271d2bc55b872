//! Thread-safe FIFO queue shared between the simulation tasks
//!
//! Every operation takes the internal lock, so callers never need external
//! synchronisation. `dequeue` never blocks and signals emptiness with `None`;
//! `dequeue_timeout` parks the caller on a condition variable until an item is
//! enqueued or the timeout elapses, which lets polling loops wake on new work
//! while still re-checking their cancellation flag at a bounded interval.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Mutex-guarded FIFO with a condition variable for waiters
#[derive(Debug)]
pub struct ConcurrentFifoQueue<T> {
    items: Mutex<VecDeque<T>>,
    available: Condvar,
}

impl<T> ConcurrentFifoQueue<T> {
    pub fn new() -> Self {
        ConcurrentFifoQueue {
            items: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
        }
    }

    /// Build a queue pre-seeded with `items` in iteration order
    pub fn from_items<I: IntoIterator<Item = T>>(items: I) -> Self {
        ConcurrentFifoQueue {
            items: Mutex::new(items.into_iter().collect()),
            available: Condvar::new(),
        }
    }

    /// Append an item to the back and wake one waiter
    pub fn enqueue(&self, item: T) {
        self.items.lock().push_back(item);
        self.available.notify_one();
    }

    /// Remove and return the front item, or `None` if the queue is empty
    pub fn dequeue(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    /// Remove the front item, waiting up to `timeout` for one to arrive
    ///
    /// Returns `None` if the queue is still empty when the timeout elapses or
    /// when a waiter is released by [`wake_all`](Self::wake_all).
    pub fn dequeue_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut items = self.items.lock();
        if let Some(item) = items.pop_front() {
            return Some(item);
        }
        // A single wait: spurious and shutdown wakeups both hand control back
        // to the caller, which re-checks its running flag before retrying.
        self.available.wait_until(&mut items, deadline);
        items.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Remove every item, returning them in FIFO order
    pub fn drain(&self) -> Vec<T> {
        self.items.lock().drain(..).collect()
    }

    /// Release every thread parked in `dequeue_timeout`
    pub fn wake_all(&self) {
        self.available.notify_all();
    }
}

impl<T: Clone> ConcurrentFifoQueue<T> {
    /// Copy of the current contents in FIFO order, leaving the queue untouched
    pub fn snapshot(&self) -> Vec<T> {
        self.items.lock().iter().cloned().collect()
    }
}

impl<T> Default for ConcurrentFifoQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
