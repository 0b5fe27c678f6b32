//! # Locked FIFO backlog for one consumer.
//!
//! A [`Buffer`] holds items already pulled from a shared source on behalf of one
//! handle but not yet delivered to it. Two call paths touch it: the coordinator
//! pushes, the handle's owner pops. Every method takes the lock.
//!
//! ## Rules
//! - Once closed, pushes are rejected and pops return `None`.
//! - `close()` is idempotent and drops whatever was still queued.
//! - Dropped items are released **after** the lock is let go, so an item whose
//!   `Drop` touches another buffer cannot deadlock.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

struct State<T> {
    queue: VecDeque<T>,
    closed: bool,
}

/// Mutex-protected queue plus a closed flag.
pub struct Buffer<T> {
    state: Mutex<State<T>>,
}

impl<T> Buffer<T> {
    /// Creates an empty, open buffer.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty, open buffer with room for `capacity` items.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(State {
                queue: VecDeque::with_capacity(capacity),
                closed: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an item. Returns `false` (and drops the item) if closed.
    pub fn push(&self, item: T) -> bool {
        let mut state = self.lock();
        if state.closed {
            drop(state);
            return false;
        }
        state.queue.push_back(item);
        true
    }

    /// Puts an item back at the head. Returns `false` (and drops the item) if closed.
    pub fn requeue(&self, item: T) -> bool {
        let mut state = self.lock();
        if state.closed {
            drop(state);
            return false;
        }
        state.queue.push_front(item);
        true
    }

    /// Removes and returns the head item.
    pub fn pop(&self) -> Option<T> {
        self.lock().queue.pop_front()
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Returns true once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Marks the buffer closed and discards queued items.
    pub fn close(&self) {
        let dropped = {
            let mut state = self.lock();
            state.closed = true;
            std::mem::take(&mut state.queue)
        };
        drop(dropped);
    }
}

impl<T> Default for Buffer<T> {
    fn default() -> Self {
        Self::new()
    }
}
