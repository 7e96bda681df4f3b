//! Bounded FIFO with drop-oldest eviction.

use std::collections::VecDeque;

/// FIFO buffer that evicts its oldest entries to admit new ones.
///
/// A capacity of 0 disables eviction.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    buffer: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Creates an empty queue.
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of items kept, 0 for unbounded
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    /// Appends an item, evicting from the front while the queue is full.
    ///
    /// # Returns
    /// The number of evicted items.
    pub fn push(&mut self, item: T) -> usize {
        let mut evicted = 0;
        if self.capacity > 0 {
            while self.buffer.len() >= self.capacity {
                self.buffer.pop_front();
                evicted += 1;
            }
        }
        self.buffer.push_back(item);
        evicted
    }

    /// Removes and returns the oldest item.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        self.buffer.pop_front()
    }

    /// Returns the capacity (0 = unbounded).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    /// Returns the number of buffered items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
