//! Closable queue releasing items at their due time.
//!
//! Items come out earliest-deadline first; items sharing a deadline come out
//! in insertion order.

use crate::error::DelayError;
use parking_lot::{Condvar, Mutex};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

struct Entry<T> {
    due: Instant,
    seq: u64,
    value: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

struct DelayState<T> {
    heap: BinaryHeap<Reverse<Entry<T>>>,
    next_seq: u64,
    closed: bool,
}

impl<T> DelayState<T> {
    fn next_due(&self) -> Option<Instant> {
        self.heap.peek().map(|Reverse(entry)| entry.due)
    }

    fn pop_due(&mut self, now: Instant) -> Option<T> {
        if self.next_due()? > now {
            return None;
        }
        self.heap.pop().map(|Reverse(entry)| entry.value)
    }
}

/// Thread-safe queue whose items become available at a given instant.
pub struct DelayQueue<T> {
    state: Mutex<DelayState<T>>,
    ready: Condvar,
}

impl<T> DelayQueue<T> {
    /// Creates an empty, open queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DelayState {
                heap: BinaryHeap::new(),
                next_seq: 0,
                closed: false,
            }),
            ready: Condvar::new(),
        }
    }

    /// Schedules `value` to become available at `due`.
    ///
    /// # Errors
    /// Returns [`DelayError::Closed`] if the queue has been closed.
    pub fn push(&self, value: T, due: Instant) -> Result<(), DelayError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(DelayError::Closed);
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.heap.push(Reverse(Entry { due, seq, value }));
        // The new item may be due before whatever the waiters sleep on.
        self.ready.notify_all();
        Ok(())
    }

    /// Blocks until the earliest item is due and returns it.
    ///
    /// # Errors
    /// Returns [`DelayError::Closed`] once the queue is closed, even if items remain.
    pub fn pop(&self) -> Result<T, DelayError> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(DelayError::Closed);
            }
            if let Some(value) = state.pop_due(Instant::now()) {
                return Ok(value);
            }
            match state.next_due() {
                Some(due) => {
                    self.ready.wait_until(&mut state, due);
                }
                None => self.ready.wait(&mut state),
            }
        }
    }

    /// Like [`DelayQueue::pop`], returning `Ok(None)` if nothing became due
    /// within `timeout`.
    ///
    /// # Errors
    /// Returns [`DelayError::Closed`] once the queue is closed.
    pub fn pop_timeout(&self, timeout: Duration) -> Result<Option<T>, DelayError> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.pop().map(Some);
        };
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(DelayError::Closed);
            }
            let now = Instant::now();
            if let Some(value) = state.pop_due(now) {
                return Ok(Some(value));
            }
            if now >= deadline {
                return Ok(None);
            }
            let wake = state.next_due().map_or(deadline, |due| due.min(deadline));
            self.ready.wait_until(&mut state, wake);
        }
    }

    /// Closes the queue and wakes every waiter. Idempotent.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if !state.closed {
            state.closed = true;
            state.heap.clear();
            tracing::debug!("[Delay] queue closed");
        }
        self.ready.notify_all();
    }

    /// Returns true if the queue has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Returns the number of scheduled items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().heap.len()
    }

    /// Returns true if nothing is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().heap.is_empty()
    }
}

impl<T> Default for DelayQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_earliest_first() {
        let queue = DelayQueue::new();
        let base = Instant::now();
        queue.push("2", base + Duration::from_millis(20)).unwrap();
        queue.push("1", base + Duration::from_millis(10)).unwrap();
        queue.push("3", base + Duration::from_millis(30)).unwrap();

        assert_eq!(queue.pop().unwrap(), "1");
        assert_eq!(queue.pop().unwrap(), "2");
        assert_eq!(queue.pop().unwrap(), "3");
        assert!(Instant::now() >= base + Duration::from_millis(30));
    }

    #[test]
    fn test_same_deadline_keeps_insertion_order() {
        let queue = DelayQueue::new();
        let base = Instant::now();
        for i in 0..5 {
            queue.push(i, base).unwrap();
        }
        let items: Vec<_> = (0..5).map(|_| queue.pop().unwrap()).collect();
        assert_eq!(items, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_pop_timeout() {
        let queue = DelayQueue::new();
        queue
            .push(1, Instant::now() + Duration::from_secs(60))
            .unwrap();
        assert_eq!(queue.pop_timeout(Duration::from_millis(10)).unwrap(), None);
        assert_eq!(queue.len(), 1);

        queue.push(2, Instant::now()).unwrap();
        assert_eq!(queue.pop_timeout(Duration::from_millis(10)).unwrap(), Some(2));
    }

    #[test]
    fn test_close_rejects_push() {
        let queue = DelayQueue::new();
        queue.push(1, Instant::now()).unwrap();
        queue.close();
        queue.close();
        assert!(queue.is_closed());
        assert!(queue.is_empty());
        assert_eq!(queue.push(2, Instant::now()), Err(DelayError::Closed));
        assert_eq!(queue.pop(), Err(DelayError::Closed));
    }

    #[test]
    fn test_close_wakes_waiter() {
        let queue = Arc::new(DelayQueue::<u32>::new());
        let waiter = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        };
        thread::sleep(Duration::from_millis(20));
        queue.close();
        assert_eq!(waiter.join().unwrap(), Err(DelayError::Closed));
    }

    #[test]
    fn test_earlier_push_wakes_sleeper() {
        let queue = Arc::new(DelayQueue::new());
        queue
            .push("late", Instant::now() + Duration::from_secs(60))
            .unwrap();
        let waiter = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        };
        thread::sleep(Duration::from_millis(20));
        queue.push("early", Instant::now()).unwrap();
        assert_eq!(waiter.join().unwrap().unwrap(), "early");
    }
}
