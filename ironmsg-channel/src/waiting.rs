//! Scoped counter of threads blocked in a consume call.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Increments a counter on creation and decrements it on drop.
///
/// Used by subscribers so `wait_fst` publishers can see who is waiting,
/// including across early returns.
pub(crate) struct WaitingGuard<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> WaitingGuard<'a> {
    pub(crate) fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self { counter }
    }
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}
