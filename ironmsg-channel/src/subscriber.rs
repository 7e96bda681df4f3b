//! Subscribing side of a channel.
//!
//! A subscriber buffers the messages routed to it in a [`BoundedQueue`] and
//! hands them out through blocking or deadline-bounded consume calls.
//!
//! Locking: the subscriber state lock is the outermost channel lock. While
//! holding it a thread may take the publisher state lock or the registry
//! lock, never the other way around. The back-reference to the publisher
//! sits behind its own leaf lock so the registry can repoint it.

use crate::error::{MsgError, Result};
use crate::publisher::{Adoption, PublisherCore};
use crate::queue::BoundedQueue;
use crate::registry::Registry;
use crate::waiting::WaitingGuard;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

/// Subscribing endpoint of a channel.
///
/// Dropping a subscriber breaks the whole channel: its publisher and every
/// sibling subscriber are poisoned too.
pub struct Subscriber<T> {
    core: Arc<SubscriberCore<T>>,
}

pub(crate) struct SubscriberCore<T> {
    registry: Registry<T>,
    state: Mutex<SubscriberState<T>>,
    ready: Condvar,
    publisher: Mutex<Option<Weak<PublisherCore<T>>>>,
    waiting: AtomicUsize,
    /// Only written while `state` is locked, so waiters never miss it.
    broken: AtomicBool,
}

struct SubscriberState<T> {
    name: Option<String>,
    queue: BoundedQueue<T>,
}

impl<T> SubscriberCore<T> {
    pub(crate) fn is_broken(&self) -> bool {
        self.broken.load(Ordering::Acquire)
    }

    pub(crate) fn waiting(&self) -> usize {
        self.waiting.load(Ordering::Acquire)
    }

    pub(crate) fn link_to(&self, publisher: Weak<PublisherCore<T>>) {
        *self.publisher.lock() = Some(publisher);
    }

    fn is_linked(&self) -> bool {
        self.publisher.lock().is_some()
    }

    fn publisher(&self) -> Option<Arc<PublisherCore<T>>> {
        self.publisher.lock().as_ref().and_then(Weak::upgrade)
    }

    /// Queues a message routed here by the publisher.
    pub(crate) fn deliver(&self, value: T) {
        let mut state = self.state.lock();
        if self.is_broken() {
            return;
        }
        let evicted = state.queue.push(value);
        if evicted > 0 {
            tracing::trace!(
                "[Sub] channel \"{}\" dropped {} oldest message(s)",
                state.name.as_deref().unwrap_or(""),
                evicted
            );
        }
        self.ready.notify_one();
    }

    /// Breaks this subscriber and, through its publisher, the whole channel.
    /// Idempotent.
    pub(crate) fn break_channel(&self) {
        if self.is_broken() {
            return;
        }
        let name = {
            let state = self.state.lock();
            if self.broken.swap(true, Ordering::AcqRel) {
                return;
            }
            self.ready.notify_all();
            state.name.clone()
        };

        if let Some(name) = &name {
            if !self.is_linked() {
                self.registry.withdraw(name, self);
            }
            tracing::debug!("[Sub] channel \"{}\" broken", name);
        }
        // Re-read the link: a publisher may have inherited this subscriber
        // while it was being withdrawn.
        if let Some(publisher) = self.publisher() {
            publisher.break_channel();
        }
    }

    fn check_registered<'a>(&self, state: &'a SubscriberState<T>) -> Result<&'a str> {
        state.name.as_deref().ok_or_else(|| {
            MsgError::bad_use("[Sub] this subscriber is not registered yet")
        })
    }

    fn check_attached(&self, state: &SubscriberState<T>) -> Result<()> {
        let name = self.check_registered(state)?;
        if !self.is_linked() {
            return Err(MsgError::bad_use(format!(
                "[Sub] channel \"{name}\" has no publisher"
            )));
        }
        Ok(())
    }

    /// Takes the oldest message, or reports a broken channel.
    fn take(&self, state: &mut SubscriberState<T>) -> Option<Result<T>> {
        if let Some(value) = state.queue.pop() {
            return Some(Ok(value));
        }
        if self.is_broken() {
            return Some(Err(MsgError::Broke));
        }
        None
    }

    /// Waits for a message. `None` waits without a deadline.
    fn wait_until(
        &self,
        state: &mut MutexGuard<'_, SubscriberState<T>>,
        deadline: Option<Instant>,
    ) -> Result<T> {
        loop {
            if let Some(result) = self.take(state) {
                return result;
            }
            match deadline {
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        return Err(MsgError::NoMsg);
                    }
                    self.ready.wait_until(state, deadline);
                }
                None => self.ready.wait(state),
            }
        }
    }

    /// Timed consumption: only registration is required.
    fn consume_timed(&self, deadline: Option<Instant>) -> Result<T> {
        let mut state = self.state.lock();
        let _waiting = WaitingGuard::enter(&self.waiting);
        self.check_registered(&state)?;
        self.wait_until(&mut state, deadline)
    }
}

impl<T> Subscriber<T> {
    /// Creates a subscriber that is not registered on any channel yet.
    #[must_use]
    pub fn unbound(registry: &Registry<T>) -> Self {
        Self {
            core: Arc::new(SubscriberCore {
                registry: registry.clone(),
                state: Mutex::new(SubscriberState {
                    name: None,
                    queue: BoundedQueue::new(registry.config().default_queue_size),
                }),
                ready: Condvar::new(),
                publisher: Mutex::new(None),
                waiting: AtomicUsize::new(0),
                broken: AtomicBool::new(false),
            }),
        }
    }

    /// Creates a subscriber on `name` with the registry's default queue size.
    ///
    /// # Errors
    /// See [`Subscriber::register`].
    pub fn new(registry: &Registry<T>, name: &str) -> Result<Self> {
        Self::with_queue_size(registry, name, registry.config().default_queue_size)
    }

    /// Creates a subscriber on `name` keeping at most `max_size` messages
    /// (0 = unbounded).
    ///
    /// # Errors
    /// See [`Subscriber::register`].
    pub fn with_queue_size(registry: &Registry<T>, name: &str, max_size: usize) -> Result<Self> {
        let subscriber = Self::unbound(registry);
        subscriber.register(name, max_size)?;
        Ok(subscriber)
    }

    /// Registers this subscriber on `name`.
    ///
    /// Attaches to the live publisher of `name` if there is one, otherwise
    /// waits in the registry until a publisher binds the name.
    ///
    /// # Arguments
    /// * `name` - Channel name
    /// * `max_size` - Queue capacity; the oldest message is dropped when full (0 = unbounded)
    ///
    /// # Errors
    /// Returns [`MsgError::BadUse`] if already registered, if `name` is blank,
    /// or if the channel is already locked. Returns [`MsgError::Broke`] if this
    /// subscriber has been broken.
    pub fn register(&self, name: &str, max_size: usize) -> Result<()> {
        let mut state = self.core.state.lock();
        if let Some(current) = &state.name {
            return Err(MsgError::bad_use(format!(
                "[Sub] already registered with \"{current}\", trying to register with \"{name}\""
            )));
        }
        if name.is_empty() {
            return Err(MsgError::bad_use(
                "[Sub] cannot register subscriber with blank channel name",
            ));
        }
        if self.core.is_broken() {
            return Err(MsgError::Broke);
        }

        loop {
            let Some(publisher) = self.core.registry.find_or_park(name, &self.core) else {
                tracing::debug!("[Sub] channel \"{}\" has no publisher yet, pending", name);
                break;
            };
            match publisher.adopt(&self.core) {
                Adoption::Attached => {
                    tracing::debug!("[Sub] attached to channel \"{}\"", name);
                    break;
                }
                Adoption::Locked => {
                    return Err(MsgError::bad_use(format!(
                        "[Sub] channel \"{name}\" locked"
                    )));
                }
                // The publisher broke after lookup; its name is being freed.
                Adoption::Broken => std::thread::yield_now(),
            }
        }

        state.name = Some(name.to_owned());
        state.queue.set_capacity(max_size);
        Ok(())
    }

    /// Returns true if this subscriber is attached to a live, unbroken publisher.
    ///
    /// # Errors
    /// Returns [`MsgError::BadUse`] if not registered.
    pub fn has_publisher(&self) -> Result<bool> {
        let state = self.core.state.lock();
        self.core.check_registered(&state)?;
        Ok(self
            .core
            .publisher()
            .is_some_and(|publisher| !publisher.is_broken()))
    }

    /// Blocks until a message arrives or the channel breaks.
    ///
    /// # Errors
    /// - [`MsgError::BadUse`] if not registered or no publisher is attached
    /// - [`MsgError::Broke`] if the channel broke and no message is left
    pub fn consume(&self) -> Result<T> {
        let mut state = self.core.state.lock();
        let _waiting = WaitingGuard::enter(&self.core.waiting);
        self.core.check_attached(&state)?;
        self.core.wait_until(&mut state, None)
    }

    /// Like [`Subscriber::consume`], giving up after `timeout`.
    ///
    /// A subscriber still waiting for its publisher may call this; a
    /// publisher binding the channel during the wait can still deliver.
    /// A timeout too large to represent waits without a deadline.
    ///
    /// # Errors
    /// - [`MsgError::BadUse`] if not registered
    /// - [`MsgError::NoMsg`] if nothing arrived within `timeout`
    /// - [`MsgError::Broke`] if the channel broke and no message is left
    pub fn consume_for(&self, timeout: Duration) -> Result<T> {
        self.core.consume_timed(Instant::now().checked_add(timeout))
    }

    /// Like [`Subscriber::consume_for`] with an absolute deadline.
    ///
    /// # Errors
    /// Same as [`Subscriber::consume_for`].
    pub fn consume_until(&self, deadline: Instant) -> Result<T> {
        self.core.consume_timed(Some(deadline))
    }

    /// Takes a message if one is queued, without blocking.
    ///
    /// # Errors
    /// - [`MsgError::BadUse`] if not registered
    /// - [`MsgError::Broke`] if the channel broke and no message is left
    pub fn try_consume(&self) -> Result<Option<T>> {
        let mut state = self.core.state.lock();
        self.core.check_registered(&state)?;
        self.core.take(&mut state).transpose()
    }

    /// Breaks the channel. Idempotent.
    pub fn break_channel(&self) {
        self.core.break_channel();
    }

    /// Returns the channel name.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.core.state.lock().name.clone()
    }

    /// Returns the queue capacity (0 = unbounded).
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.core.state.lock().queue.capacity()
    }

    /// Returns the number of queued messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.core.state.lock().queue.len()
    }

    /// Returns true if no message is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.core.state.lock().queue.is_empty()
    }

    /// Returns true if the channel has been broken.
    #[must_use]
    pub fn is_broken(&self) -> bool {
        self.core.is_broken()
    }

    /// Returns the number of threads blocked in a consume call.
    #[must_use]
    pub fn waiting(&self) -> usize {
        self.core.waiting()
    }
}

impl<T> Drop for Subscriber<T> {
    fn drop(&mut self) {
        self.core.break_channel();
    }
}


impl<T> std::fmt::Debug for Subscriber<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber").finish_non_exhaustive()
    }
}
