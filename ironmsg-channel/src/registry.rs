//! Channel registry shared by the publishers and subscribers of one message type.
//!
//! The registry maps a channel name either to its bound publisher or to the
//! subscribers that registered before any publisher did. A name lives in at
//! most one of the two maps.
//!
//! Locking: the registry lock is always the innermost of the three channel
//! locks (subscriber, publisher, registry). Code holding it never acquires a
//! publisher or subscriber state lock; it only touches the subscriber's
//! back-reference slot, which is a leaf lock.

use crate::config::RegistryConfig;
use crate::error::{MsgError, Result};
use crate::publisher::PublisherCore;
use crate::subscriber::SubscriberCore;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Per-message-type channel registry.
///
/// Cloning is cheap and yields a handle to the same registry. Endpoints
/// created from different registries never see each other, which keeps
/// independent subsystems (and tests) isolated.
pub struct Registry<T> {
    inner: Arc<RegistryInner<T>>,
}

struct RegistryInner<T> {
    config: RegistryConfig,
    maps: Mutex<ChannelMaps<T>>,
}

struct ChannelMaps<T> {
    bound: HashMap<String, Weak<PublisherCore<T>>>,
    pending: HashMap<String, Vec<Arc<SubscriberCore<T>>>>,
}

impl<T> ChannelMaps<T> {
    /// Returns the live, unbroken publisher bound to `name`, dropping a stale entry.
    fn live_publisher(&mut self, name: &str) -> Option<Arc<PublisherCore<T>>> {
        let publisher = self.bound.get(name).and_then(Weak::upgrade);
        match publisher {
            Some(publisher) if !publisher.is_broken() => Some(publisher),
            _ => {
                self.bound.remove(name);
                None
            }
        }
    }
}

impl<T> Registry<T> {
    /// Creates a registry with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Creates a registry with the given configuration.
    #[must_use]
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                config,
                maps: Mutex::new(ChannelMaps {
                    bound: HashMap::new(),
                    pending: HashMap::new(),
                }),
            }),
        }
    }

    /// Returns the configuration of this registry.
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    /// Returns true if a live publisher is bound to `name`.
    #[must_use]
    pub fn is_bound(&self, name: &str) -> bool {
        self.inner
            .maps
            .lock()
            .bound
            .get(name)
            .and_then(Weak::upgrade)
            .is_some_and(|publisher| !publisher.is_broken())
    }

    /// Returns the number of subscribers waiting for a publisher on `name`.
    #[must_use]
    pub fn pending_count(&self, name: &str) -> usize {
        self.inner.maps.lock().pending.get(name).map_or(0, Vec::len)
    }

    /// Binds `publisher` to `name` and hands over the subscribers parked there.
    ///
    /// Subscribers that were broken while parked are dropped. Each inherited
    /// subscriber gets its back-reference pointed at `publisher` before the
    /// registry lock is released.
    pub(crate) fn bind(
        &self,
        name: &str,
        publisher: &Arc<PublisherCore<T>>,
    ) -> Result<Vec<Arc<SubscriberCore<T>>>> {
        let mut maps = self.inner.maps.lock();
        if maps.live_publisher(name).is_some() {
            return Err(MsgError::bad_use(format!(
                "[Pub] channel \"{name}\" has been used by another publisher"
            )));
        }
        maps.bound.insert(name.to_owned(), Arc::downgrade(publisher));

        let parked = maps.pending.remove(name).unwrap_or_default();
        let inherited: Vec<_> = parked
            .into_iter()
            .filter(|subscriber| !subscriber.is_broken())
            .collect();
        for subscriber in &inherited {
            subscriber.link_to(Arc::downgrade(publisher));
        }
        Ok(inherited)
    }

    /// Looks up the publisher bound to `name`, or parks `subscriber` in the
    /// pending list when there is none.
    pub(crate) fn find_or_park(
        &self,
        name: &str,
        subscriber: &Arc<SubscriberCore<T>>,
    ) -> Option<Arc<PublisherCore<T>>> {
        let mut maps = self.inner.maps.lock();
        if let Some(publisher) = maps.live_publisher(name) {
            return Some(publisher);
        }
        maps.pending
            .entry(name.to_owned())
            .or_default()
            .push(Arc::clone(subscriber));
        None
    }

    /// Frees `name` if it is still bound to `publisher`.
    pub(crate) fn release(&self, name: &str, publisher: &PublisherCore<T>) {
        let mut maps = self.inner.maps.lock();
        let owned = maps
            .bound
            .get(name)
            .is_some_and(|bound| std::ptr::eq(bound.as_ptr(), publisher));
        if owned {
            maps.bound.remove(name);
            tracing::debug!("[Pub] channel \"{}\" released", name);
        }
    }

    /// Removes a parked subscriber from the pending list of `name`.
    pub(crate) fn withdraw(&self, name: &str, subscriber: &SubscriberCore<T>) {
        let mut maps = self.inner.maps.lock();
        if let Some(parked) = maps.pending.get_mut(name) {
            parked.retain(|s| !std::ptr::eq(Arc::as_ptr(s), subscriber));
            if parked.is_empty() {
                maps.pending.remove(name);
            }
        }
    }
}

impl<T> Clone for Registry<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Distribution;
    use crate::publisher::Publisher;
    use crate::subscriber::Subscriber;

    #[test]
    fn test_empty_registry() {
        let registry = Registry::<u64>::new();
        assert!(!registry.is_bound("a"));
        assert_eq!(registry.pending_count("a"), 0);
        assert_eq!(registry.config().default_queue_size, 1);
    }

    #[test]
    fn test_pending_then_bound() {
        let registry = Registry::<u64>::new();
        let _s1 = Subscriber::new(&registry, "a").unwrap();
        let _s2 = Subscriber::new(&registry, "a").unwrap();
        assert_eq!(registry.pending_count("a"), 2);
        assert!(!registry.is_bound("a"));

        let publisher = Publisher::new(&registry, "a", Distribution::Same).unwrap();
        assert!(registry.is_bound("a"));
        assert_eq!(registry.pending_count("a"), 0);
        assert_eq!(publisher.subscriber_count(), 2);
    }

    #[test]
    fn test_name_freed_on_drop() {
        let registry = Registry::<u64>::new();
        {
            let _publisher = Publisher::new(&registry, "a", Distribution::Same).unwrap();
            assert!(registry.is_bound("a"));
        }
        assert!(!registry.is_bound("a"));
    }

    #[test]
    fn test_dropped_pending_subscriber_withdraws() {
        let registry = Registry::<u64>::new();
        let s1 = Subscriber::new(&registry, "a").unwrap();
        let _s2 = Subscriber::new(&registry, "a").unwrap();
        drop(s1);
        assert_eq!(registry.pending_count("a"), 1);

        let publisher = Publisher::new(&registry, "a", Distribution::Same).unwrap();
        assert_eq!(publisher.subscriber_count(), 1);
        assert!(!publisher.is_broken());
    }

    #[test]
    fn test_registries_are_isolated() {
        let first = Registry::<u64>::new();
        let second = Registry::<u64>::new();
        let _p1 = Publisher::new(&first, "a", Distribution::Same).unwrap();
        let _p2 = Publisher::new(&second, "a", Distribution::Same).unwrap();
        assert!(first.is_bound("a"));
        assert!(second.is_bound("a"));
    }

    #[test]
    fn test_clone_shares_state() {
        let registry = Registry::<u64>::new();
        let handle = registry.clone();
        let _publisher = Publisher::new(&registry, "a", Distribution::Same).unwrap();
        assert!(handle.is_bound("a"));
    }
}
