//! Publishing side of a channel.
//!
//! A channel has at most one publisher. The publisher owns the list of
//! attached subscribers and routes every pushed message through its
//! [`Distribution`] policy.
//!
//! Locking: the publisher state lock may be taken while holding a subscriber
//! state lock (subscriber registration), and the registry lock may be taken
//! while holding it (publisher registration). It is never held while a
//! subscriber state lock is acquired: `push` selects its targets under the
//! state lock and delivers after releasing it, and `break_channel` snapshots
//! the subscriber list before breaking each subscriber.

use crate::error::{MsgError, Result};
use crate::policy::Distribution;
use crate::registry::Registry;
use crate::subscriber::SubscriberCore;
use parking_lot::Mutex;
use rand::distributions::Uniform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Publishing endpoint of a channel.
///
/// Dropping the publisher breaks the channel: every attached subscriber is
/// poisoned and the channel name becomes free for a new publisher.
pub struct Publisher<T> {
    core: Arc<PublisherCore<T>>,
}

pub(crate) struct PublisherCore<T> {
    registry: Registry<T>,
    state: Mutex<PublisherState<T>>,
    /// Serialises pushes so each subscriber sees producer call order.
    delivery: Mutex<()>,
    broken: AtomicBool,
}

struct PublisherState<T> {
    name: Option<String>,
    policy: Distribution,
    locked: bool,
    subscribers: Arc<[Arc<SubscriberCore<T>>]>,
    next_index: usize,
    random: Option<RandomPick>,
}

struct RandomPick {
    rng: StdRng,
    range: Uniform<usize>,
}

/// Subscribers selected for one pushed message.
enum Route<T> {
    One(Arc<SubscriberCore<T>>),
    All(Arc<[Arc<SubscriberCore<T>>]>),
}

/// Outcome of a subscriber asking to join a publisher's list.
pub(crate) enum Adoption {
    Attached,
    Locked,
    Broken,
}

impl<T> PublisherState<T> {
    fn channel_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    fn route(&mut self) -> Result<Route<T>> {
        let count = self.subscribers.len();
        if count == 1 {
            return Ok(Route::One(Arc::clone(&self.subscribers[0])));
        }

        match self.policy {
            Distribution::Same => Ok(Route::All(Arc::clone(&self.subscribers))),
            Distribution::Each => {
                let target = Arc::clone(&self.subscribers[self.next_index]);
                self.next_index = (self.next_index + 1) % count;
                Ok(Route::One(target))
            }
            Distribution::WaitFirst => {
                let waiting = self
                    .subscribers
                    .iter()
                    .find(|subscriber| subscriber.waiting() > 0)
                    .cloned();
                match waiting {
                    Some(target) => Ok(Route::One(target)),
                    None => self.random_route(),
                }
            }
            Distribution::Rand => self.random_route(),
        }
    }

    fn random_route(&mut self) -> Result<Route<T>> {
        if let Some(random) = self.random.as_mut() {
            let index = random.rng.sample(random.range);
            return Ok(Route::One(Arc::clone(&self.subscribers[index])));
        }
        Err(MsgError::bad_use(format!(
            "[Pub] channel \"{}\" has no random range for policy {}",
            self.channel_name(),
            self.policy
        )))
    }
}

impl<T> PublisherCore<T> {
    pub(crate) fn is_broken(&self) -> bool {
        self.broken.load(Ordering::Acquire)
    }

    /// Appends `subscriber` unless the channel is locked or broken.
    pub(crate) fn adopt(self: &Arc<Self>, subscriber: &Arc<SubscriberCore<T>>) -> Adoption {
        let mut state = self.state.lock();
        if self.is_broken() {
            return Adoption::Broken;
        }
        if state.locked {
            return Adoption::Locked;
        }
        let mut subscribers = state.subscribers.to_vec();
        subscribers.push(Arc::clone(subscriber));
        state.subscribers = subscribers.into();
        subscriber.link_to(Arc::downgrade(self));
        Adoption::Attached
    }

    /// Breaks the channel. Idempotent.
    pub(crate) fn break_channel(&self) {
        if self.is_broken() {
            return;
        }
        let (name, subscribers) = {
            let state = self.state.lock();
            if self.broken.swap(true, Ordering::AcqRel) {
                return;
            }
            (state.name.clone(), Arc::clone(&state.subscribers))
        };

        tracing::debug!(
            "[Pub] channel \"{}\" broken, poisoning {} subscriber(s)",
            name.as_deref().unwrap_or(""),
            subscribers.len()
        );
        for subscriber in subscribers.iter() {
            subscriber.break_channel();
        }
        if let Some(name) = name {
            self.registry.release(&name, self);
        }
    }
}

impl<T> Publisher<T> {
    /// Creates a publisher that is not bound to any channel yet.
    #[must_use]
    pub fn unbound(registry: &Registry<T>) -> Self {
        Self {
            core: Arc::new(PublisherCore {
                registry: registry.clone(),
                state: Mutex::new(PublisherState {
                    name: None,
                    policy: Distribution::Same,
                    locked: false,
                    subscribers: Arc::from(Vec::new()),
                    next_index: 0,
                    random: None,
                }),
                delivery: Mutex::new(()),
                broken: AtomicBool::new(false),
            }),
        }
    }

    /// Creates a publisher bound to `name`.
    ///
    /// # Errors
    /// See [`Publisher::register`].
    pub fn new(registry: &Registry<T>, name: &str, policy: Distribution) -> Result<Self> {
        let publisher = Self::unbound(registry);
        publisher.register(name, policy)?;
        Ok(publisher)
    }

    /// Binds this publisher to `name`.
    ///
    /// Subscribers that registered on `name` before any publisher existed are
    /// attached here, in registration order.
    ///
    /// # Errors
    /// Returns [`MsgError::BadUse`] if this publisher already has a name, if
    /// `name` is blank, or if another live publisher owns `name`. Returns
    /// [`MsgError::Broke`] if this publisher has been broken.
    pub fn register(&self, name: &str, policy: Distribution) -> Result<()> {
        let mut state = self.core.state.lock();
        if let Some(current) = &state.name {
            return Err(MsgError::bad_use(format!(
                "[Pub] already registered with \"{current}\", trying to register with \"{name}\""
            )));
        }
        if name.is_empty() {
            return Err(MsgError::bad_use(
                "[Pub] cannot register publisher with blank channel name",
            ));
        }
        if self.core.is_broken() {
            return Err(MsgError::Broke);
        }

        let inherited = self.core.registry.bind(name, &self.core)?;
        state.name = Some(name.to_owned());
        state.policy = policy;
        state.subscribers = inherited.into();

        tracing::debug!(
            "[Pub] bound channel \"{}\" ({}), inherited {} subscriber(s)",
            name,
            policy,
            state.subscribers.len()
        );
        Ok(())
    }

    /// Locks the channel. No subscriber can join afterwards.
    ///
    /// # Arguments
    /// * `must_have_subscriber` - Fail if nobody is attached yet
    ///
    /// # Errors
    /// Returns [`MsgError::BadUse`] if already locked, not registered, or
    /// `must_have_subscriber` is set and the channel has no subscriber.
    pub fn lock(&self, must_have_subscriber: bool) -> Result<()> {
        let mut state = self.core.state.lock();
        if state.locked {
            return Err(MsgError::bad_use(format!(
                "[Pub] channel \"{}\" already locked",
                state.channel_name()
            )));
        }
        let Some(name) = state.name.clone() else {
            return Err(MsgError::bad_use(
                "[Pub] this publisher is not registered yet",
            ));
        };
        let count = state.subscribers.len();
        if must_have_subscriber && count == 0 {
            return Err(MsgError::bad_use(format!(
                "[Pub] channel \"{name}\" has no subscribers, but requires at least one"
            )));
        }

        state.locked = true;
        if count > 1 && state.policy.is_random() {
            state.random = Some(RandomPick {
                rng: seeded_rng(self.core.registry.config().seed, &name),
                range: Uniform::new(0, count),
            });
        }
        tracing::debug!(
            "[Pub] channel \"{}\" locked with {} subscriber(s)",
            name,
            count
        );
        Ok(())
    }

    /// Publishes a message according to the distribution policy.
    ///
    /// Does nothing if the channel is broken or has no subscriber.
    ///
    /// # Errors
    /// Returns [`MsgError::BadUse`] if the channel is not locked.
    pub fn push(&self, value: T) -> Result<()>
    where
        T: Clone,
    {
        let _delivery = self.core.delivery.lock();
        let route = {
            let mut state = self.core.state.lock();
            if !state.locked {
                return Err(MsgError::bad_use(format!(
                    "[Pub] channel \"{}\" is not locked",
                    state.channel_name()
                )));
            }
            if state.subscribers.is_empty() || self.core.is_broken() {
                return Ok(());
            }
            state.route()?
        };

        match route {
            Route::One(subscriber) => subscriber.deliver(value),
            Route::All(subscribers) => {
                if let Some((last, rest)) = subscribers.split_last() {
                    for subscriber in rest {
                        subscriber.deliver(value.clone());
                    }
                    last.deliver(value);
                }
            }
        }
        Ok(())
    }

    /// Returns true if at least one subscriber is attached.
    ///
    /// # Errors
    /// Returns [`MsgError::BadUse`] if the channel is not locked.
    pub fn has_subscriber(&self) -> Result<bool> {
        let state = self.core.state.lock();
        if !state.locked {
            return Err(MsgError::bad_use(format!(
                "[Pub] channel \"{}\" is not locked",
                state.channel_name()
            )));
        }
        Ok(!state.subscribers.is_empty())
    }

    /// Breaks the channel and frees its name. Idempotent.
    pub fn break_channel(&self) {
        self.core.break_channel();
    }

    /// Returns the bound channel name.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.core.state.lock().name.clone()
    }

    /// Returns the distribution policy.
    #[must_use]
    pub fn policy(&self) -> Distribution {
        self.core.state.lock().policy
    }

    /// Returns true once [`Publisher::lock`] has succeeded.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.core.state.lock().locked
    }

    /// Returns true if the channel has been broken.
    #[must_use]
    pub fn is_broken(&self) -> bool {
        self.core.is_broken()
    }

    /// Returns the number of attached subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.core.state.lock().subscribers.len()
    }
}

impl<T> Drop for Publisher<T> {
    fn drop(&mut self) {
        self.core.break_channel();
    }
}

/// Builds the generator for `rand`/`wait_fst`, deterministic when seeded.
fn seeded_rng(seed: Option<u64>, name: &str) -> StdRng {
    match seed {
        Some(seed) => {
            let mut hasher = DefaultHasher::new();
            name.hash(&mut hasher);
            StdRng::seed_from_u64(seed ^ hasher.finish())
        }
        None => StdRng::from_entropy(),
    }
}


impl<T> std::fmt::Debug for Publisher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher").finish_non_exhaustive()
    }
}
