//! # IronMsg Channel
//!
//! In-process single-publisher / multi-subscriber channels.
//!
//! This crate provides:
//! - [`registry`] - Per-message-type channel registry binding names to endpoints
//! - [`publisher`] - Publishing endpoint with `same`, `rand`, `each` and `wait_fst` fan-out
//! - [`subscriber`] - Subscribing endpoint with a drop-oldest bounded queue and
//!   blocking, relative-timeout and deadline consumption
//! - [`delay`] - Closable queue releasing items at their due time
//!
//! Publishers and subscribers register in any order. Once the publisher
//! locks the channel its membership is frozen and `push` routes messages
//! straight into subscriber queues. Dropping (or breaking) any endpoint
//! breaks the whole channel: every blocked consumer wakes up with
//! [`MsgError::Broke`] and the name becomes free for a new publisher.
//!
//! ```
//! use ironmsg_channel::{Distribution, Publisher, Registry, Subscriber};
//!
//! let registry = Registry::<String>::new();
//! let publisher = Publisher::new(&registry, "ch", Distribution::Each)?;
//! let s1 = Subscriber::new(&registry, "ch")?;
//! let s2 = Subscriber::new(&registry, "ch")?;
//! publisher.lock(true)?;
//!
//! publisher.push("a".to_string())?;
//! publisher.push("b".to_string())?;
//! assert_eq!(s1.consume()?, "a");
//! assert_eq!(s2.consume()?, "b");
//! # Ok::<(), ironmsg_channel::MsgError>(())
//! ```

pub mod config;
pub mod delay;
pub mod error;
pub mod policy;
pub mod publisher;
pub mod queue;
pub mod registry;
pub mod subscriber;
mod waiting;

pub use config::RegistryConfig;
pub use delay::DelayQueue;
pub use error::{DelayError, ErrorKind, MsgError, Result};
pub use policy::Distribution;
pub use publisher::Publisher;
pub use queue::BoundedQueue;
pub use registry::Registry;
pub use subscriber::Subscriber;

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    const MESSAGES: usize = 20;

    /// Runs one publisher and `n` subscriber threads on `name` and returns
    /// what each subscriber received before the channel broke.
    fn run_fan_out(
        registry: &Registry<String>,
        name: &'static str,
        n: usize,
        policy: Distribution,
    ) -> Vec<Vec<String>> {
        let (registered_tx, registered_rx) = bounded::<()>(n);

        let consumers: Vec<_> = (0..n)
            .map(|_| {
                let registry = registry.clone();
                let registered_tx = registered_tx.clone();
                thread::spawn(move || {
                    let subscriber = Subscriber::with_queue_size(&registry, name, 0).unwrap();
                    registered_tx.send(()).unwrap();
                    let mut received = Vec::new();
                    loop {
                        match subscriber.consume_for(Duration::from_secs(10)) {
                            Ok(message) => received.push(message),
                            Err(MsgError::Broke) => break,
                            Err(other) => panic!("unexpected error: {other}"),
                        }
                    }
                    received
                })
            })
            .collect();

        let publisher = Publisher::new(registry, name, policy).unwrap();
        for _ in 0..n {
            registered_rx.recv().unwrap();
        }
        publisher.lock(true).unwrap();
        assert_eq!(publisher.subscriber_count(), n);
        for i in 0..MESSAGES {
            publisher.push(format!("Data {i}")).unwrap();
        }
        // Queued messages outlive the break, so consumers drain then see `Broke`.
        drop(publisher);

        consumers.into_iter().map(|c| c.join().unwrap()).collect()
    }

    #[test]
    fn test_basic_publish_consume() {
        let registry = Registry::new();
        let received = run_fan_out(&registry, "a", 1, Distribution::Same);
        let expected: Vec<_> = (0..MESSAGES).map(|i| format!("Data {i}")).collect();
        assert_eq!(received, vec![expected]);
    }

    #[test]
    fn test_channel_reuse() {
        let registry = Registry::new();
        for _ in 0..2 {
            let received = run_fan_out(&registry, "a", 1, Distribution::Same);
            assert_eq!(received[0].len(), MESSAGES);
        }
        assert!(!registry.is_bound("a"));
    }

    #[test]
    fn test_fan_out_same() {
        let registry = Registry::new();
        let received = run_fan_out(&registry, "b", 4, Distribution::Same);
        let expected: Vec<_> = (0..MESSAGES).map(|i| format!("Data {i}")).collect();
        for messages in received {
            assert_eq!(messages, expected);
        }
    }

    #[test]
    fn test_fan_out_each() {
        let registry = Registry::new();
        let received = run_fan_out(&registry, "b", 4, Distribution::Each);
        for messages in &received {
            assert_eq!(messages.len(), MESSAGES / 4);
        }
        let mut all: Vec<_> = received.into_iter().flatten().collect();
        all.sort();
        let mut expected: Vec<_> = (0..MESSAGES).map(|i| format!("Data {i}")).collect();
        expected.sort();
        assert_eq!(all, expected);
    }

    #[test]
    fn test_fan_out_exclusive_policies() {
        for policy in [Distribution::Rand, Distribution::WaitFirst] {
            let registry = Registry::new();
            let received = run_fan_out(&registry, "b", 4, policy);
            let total: usize = received.iter().map(Vec::len).sum();
            assert_eq!(total, MESSAGES, "policy {policy}");
        }
    }

    #[test]
    fn test_each_scenario() {
        let registry = Registry::<String>::new();
        let publisher = Publisher::new(&registry, "ch", Distribution::Each).unwrap();
        let s1 = Subscriber::new(&registry, "ch").unwrap();
        let s2 = Subscriber::new(&registry, "ch").unwrap();
        publisher.lock(false).unwrap();
        publisher.push("a".to_string()).unwrap();
        publisher.push("b".to_string()).unwrap();
        assert_eq!(s1.consume().unwrap(), "a");
        assert_eq!(s2.consume().unwrap(), "b");
    }

    #[test]
    fn test_sibling_drop_wakes_blocked_consumers() {
        let registry = Registry::<u64>::new();
        let publisher = Publisher::new(&registry, "c", Distribution::Same).unwrap();
        let doomed = Subscriber::new(&registry, "c").unwrap();
        let waiters: Vec<_> = (0..3)
            .map(|_| Arc::new(Subscriber::new(&registry, "c").unwrap()))
            .collect();
        publisher.lock(true).unwrap();

        let handles: Vec<_> = waiters
            .iter()
            .map(|subscriber| {
                let subscriber = Arc::clone(subscriber);
                thread::spawn(move || subscriber.consume())
            })
            .collect();
        while waiters.iter().any(|s| s.waiting() == 0) {
            thread::yield_now();
        }

        drop(doomed);
        for handle in handles {
            assert_eq!(handle.join().unwrap(), Err(MsgError::Broke));
        }
        assert!(publisher.is_broken());
        assert!(!registry.is_bound("c"));
    }

    #[test]
    fn test_concurrent_registration_and_teardown() {
        let registry = Registry::<u64>::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                thread::spawn(move || {
                    for round in 0..50 {
                        if (i + round) % 2 == 0 {
                            if let Ok(publisher) =
                                Publisher::new(&registry, "race", Distribution::Same)
                            {
                                let _ = publisher.lock(false);
                                let _ = publisher.push(round as u64);
                            }
                        } else if let Ok(subscriber) = Subscriber::new(&registry, "race") {
                            let _ = subscriber.consume_for(Duration::from_millis(1));
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        // Every endpoint is gone, so the name must be free again.
        assert!(!registry.is_bound("race"));
        assert_eq!(registry.pending_count("race"), 0);
        assert!(Publisher::new(&registry, "race", Distribution::Same).is_ok());
    }
}
