//! Fan-out throughput measurement.

use crate::{BenchError, join_worker};
use ironmsg_channel::{Distribution, MsgError, Publisher, Registry, Subscriber};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a fan-out run.
#[derive(Debug, Clone)]
pub struct FanOutResult {
    /// Messages pushed by the publisher.
    pub pushed: u64,
    /// Messages received across all subscribers.
    pub delivered: u64,
    /// Time from the first push until every consumer saw the channel break.
    pub duration: Duration,
}

impl FanOutResult {
    /// Returns pushed messages per second.
    #[must_use]
    pub fn pushes_per_second(&self) -> f64 {
        self.pushed as f64 / self.duration.as_secs_f64()
    }

    /// Returns delivered messages per second.
    #[must_use]
    pub fn deliveries_per_second(&self) -> f64 {
        self.delivered as f64 / self.duration.as_secs_f64()
    }
}

/// Pushes `messages` values through one channel with `subscribers` consumer
/// threads and counts what they receive.
///
/// Subscriber queues are unbounded so nothing is evicted.
///
/// # Errors
/// Returns the channel error if registration, locking or pushing fails, and
/// [`BenchError::WorkerPanicked`] if a consumer thread panics.
pub fn run_fan_out(
    policy: Distribution,
    subscribers: usize,
    messages: u64,
) -> Result<FanOutResult, BenchError> {
    let registry = Registry::<u64>::new();
    let publisher = Publisher::new(&registry, "bench", policy)?;

    let consumers = (0..subscribers)
        .map(|_| {
            let subscriber = Subscriber::with_queue_size(&registry, "bench", 0)?;
            Ok(thread::spawn(move || {
                let mut received = 0u64;
                while subscriber.consume().is_ok() {
                    received += 1;
                }
                received
            }))
        })
        .collect::<Result<Vec<_>, MsgError>>()?;

    publisher.lock(true)?;
    let start = Instant::now();
    for i in 0..messages {
        publisher.push(i)?;
    }
    drop(publisher);

    let mut delivered = 0;
    for consumer in consumers {
        delivered += join_worker(consumer, "consumer")?;
    }

    Ok(FanOutResult {
        pushed: messages,
        delivered,
        duration: start.elapsed(),
    })
}
