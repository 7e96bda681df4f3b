//! Round-trip latency between two channels.

use crate::{BenchError, join_worker};
use hdrhistogram::Histogram;
use ironmsg_channel::{Distribution, Publisher, Registry, Subscriber};
use std::thread;
use std::time::Instant;

/// Latency statistics in nanoseconds.
#[derive(Debug, Clone)]
pub struct LatencyStats {
    /// Minimum latency.
    pub min: u64,
    /// Maximum latency.
    pub max: u64,
    /// Median latency (p50).
    pub median: u64,
    /// 99th percentile latency.
    pub p99: u64,
    /// Sample count.
    pub count: u64,
}

impl LatencyStats {
    /// Summarizes a histogram. Returns `None` if it holds no samples.
    #[must_use]
    pub fn from_histogram(histogram: &Histogram<u64>) -> Option<Self> {
        if histogram.is_empty() {
            return None;
        }
        Some(Self {
            min: histogram.min(),
            max: histogram.max(),
            median: histogram.value_at_quantile(0.5),
            p99: histogram.value_at_quantile(0.99),
            count: histogram.len(),
        })
    }
}

/// Measures `samples` ping/pong round trips between this thread and an echo
/// thread, over a `ping` and a `pong` channel.
///
/// # Errors
/// Returns an error if the histogram cannot be created, a round trip fails,
/// or the echo thread panics.
pub fn measure_round_trip(samples: usize) -> Result<Option<LatencyStats>, BenchError> {
    let registry = Registry::<u64>::new();
    let ping = Publisher::new(&registry, "ping", Distribution::Same)?;
    let ping_rx = Subscriber::new(&registry, "ping")?;
    let pong = Publisher::new(&registry, "pong", Distribution::Same)?;
    let pong_rx = Subscriber::new(&registry, "pong")?;
    ping.lock(true)?;
    pong.lock(true)?;

    let echo = thread::spawn(move || {
        while let Ok(value) = ping_rx.consume() {
            if pong.push(value).is_err() {
                break;
            }
        }
    });

    // 3 significant figures
    let mut histogram = Histogram::<u64>::new(3)?;
    for i in 0..samples as u64 {
        let start = Instant::now();
        ping.push(i)?;
        pong_rx.consume()?;
        histogram.saturating_record(start.elapsed().as_nanos() as u64);
    }
    drop(ping);
    join_worker(echo, "echo")?;

    Ok(LatencyStats::from_histogram(&histogram))
}
