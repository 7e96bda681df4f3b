//! # IronMsg Bench
//!
//! Benchmarking utilities for IronMsg channels.

pub mod fan_out;
pub mod latency;

use hdrhistogram::CreationError;
use ironmsg_channel::MsgError;
use std::thread::JoinHandle;

/// Errors raised while running a measurement.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    /// Channel operation failed.
    #[error("channel error: {0}")]
    Msg(#[from] MsgError),

    /// Histogram could not be created.
    #[error("histogram error: {0}")]
    Histogram(#[from] CreationError),

    /// A measurement worker thread panicked.
    #[error("worker thread `{name}` panicked")]
    WorkerPanicked {
        /// Worker role.
        name: &'static str,
    },
}

/// Joins a measurement worker, turning a panic into [`BenchError::WorkerPanicked`].
pub(crate) fn join_worker<R>(
    handle: JoinHandle<R>,
    name: &'static str,
) -> Result<R, BenchError> {
    handle
        .join()
        .map_err(|_| BenchError::WorkerPanicked { name })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_join_worker_result() {
        let handle = thread::spawn(|| 5);
        assert_eq!(join_worker(handle, "worker").unwrap(), 5);
    }

    #[test]
    fn test_join_worker_panic() {
        let handle = thread::spawn(|| -> u64 { panic!("boom") });
        let err = join_worker(handle, "consumer").unwrap_err();
        assert!(matches!(err, BenchError::WorkerPanicked { name: "consumer" }));
        assert_eq!(err.to_string(), "worker thread `consumer` panicked");
    }
}
