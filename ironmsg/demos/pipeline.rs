//! Example pipeline: one producer task feeding a pool of worker tasks.
//!
//! Run with: `RUST_LOG=debug cargo run --example pipeline`

use ironmsg::prelude::*;
use std::thread;
use std::time::{Duration, Instant};

const PRODUCER: &str = r#"{"enable": true, "io": {"output": {"channel": "jobs"}}}"#;
const WORKER: &str = r#"{"enable": true, "io": {"input": {"channel": "jobs"}}, "args": {"work_ms": "5"}}"#;
const WORKERS: usize = 3;
const JOBS: u64 = 12;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = RegistryConfig::from_json(r#"{"default_queue_size": 0}"#)?;
    let registry = Registry::<u64>::with_config(config);
    let producer = TaskInfo::from_json(PRODUCER)?;
    let worker = TaskInfo::from_json(WORKER)?;
    let work = Duration::from_millis(worker.args.get("work_ms").map_or(Ok(5), |v| v.parse())?);

    // Workers register before the producer exists; the producer inherits them.
    let handles: Vec<_> = (0..WORKERS)
        .map(|id| -> Result<_, TaskError> {
            let input = worker.subscriber(&registry, "input", 0)?;
            Ok(thread::spawn(move || {
                let mut done = 0;
                loop {
                    match input.consume_for(Duration::from_millis(200)) {
                        Ok(job) => {
                            println!("[Worker {id}] job {job}");
                            thread::sleep(work);
                            done += 1;
                        }
                        // Still waiting for the producer to bind the channel
                        Err(MsgError::NoMsg) => continue,
                        Err(MsgError::Broke) => break,
                        Err(e) => {
                            eprintln!("[Worker {id}] error: {e}");
                            break;
                        }
                    }
                }
                done
            }))
        })
        .collect::<Result<_, TaskError>>()?;

    let output = producer.publisher(&registry, "output", Distribution::WaitFirst)?;
    output.lock(true)?;

    // Jobs are released on a schedule through a delay queue.
    let schedule = DelayQueue::new();
    let start = Instant::now();
    for job in 0..JOBS {
        schedule.push(job, start + Duration::from_millis(job * 2))?;
    }
    while let Some(job) = schedule.pop_timeout(Duration::from_millis(100))? {
        output.push(job)?;
    }
    schedule.close();

    // Give the pool time to drain, then tear the channel down.
    thread::sleep(work * (JOBS as u32));
    output.break_channel();

    for (id, handle) in handles.into_iter().enumerate() {
        let done = handle.join().map_err(|_| "worker panicked")?;
        println!("[Worker {id}] finished {done} job(s)");
    }
    Ok(())
}
