//! Fixed-duration multithreaded throughput measurement.
//!
//! This package runs a task concurrently on a number of worker threads for a fixed wall-clock
//! duration and reports how many task iterations were completed per second, summed over all
//! workers. The same harness is used with very different payloads (arithmetic kernels, memory
//! scans, cryptographic digests), so it knows nothing about what a task does - it only drives
//! the task lifecycle and counts iterations.
//!
//! The core functionality includes:
//! - [`Task`] - Entry point for configuring the lifecycle hooks of a benchmark task
//! - [`TaskOps`] - A configured task with up to four hooks (prepare, warmup, run, cleanup)
//! - [`run()`] - Executes a task on N workers for a fixed duration
//! - [`RunReport`] - The measured rate and the counters it was derived from
//!
//! # Operating Principles
//!
//! ## Worker lifecycle
//!
//! Every worker thread prepares its private state, performs one unmeasured warmup invocation
//! and then reports that it is ready. Once every worker is ready, all of them are released at
//! the same time and call the `run` hook in a loop until the stop signal is raised. Each worker
//! then reports that it has drained and releases its private state in the `cleanup` hook.
//!
//! ## Measurement window
//!
//! The measurement window starts immediately before the workers are released and ends when the
//! last worker has drained. The window therefore includes thread wake-up latency at the start
//! and the overshoot of the final iteration at the end, making the reported rate a slight
//! underestimate of the true per-thread throughput.
//!
//! ## Self-validation
//!
//! Tasks are expected to verify their own output and report a [`ValidationFailure`] instead of
//! counting an iteration that produced a wrong result. A validation failure (or a panic in any
//! hook) means the measurement cannot be trusted, so the process is aborted on the spot.
//!
//! # Example
//!
//! ```
//! use std::hint::black_box;
//! use std::time::Duration;
//!
//! use rate_bench::Task;
//!
//! let task = Task::new()
//!     .run(|_| {
//!         black_box((0..100_u64).sum::<u64>());
//!         Ok(())
//!     })
//!     .build();
//!
//! let report = rate_bench::run(&task, 2, Duration::from_millis(50), ()).unwrap();
//!
//! println!("{:.2} iterations per second", report.rate());
//! ```
//!
//! # Per-worker state and shared configuration
//!
//! ```
//! use std::time::Duration;
//!
//! use rate_bench::{Task, ValidationFailure};
//!
//! #[derive(Debug)]
//! struct SumConfig {
//!     len: usize,
//! }
//!
//! let task = Task::with_config::<SumConfig>()
//!     .prepare(|args| vec![1_u64; args.config().len])
//!     .run_with_warmup(|values: &mut Vec<u64>| {
//!         let sum: u64 = values.iter().sum();
//!         ValidationFailure::check_eq("sum of ones", values.len() as u64, sum)
//!     })
//!     .cleanup(drop)
//!     .build();
//!
//! let report = rate_bench::run(&task, 1, Duration::from_millis(50), SumConfig { len: 1024 })
//!     .unwrap();
//!
//! assert_eq!(report.worker_count(), 1);
//! ```

mod args;
mod coordinator;
mod error;
mod shared;
mod task;
mod worker;

// This is in a separate module because 99% of the time the user never needs to name
// these types, so it makes sense to de-emphasize them in the API documentation.
pub mod configure;

pub use args::*;
pub use coordinator::*;
pub use error::*;
pub use task::*;
pub use worker::MAX_CHUNK_BYTES;
