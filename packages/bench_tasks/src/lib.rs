//! Benchmark payloads for the [`rate_bench`] harness.
//!
//! Every payload verifies its own output against a value known in advance (or computed once
//! during preparation) so that a broken compiler, CPU or memory subsystem produces a process
//! abort instead of an impressive but meaningless rate.
//!
//! Payloads are grouped into suites, each represented by an enum of cases:
//!
//! - [`CpuCase`] - integer, floating point and sorting kernels.
//! - [`MemCase`] - sequential scans over a large per-worker memory region.
//! - [`HashCase`] - cryptographic digests over an 8 KiB block.
//!
//! Every case enum implements [`BenchCase`], which provides case-insensitive lookup by name.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use bench_tasks::{BenchCase, CpuCase};
//!
//! let case: CpuCase = "xorshift".parse().unwrap();
//! assert_eq!(case.name(), "XORSHIFT");
//!
//! let report = case.run(1, Duration::from_millis(50)).unwrap();
//! assert!(report.total_ops() > 0);
//! ```

mod algorithm;
mod case;
mod cpu;
mod error;
mod hash;
mod matrix;
mod mem;

pub use algorithm::*;
pub use case::*;
pub use cpu::*;
pub use error::*;
pub use hash::*;
pub use matrix::*;
pub use mem::*;
