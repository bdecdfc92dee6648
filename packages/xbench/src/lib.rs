//! Command line drivers for the `bench_tasks` payloads.
//!
//! Each `xb-*` binary runs one suite of payloads on a configurable number of threads and prints
//! one `{name}{rate}` row per case. The `xbench` binary runs every suite over a range of thread
//! counts, condenses the results into a weighted score per suite and prints the whole result,
//! together with a description of the machine, as a TOML document.
//!
//! This library holds the logic shared by the binaries so that it can be tested without
//! spawning processes.

mod error;
mod logging;
mod options;
mod suite;
mod system;
mod table;

pub use error::*;
pub use logging::*;
pub use options::*;
pub use suite::*;
pub use system::*;
pub use table::*;
