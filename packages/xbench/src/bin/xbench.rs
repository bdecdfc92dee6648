//! Runs every suite over a range of thread counts and prints a scored TOML report.

use std::io::{self, Write};
use std::num::NonZero;
use std::process::ExitCode;
use std::time::Duration;

use argh::FromArgs;
use tracing::info;
use xbench::{
    Error, Report, Suite, SystemInfo, available_cores, available_memory_bytes, exit_code,
    init_logging, run_suite, suggest_memory_gib, thread_counts,
};

/// Measures the CPU, digest and memory suites with 1, 2, 4, half and all of the processors and
/// prints the weighted scores together with a description of the machine.
#[derive(FromArgs)]
struct Args {
    /// seconds to measure each case with each thread count (0 means 1)
    #[argh(option, short = 't', default = "0")]
    time: u64,

    /// memory in GiB for the memory suite, by default half the available memory up to 16
    #[argh(option, short = 'G')]
    gib: Option<usize>,
}

fn memory_budget(requested: Option<usize>) -> Result<Option<NonZero<usize>>, Error> {
    if let Some(gib) = requested.and_then(NonZero::new) {
        return Ok(Some(gib));
    }

    Ok(suggest_memory_gib(available_memory_bytes()?))
}

fn run(args: &Args) -> Result<(), Error> {
    let duration = Duration::from_secs(args.time.max(1));
    let system = SystemInfo::collect();
    let cpus = available_cores();
    let threads = thread_counts(cpus);
    let memory_gib = memory_budget(args.gib)?;

    info!(?threads, ?duration, ?memory_gib, "starting suites");

    let mut results = Vec::with_capacity(Suite::ALL.len());

    for suite in Suite::ALL.iter().copied() {
        let gib = match (suite, memory_gib) {
            (Suite::Memory, None) => {
                info!(%suite, "skipping suite, not enough memory");
                continue;
            }
            (_, gib) => gib.unwrap_or(NonZero::<usize>::MIN),
        };

        results.push(run_suite(suite, &threads, cpus, |threads| {
            suite.measure(threads, duration, gib)
        })?);
    }

    let mut out = io::stdout().lock();
    write!(out, "{}", Report::new(system, results))?;
    out.flush()?;

    Ok(())
}

#[cfg_attr(test, mutants::skip)] // Process entry point, covered by the CLI tests.
fn main() -> ExitCode {
    init_logging();

    let args: Args = argh::from_env();

    exit_code(run(&args))
}
