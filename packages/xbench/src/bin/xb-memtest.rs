//! Measures memory bandwidth and prints one rate in MiB/s per case.

use std::io;
use std::num::NonZero;
use std::process::ExitCode;

use argh::FromArgs;
use bench_tasks::{MemCase, MemoryPlan};
use new_zealand::nz;
use xbench::{
    Error, RATE_HEADER, RunOptions, exit_code, gib_to_bytes, init_logging, run_cases,
};

const DEFAULT_GIB: NonZero<usize> = nz!(8);

/// Measures memory bandwidth over a region shared out among the workers, reporting MiB/s.
#[derive(FromArgs)]
struct Args {
    /// print only the result rows
    #[argh(switch, short = 'q')]
    quiet: bool,

    /// seconds to measure each case (0 means 10)
    #[argh(option, short = 't', default = "0")]
    time: u64,

    /// number of worker threads (0 means 1)
    #[argh(option, short = 'T', default = "0")]
    threads: usize,

    /// total memory to scan in GiB, divided evenly among the workers (0 means 8)
    #[argh(option, short = 'G', default = "0")]
    gib: usize,

    /// fill memory with zeros instead of a non-zero pattern
    #[argh(switch)]
    zero_magic: bool,

    /// cases to run (COPY, STORE, LOAD, MEMSET, MEMCPY), all if omitted
    #[argh(positional)]
    cases: Vec<String>,
}

fn run(args: &Args) -> Result<(), Error> {
    let options = RunOptions::from_command_line(args.quiet, args.time, args.threads);
    let gib = NonZero::new(args.gib).unwrap_or(DEFAULT_GIB);
    let magic_fill = !args.zero_magic;

    let plan = MemoryPlan::new(gib_to_bytes(gib)?, options.threads().get(), magic_fill)?;

    let header = format!(
        "MAGIC_NOT_ZERO={} test_gb={gib}\n{RATE_HEADER}",
        u8::from(magic_fill)
    );

    run_cases::<MemCase, _>(
        &header,
        &args.cases,
        &options,
        &mut io::stdout().lock(),
        |case, options| {
            let report = case.run(plan, options.duration())?;
            Ok(plan.mib_per_second(&report))
        },
    )
}

#[cfg_attr(test, mutants::skip)] // Process entry point, covered by the CLI tests.
fn main() -> ExitCode {
    init_logging();

    let args: Args = argh::from_env();

    exit_code(run(&args))
}
