//! Measures the CPU-bound payloads and prints one rate per case.

use std::io;
use std::process::ExitCode;

use argh::FromArgs;
use bench_tasks::CpuCase;
use xbench::{RATE_HEADER, RunOptions, exit_code, init_logging, run_cases};

/// Measures CPU-bound payloads, reporting completed invocations per second.
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

    /// cases to run (PRIME, FIB, XORSHIFT, SORT-I32, SORT-U64, CIRCLE, FPMAT-MUL, FPMAT-CONV,
    /// FPMAT-ADD), all but FPMAT-ADD if omitted
    #[argh(positional)]
    cases: Vec<String>,
}

#[cfg_attr(test, mutants::skip)] // Process entry point, covered by the CLI tests.
fn main() -> ExitCode {
    init_logging();

    let args: Args = argh::from_env();
    let options = RunOptions::from_command_line(args.quiet, args.time, args.threads);

    exit_code(run_cases::<CpuCase, _>(
        RATE_HEADER,
        &args.cases,
        &options,
        &mut io::stdout().lock(),
        |case, options| Ok(case.run(options.threads().get(), options.duration())?.rate()),
    ))
}
