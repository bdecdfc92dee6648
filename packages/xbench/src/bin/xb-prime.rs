//! Measures prime counting up to 100 000 and prints the rate.

use std::io::{self, Write};
use std::process::ExitCode;

use argh::FromArgs;
use bench_tasks::{STANDALONE_PRIME_LIMIT, standalone_prime_task};
use xbench::{Error, RunOptions, exit_code, init_logging};

/// Measures how often the primes up to 100 000 can be counted per second.
#[derive(FromArgs)]
struct Args {
    /// print only the rate
    #[argh(switch, short = 'q')]
    quiet: bool,

    /// seconds to measure (0 means 10)
    #[argh(option, short = 't', default = "0")]
    time: u64,

    /// number of worker threads (0 means 1)
    #[argh(option, short = 'T', default = "0")]
    threads: usize,
}

fn run(args: &Args) -> Result<(), Error> {
    let options = RunOptions::from_command_line(args.quiet, args.time, args.threads);

    let report = rate_bench::run(
        &standalone_prime_task(),
        options.threads().get(),
        options.duration(),
        (),
    )?;

    let rate = report.rate();
    let mut out = io::stdout().lock();

    if options.quiet() {
        writeln!(out, "{rate:.1}")?;
    } else {
        writeln!(out, "prime_count({STANDALONE_PRIME_LIMIT}) run {rate:.1} ops/s")?;
    }

    Ok(())
}

#[cfg_attr(test, mutants::skip)] // Process entry point, covered by the CLI tests.
fn main() -> ExitCode {
    init_logging();

    let args: Args = argh::from_env();

    exit_code(run(&args))
}
