//! Measures the cryptographic digest payloads and prints one rate per case.

use std::io;
use std::process::ExitCode;

use argh::FromArgs;
use bench_tasks::HashCase;
use xbench::{OPS_RATE_HEADER, RunOptions, exit_code, init_logging, run_cases};

/// Measures digests of 8 KiB blocks, reporting hashed blocks per second.
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

    /// cases to run (MD5-8K, SM3-8K, SHA1-8K, SHA256-8K, SHA512-8K), all if omitted
    #[argh(positional)]
    cases: Vec<String>,
}

#[cfg_attr(test, mutants::skip)] // Process entry point, covered by the CLI tests.
fn main() -> ExitCode {
    init_logging();

    let args: Args = argh::from_env();
    let options = RunOptions::from_command_line(args.quiet, args.time, args.threads);

    exit_code(run_cases::<HashCase, _>(
        OPS_RATE_HEADER,
        &args.cases,
        &options,
        &mut io::stdout().lock(),
        |case, options| Ok(case.run(options.threads().get(), options.duration())?.rate()),
    ))
}
