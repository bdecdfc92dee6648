use std::io::Write;

use bench_tasks::BenchCase;
use tracing::info;

use crate::{Result, RunOptions};

/// Table header of drivers that report a rate in their own unit.
pub const RATE_HEADER: &str = "TEST                Rate";

/// Table header of drivers that report operations per second.
pub const OPS_RATE_HEADER: &str = "TEST                Rate(ops/s)";

const NAME_WIDTH: usize = 20;

/// Formats one result row: the case name left-aligned in a 20 character column, followed by
/// the rate with two decimals.
///
/// # Examples
///
/// ```
/// assert_eq!(xbench::format_row("FIB", 1234.5678), "FIB                 1234.57");
/// ```
#[must_use]
pub fn format_row(name: &str, rate: f64) -> String {
    format!("{name:<NAME_WIDTH$}{rate:.2}")
}

/// Runs the named cases of a suite one after another and writes a result table to `out`.
///
/// Every name is resolved before the first case starts, so a typo fails fast. Without names,
/// the default cases of the suite are executed. `measure` runs one case with the given options
/// and returns the rate to report.
///
/// # Errors
///
/// Returns [`Error::UnknownCase`](crate::Error::UnknownCase) if a name does not belong to the
/// suite, any error `measure` returns and [`Error::Output`](crate::Error::Output) if writing to
/// `out` fails.
pub fn run_cases<C, M>(
    header: &str,
    names: &[String],
    options: &RunOptions,
    out: &mut impl Write,
    mut measure: M,
) -> Result<()>
where
    C: BenchCase,
    M: FnMut(C, &RunOptions) -> Result<f64>,
{
    let cases = C::select(names)?;

    if !options.quiet() {
        writeln!(out, "{header}")?;
    }

    for case in cases {
        let rate = measure(case, options)?;

        info!(%case, rate, threads = options.threads().get(), "case complete");

        writeln!(out, "{}", format_row(case.name(), rate))?;
        out.flush()?;
    }

    Ok(())
}
