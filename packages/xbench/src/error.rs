use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use thiserror::Error;

/// Errors that end a driver program with a failure exit code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A case name given on the command line does not belong to the suite.
    #[error("Unknown test case: {name}")]
    UnknownCase {
        /// The name as it was given.
        name: String,
    },

    /// The requested memory budget cannot be represented on this platform.
    #[error("a memory budget of {gib} GiB exceeds the address space")]
    MemoryBudget {
        /// The requested budget in GiB.
        gib: usize,
    },

    /// A payload could not be executed.
    #[error(transparent)]
    Bench(bench_tasks::Error),

    /// A system description file exists but could not be read.
    #[error("failed to read {}", path.display())]
    SystemFile {
        /// The file that could not be read.
        path: PathBuf,

        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The results could not be written to standard output.
    #[error("failed to write results")]
    Output(#[from] io::Error),
}

impl From<bench_tasks::Error> for Error {
    fn from(error: bench_tasks::Error) -> Self {
        match error {
            bench_tasks::Error::UnknownCase { name } => Self::UnknownCase { name },
            other => Self::Bench(other),
        }
    }
}

impl From<rate_bench::Error> for Error {
    fn from(error: rate_bench::Error) -> Self {
        Self::Bench(error.into())
    }
}

/// A specialized `Result` type for driver operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

/// Reports the outcome of a driver program on standard error and converts it into the exit
/// code of the process.
///
/// Unknown case names are reported verbatim, every other error with an `Error:` prefix.
#[cfg_attr(test, mutants::skip)] // Only observable through the output of a process.
#[must_use]
pub fn exit_code(result: std::result::Result<(), Error>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ Error::UnknownCase { .. }) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn unknown_case_keeps_its_own_message() {
        let error: Error = bench_tasks::Error::UnknownCase {
            name: "BOGUS".to_string(),
        }
        .into();

        assert!(matches!(&error, Error::UnknownCase { name } if name == "BOGUS"));
        assert_eq!(error.to_string(), "Unknown test case: BOGUS");
    }

    #[test]
    fn harness_error_is_wrapped() {
        let error: Error = rate_bench::Error::from(rate_bench::ConfigError::ZeroDuration).into();

        assert!(matches!(error, Error::Bench(_)));
        assert_eq!(
            error.to_string(),
            "invalid benchmark configuration: measurement duration must be greater than zero"
        );
    }

    #[test]
    fn system_file_names_the_path() {
        let error = Error::SystemFile {
            path: PathBuf::from("/proc/meminfo"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };

        assert_eq!(error.to_string(), "failed to read /proc/meminfo");
    }
}
