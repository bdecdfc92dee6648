use thiserror::Error;

/// Errors that can occur when selecting or executing a benchmark payload.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No case of the suite has the given name.
    #[error("unknown test case: {name}")]
    UnknownCase {
        /// The name as it was provided by the caller.
        name: String,
    },

    /// The memory budget cannot give every worker a usable region.
    #[error(
        "{total_bytes} bytes of memory cannot be split into regions of at least {min_region_bytes} bytes for {workers} workers"
    )]
    RegionTooSmall {
        /// The total memory budget of the run.
        total_bytes: usize,

        /// The number of workers the budget was to be split between.
        workers: usize,

        /// The smallest region a single worker can scan.
        min_region_bytes: usize,
    },

    /// The harness rejected the run or could not execute it.
    #[error(transparent)]
    Run(#[from] rate_bench::Error),
}

/// A specialized `Result` type for payload operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn unknown_case_names_the_case() {
        let error = Error::UnknownCase {
            name: "QUICKSORT".to_string(),
        };

        assert_eq!(error.to_string(), "unknown test case: QUICKSORT");
    }

    #[test]
    fn run_error_is_transparent() {
        let error: Error =
            rate_bench::Error::from(rate_bench::ConfigError::ZeroWorkers).into();

        assert_eq!(
            error.to_string(),
            "invalid benchmark configuration: worker count must be at least 1"
        );
    }
}
