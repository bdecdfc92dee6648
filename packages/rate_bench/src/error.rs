use std::fmt::Display;
use std::io;

use thiserror::Error;

/// Errors that can occur when starting a benchmark run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The run was rejected before any worker thread was created.
    #[error("invalid benchmark configuration: {0}")]
    Config(#[from] ConfigError),

    /// The operating system refused to create a worker thread. Any workers that were already
    /// created have been released without entering the measured loop and joined.
    #[error("failed to spawn worker thread {index}")]
    Spawn {
        /// Index of the worker whose thread could not be created.
        index: usize,

        /// The error reported by the operating system.
        #[source]
        source: io::Error,
    },
}

/// A benchmark run configuration that can never be executed.
///
/// These are always detected before any worker thread is created and are never retried.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum ConfigError {
    /// At least one worker is required.
    #[error("worker count must be at least 1")]
    ZeroWorkers,

    /// The task was built without the mandatory `run` hook.
    #[error("task has no run hook")]
    MissingRunHook,

    /// The shared configuration is stored inline in the run state and must fit in
    /// [`SHARED_CONFIG_CAPACITY`](crate::SHARED_CONFIG_CAPACITY) bytes.
    #[error(
        "shared configuration occupies {size} bytes, exceeding the capacity of {capacity} bytes"
    )]
    SharedConfigTooLarge {
        /// Inline size of the configuration type, in bytes.
        size: usize,

        /// The maximum permitted inline size, in bytes.
        capacity: usize,
    },

    /// The measurement window must not be empty.
    #[error("measurement duration must be greater than zero")]
    ZeroDuration,
}

/// A task detected that it produced a wrong result.
///
/// Returned from the `warmup` and `run` hooks. There is no recovery from this - the worker that
/// observes it logs the failure and aborts the process, because every rate measured after a
/// wrong result would be meaningless.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("task self-check failed: {message}")]
pub struct ValidationFailure {
    message: String,
}

impl ValidationFailure {
    /// Creates a validation failure with a human-readable description of what went wrong.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Compares a computed value against the value it is known to have.
    ///
    /// # Examples
    ///
    /// ```
    /// use rate_bench::ValidationFailure;
    ///
    /// assert!(ValidationFailure::check_eq("2 + 2", 4, 2 + 2).is_ok());
    ///
    /// let failure = ValidationFailure::check_eq("2 + 2", 5, 2 + 2).unwrap_err();
    /// assert_eq!(failure.message(), "2 + 2 != 5 (got 4)");
    /// ```
    pub fn check_eq<T>(what: &str, expected: T, actual: T) -> std::result::Result<(), Self>
    where
        T: PartialEq + Display,
    {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::new(format!("{what} != {expected} (got {actual})")))
        }
    }

    /// The description of what went wrong.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A specialized `Result` type for benchmark runs, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);
    assert_impl_all!(ConfigError: Send, Sync, Debug);
    assert_impl_all!(ValidationFailure: Send, Sync, Debug);

    #[test]
    fn config_error_converts_into_error() {
        let error: Error = ConfigError::ZeroWorkers.into();

        assert!(matches!(error, Error::Config(ConfigError::ZeroWorkers)));
        assert_eq!(
            error.to_string(),
            "invalid benchmark configuration: worker count must be at least 1"
        );
    }

    #[test]
    fn oversized_config_message_names_both_sizes() {
        let error = ConfigError::SharedConfigTooLarge {
            size: 512,
            capacity: 256,
        };

        assert_eq!(
            error.to_string(),
            "shared configuration occupies 512 bytes, exceeding the capacity of 256 bytes"
        );
    }

    #[test]
    fn check_eq_accepts_matching_values() {
        assert_eq!(ValidationFailure::check_eq("answer", 42, 42), Ok(()));
    }

    #[test]
    fn check_eq_describes_mismatch() {
        let failure = ValidationFailure::check_eq("prime_count(100)", 25_u32, 24).unwrap_err();

        assert_eq!(failure.message(), "prime_count(100) != 25 (got 24)");
        assert_eq!(
            failure.to_string(),
            "task self-check failed: prime_count(100) != 25 (got 24)"
        );
    }

    #[test]
    fn check_eq_composes_with_question_mark() {
        fn check_both(first: u32, second: u32) -> std::result::Result<(), ValidationFailure> {
            ValidationFailure::check_eq("first", 1, first)?;
            ValidationFailure::check_eq("second", 2, second)
        }

        assert_eq!(check_both(1, 2), Ok(()));
        assert_eq!(
            check_both(1, 3).unwrap_err().message(),
            "second != 2 (got 3)"
        );
        assert_eq!(
            check_both(0, 2).unwrap_err().message(),
            "first != 1 (got 0)"
        );
    }
}
