use std::num::NonZero;
use std::time::Duration;

use new_zealand::nz;

/// Measurement duration of each case when none is given.
pub const DEFAULT_DURATION: Duration = Duration::from_secs(10);

/// Worker thread count when none is given.
pub const DEFAULT_THREADS: NonZero<usize> = nz!(1);

/// Run parameters shared by every single-suite driver.
///
/// Zero is not a meaningful duration or thread count, so the command line uses it to mean
/// "use the default" and this type only ever holds usable values.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use xbench::RunOptions;
///
/// let options = RunOptions::from_command_line(true, 0, 4);
///
/// assert!(options.quiet());
/// assert_eq!(options.duration(), Duration::from_secs(10));
/// assert_eq!(options.threads().get(), 4);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RunOptions {
    quiet: bool,
    duration: Duration,
    threads: NonZero<usize>,
}

impl RunOptions {
    /// Interprets the raw command line values, substituting defaults for zero.
    #[must_use]
    pub fn from_command_line(quiet: bool, seconds: u64, threads: usize) -> Self {
        let duration = if seconds == 0 {
            DEFAULT_DURATION
        } else {
            Duration::from_secs(seconds)
        };

        Self {
            quiet,
            duration,
            threads: NonZero::new(threads).unwrap_or(DEFAULT_THREADS),
        }
    }

    /// Whether only the result rows are printed.
    #[must_use]
    pub fn quiet(&self) -> bool {
        self.quiet
    }

    /// How long each case is measured.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// How many worker threads execute each case.
    #[must_use]
    pub fn threads(&self) -> NonZero<usize> {
        self.threads
    }
}
