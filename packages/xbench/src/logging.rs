use std::io;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Installs a log subscriber that writes to standard error.
///
/// Standard output is reserved for results. The filter is read from `RUST_LOG` and defaults to
/// warnings and errors only.
#[cfg_attr(test, mutants::skip)] // Global side effect, only observable through process output.
pub fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    // A subscriber may already be installed if a test harness calls this more than once.
    _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}
