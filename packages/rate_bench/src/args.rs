//! Argument wrappers passed to task hooks.

/// Arguments provided to the `prepare` hook of a task.
///
/// The hook runs once on every worker thread, before measurement starts, and returns the
/// private state that the other hooks of the same worker operate on.
#[derive(Debug)]
pub struct Prepare<'a, Config> {
    worker_index: usize,
    worker_count: usize,
    config: &'a Config,
}

impl<'a, Config> Prepare<'a, Config> {
    pub(crate) fn new(worker_index: usize, worker_count: usize, config: &'a Config) -> Self {
        Self {
            worker_index,
            worker_count,
            config,
        }
    }

    /// The 0-based index of the worker being prepared. Stable for the duration of the run.
    #[must_use]
    pub fn worker_index(&self) -> usize {
        self.worker_index
    }

    /// How many workers participate in the run.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// The shared configuration the run was started with.
    #[must_use]
    pub fn config(&self) -> &'a Config {
        self.config
    }
}
