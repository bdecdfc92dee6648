#![allow(
    clippy::type_complexity,
    reason = "hook slots are boxed closures with long signatures"
)]

use std::marker::PhantomData;

use crate::configure::TaskInitial;
use crate::{ValidationFailure, args};

pub(crate) type PrepareFn<'a, Config, State> =
    Box<dyn Fn(args::Prepare<'_, Config>) -> State + Send + Sync + 'a>;

pub(crate) type CheckedFn<'a, State> =
    Box<dyn Fn(&mut State) -> Result<(), ValidationFailure> + Send + Sync + 'a>;

pub(crate) type CleanupFn<'a, State> = Box<dyn Fn(State) + Send + Sync + 'a>;

/// Entry point for describing the unit of work that a benchmark run measures.
///
/// A task is defined by up to four lifecycle hooks, executed by every worker thread:
///
/// 1. **prepare** (optional): creates the private per-worker state, e.g. allocates buffers.
///    Receives the shared configuration of the run. Without it, the state is `()`.
/// 2. **warmup** (optional): executed once before measurement. Conventionally the same logic as
///    `run`, so it doubles as a correctness self-check.
/// 3. **run** (required): one measured unit of work. Executed in a loop until the run ends.
///    Long-running bodies must split themselves into chunks (see
///    [`MAX_CHUNK_BYTES`](crate::MAX_CHUNK_BYTES)) so the stop signal is observed promptly.
/// 4. **cleanup** (optional): consumes the private state after measurement. Without it, the
///    state is simply dropped.
///
/// # Examples
///
/// ```
/// use rate_bench::{Task, ValidationFailure};
///
/// fn triangle(n: u64) -> u64 {
///     (1..=n).sum()
/// }
///
/// let task = Task::new()
///     .run_with_warmup(|_| ValidationFailure::check_eq("triangle(100)", 5050, triangle(100)))
///     .build();
///
/// assert!(task.has_run());
/// assert!(task.has_warmup());
/// assert!(!task.has_prepare());
/// ```
#[derive(Debug)]
pub struct Task {
    _no_construct: PhantomData<()>,
}

impl Task {
    /// Starts configuring a task that does not use any shared configuration.
    ///
    /// The type uses a fluent API with enforced ordering: the `prepare` hook, which decides the
    /// type of the per-worker state, can only be set first. The remaining hooks may be set in
    /// any order before calling `build()`.
    #[expect(
        clippy::new_ret_no_self,
        reason = "builder-style configuration pattern, intentional"
    )]
    pub fn new() -> TaskInitial<()> {
        TaskInitial::new()
    }

    /// Starts configuring a task whose `prepare` hook reads a shared configuration of type
    /// `Config`, supplied when the run is started.
    ///
    /// # Examples
    ///
    /// ```
    /// use rate_bench::Task;
    ///
    /// struct BufferConfig {
    ///     len: usize,
    /// }
    ///
    /// let task = Task::with_config::<BufferConfig>()
    ///     .prepare(|args| vec![0_u8; args.config().len])
    ///     .run(|buffer| {
    ///         buffer.fill(0xAA);
    ///         Ok(())
    ///     })
    ///     .build();
    ///
    /// assert!(task.has_prepare());
    /// ```
    pub fn with_config<Config>() -> TaskInitial<Config> {
        TaskInitial::new()
    }
}

/// How the private state of a worker comes into existence.
pub(crate) enum StateSource<'a, Config, State> {
    Prepare(PrepareFn<'a, Config, State>),

    /// No `prepare` hook was set; the state is produced without invoking any task code.
    Empty(fn() -> State),
}

/// A fully configured task, ready to be executed by [`run()`](crate::run).
///
/// Holds one slot per lifecycle hook. Only the slots that were set are ever invoked.
#[derive(derive_more::Debug)]
#[must_use]
pub struct TaskOps<'a, Config, State> {
    #[debug(ignore)]
    pub(crate) state_source: StateSource<'a, Config, State>,

    #[debug(ignore)]
    pub(crate) warmup_fn: Option<CheckedFn<'a, State>>,

    #[debug(ignore)]
    pub(crate) run_fn: Option<CheckedFn<'a, State>>,

    #[debug(ignore)]
    pub(crate) cleanup_fn: Option<CleanupFn<'a, State>>,
}

impl<Config, State> TaskOps<'_, Config, State> {
    /// Whether the task has a `prepare` hook.
    #[must_use]
    pub fn has_prepare(&self) -> bool {
        matches!(self.state_source, StateSource::Prepare(_))
    }

    /// Whether the task has a `warmup` hook.
    #[must_use]
    pub fn has_warmup(&self) -> bool {
        self.warmup_fn.is_some()
    }

    /// Whether the task has a `run` hook. A task without one is rejected when executed.
    #[must_use]
    pub fn has_run(&self) -> bool {
        self.run_fn.is_some()
    }

    /// Whether the task has a `cleanup` hook.
    #[must_use]
    pub fn has_cleanup(&self) -> bool {
        self.cleanup_fn.is_some()
    }

    pub(crate) fn prepare_state(&self, args: args::Prepare<'_, Config>) -> State {
        match &self.state_source {
            StateSource::Prepare(f) => f(args),
            StateSource::Empty(make) => make(),
        }
    }

    pub(crate) fn cleanup_state(&self, state: State) {
        match &self.cleanup_fn {
            Some(f) => f(state),
            None => drop(state),
        }
    }
}
