//! Intermediate stages of configuring a benchmark task.
//!
//! You generally do not need to reference these types, they are just parts of a call chain.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::task::{CheckedFn, CleanupFn, StateSource};
use crate::{TaskOps, ValidationFailure, args};

/// The first stage of configuring a task, with the per-worker state type not yet known.
#[derive(Debug)]
#[must_use]
pub struct TaskInitial<Config> {
    _config: PhantomData<fn(&Config)>,
}

/// The second stage of configuring a task, with the per-worker state type known.
#[derive(derive_more::Debug)]
#[must_use]
pub struct TaskBuilder<'a, Config, State> {
    #[debug(ignore)]
    state_source: StateSource<'a, Config, State>,

    #[debug(ignore)]
    warmup_fn: Option<CheckedFn<'a, State>>,

    #[debug(ignore)]
    run_fn: Option<CheckedFn<'a, State>>,

    #[debug(ignore)]
    cleanup_fn: Option<CleanupFn<'a, State>>,
}

impl<Config> TaskInitial<Config> {
    pub(crate) fn new() -> Self {
        Self {
            _config: PhantomData,
        }
    }

    /// Sets the hook used to create the private state of each worker.
    ///
    /// The hook runs once on every worker thread before measurement starts and receives the
    /// shared configuration of the run. The returned state is passed by exclusive reference to
    /// the `warmup` and `run` hooks of the same worker and finally by value to `cleanup`.
    ///
    /// **Builder Order**: This method can only be called on [`TaskInitial`]. After calling this,
    /// you must use methods from [`TaskBuilder`] for subsequent configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use rate_bench::Task;
    ///
    /// let task = Task::new()
    ///     .prepare(|args| vec![args.worker_index(); 16])
    ///     .run(|values| {
    ///         values.reverse();
    ///         Ok(())
    ///     })
    ///     .build();
    ///
    /// assert!(task.has_prepare());
    /// ```
    #[cfg_attr(test, mutants::skip)] // All mutations are unviable - skip them to save time.
    pub fn prepare<'a, F, State>(self, f: F) -> TaskBuilder<'a, Config, State>
    where
        F: Fn(args::Prepare<'_, Config>) -> State + Send + Sync + 'a,
    {
        TaskBuilder {
            state_source: StateSource::Prepare(Box::new(f)),
            warmup_fn: None,
            run_fn: None,
            cleanup_fn: None,
        }
    }

    /// Sets the `warmup` hook of a task without private state.
    ///
    /// See [`TaskBuilder::warmup()`].
    pub fn warmup<'a, F>(self, f: F) -> TaskBuilder<'a, Config, ()>
    where
        F: Fn(&mut ()) -> Result<(), ValidationFailure> + Send + Sync + 'a,
    {
        self.stateless().warmup(f)
    }

    /// Sets the `run` hook of a task without private state.
    ///
    /// See [`TaskBuilder::run()`].
    pub fn run<'a, F>(self, f: F) -> TaskBuilder<'a, Config, ()>
    where
        F: Fn(&mut ()) -> Result<(), ValidationFailure> + Send + Sync + 'a,
    {
        self.stateless().run(f)
    }

    /// Sets both the `warmup` and `run` hooks of a task without private state to the same logic.
    ///
    /// See [`TaskBuilder::run_with_warmup()`].
    pub fn run_with_warmup<'a, F>(self, f: F) -> TaskBuilder<'a, Config, ()>
    where
        F: Fn(&mut ()) -> Result<(), ValidationFailure> + Send + Sync + 'a,
    {
        self.stateless().run_with_warmup(f)
    }

    /// Finishes configuring a task that has no hooks at all.
    ///
    /// Such a task cannot be executed - it is rejected because it has no `run` hook.
    pub fn build<'a>(self) -> TaskOps<'a, Config, ()> {
        self.stateless().build()
    }

    fn stateless<'a>(self) -> TaskBuilder<'a, Config, ()> {
        TaskBuilder {
            state_source: StateSource::Empty(|| ()),
            warmup_fn: None,
            run_fn: None,
            cleanup_fn: None,
        }
    }
}

impl<'a, Config, State> TaskBuilder<'a, Config, State> {
    /// Sets the hook executed once by every worker after `prepare` and before measurement.
    ///
    /// The warmup invocation is not counted. Conventionally it performs the same work as `run`,
    /// warming up caches and validating the task output before any iteration is measured.
    #[cfg_attr(test, mutants::skip)] // All mutations are unviable - skip them to save time.
    pub fn warmup<F>(self, f: F) -> Self
    where
        F: Fn(&mut State) -> Result<(), ValidationFailure> + Send + Sync + 'a,
    {
        Self {
            warmup_fn: Some(Box::new(f)),
            ..self
        }
    }

    /// Sets the hook that performs one measured unit of work.
    ///
    /// The hook is executed in a loop until the run ends and every completed invocation is
    /// counted. It must verify its own result where possible, returning a
    /// [`ValidationFailure`] instead of silently producing a wrong answer.
    ///
    /// A single invocation should stay short (at most [`MAX_CHUNK_BYTES`](crate::MAX_CHUNK_BYTES)
    /// of memory traffic or equivalent), as the stop signal is only observed between
    /// invocations.
    #[cfg_attr(test, mutants::skip)] // All mutations are unviable - skip them to save time.
    pub fn run<F>(self, f: F) -> Self
    where
        F: Fn(&mut State) -> Result<(), ValidationFailure> + Send + Sync + 'a,
    {
        Self {
            run_fn: Some(Box::new(f)),
            ..self
        }
    }

    /// Sets both the `warmup` and `run` hooks to the same logic.
    ///
    /// # Examples
    ///
    /// ```
    /// use rate_bench::Task;
    ///
    /// let task = Task::new()
    ///     .prepare(|_| 0_u64)
    ///     .run_with_warmup(|counter| {
    ///         *counter = counter.wrapping_add(1);
    ///         Ok(())
    ///     })
    ///     .build();
    ///
    /// assert!(task.has_warmup());
    /// assert!(task.has_run());
    /// ```
    #[cfg_attr(test, mutants::skip)] // All mutations are unviable - skip them to save time.
    pub fn run_with_warmup<F>(self, f: F) -> Self
    where
        F: Fn(&mut State) -> Result<(), ValidationFailure> + Send + Sync + 'a,
    {
        let f = Arc::new(f);

        let warmup_fn: CheckedFn<'a, State> = Box::new({
            let f = Arc::clone(&f);
            move |state: &mut State| (*f)(state)
        });
        let run_fn: CheckedFn<'a, State> = Box::new(move |state: &mut State| (*f)(state));

        Self {
            warmup_fn: Some(warmup_fn),
            run_fn: Some(run_fn),
            ..self
        }
    }

    /// Sets the hook that consumes the private state of each worker after measurement.
    ///
    /// If no cleanup hook is set, the state is dropped at the same point instead.
    #[cfg_attr(test, mutants::skip)] // All mutations are unviable - skip them to save time.
    pub fn cleanup<F>(self, f: F) -> Self
    where
        F: Fn(State) + Send + Sync + 'a,
    {
        Self {
            cleanup_fn: Some(Box::new(f)),
            ..self
        }
    }

    /// Finishes configuring the task.
    ///
    /// This does not check that the mandatory `run` hook was set - that happens when the task
    /// is executed, before any worker thread is created.
    pub fn build(self) -> TaskOps<'a, Config, State> {
        TaskOps {
            state_source: self.state_source,
            warmup_fn: self.warmup_fn,
            run_fn: self.run_fn,
            cleanup_fn: self.cleanup_fn,
        }
    }
}
