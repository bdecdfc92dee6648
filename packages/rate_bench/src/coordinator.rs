use std::panic;
use std::thread::{self, ScopedJoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::shared::SharedState;
use crate::worker::{WorkerState, worker_entrypoint};
use crate::{ConfigError, Error, Result, TaskOps};

/// The maximum inline size of the shared configuration of a run, in bytes.
///
/// The configuration is copied into the run state before any worker is spawned. Anything larger
/// than a handful of parameters belongs behind an owning pointer such as `Box` or `Arc`.
pub const SHARED_CONFIG_CAPACITY: usize = 256;

/// Executes a task on `worker_count` threads for `duration` and reports the aggregate rate.
///
/// Every worker prepares and warms up its own state, then all workers are released together and
/// call the `run` hook of the task in a loop until `duration` has elapsed. The returned
/// [`RunReport`] carries the number of completed `run` invocations per second, summed over all
/// workers.
///
/// The measurement window starts right before the workers are released and ends when the last
/// worker has left its loop. It is therefore never shorter than `duration` and includes the
/// wake-up latency of the workers plus the final iteration of each, which makes the rate a
/// slight underestimate.
///
/// # Errors
///
/// Returns [`Error::Config`] before any thread is created if `worker_count` is zero, `duration`
/// is zero, the task has no `run` hook or `Config` does not fit in
/// [`SHARED_CONFIG_CAPACITY`] bytes.
///
/// Returns [`Error::Spawn`] if the operating system refuses to create a worker thread.
///
/// # Aborts
///
/// If a `warmup` or `run` hook reports a [`ValidationFailure`](crate::ValidationFailure) or any
/// hook panics, the process is aborted without producing a result.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use rate_bench::{ConfigError, Error, Task};
///
/// let task = Task::new().run(|_| Ok(())).build();
///
/// let result = rate_bench::run(&task, 0, Duration::from_secs(1), ());
/// assert!(matches!(result, Err(Error::Config(ConfigError::ZeroWorkers))));
/// ```
pub fn run<Config, State>(
    task: &TaskOps<'_, Config, State>,
    worker_count: usize,
    duration: Duration,
    config: Config,
) -> Result<RunReport>
where
    Config: Sync,
{
    validate(task, worker_count, duration, size_of::<Config>())?;

    let shared = SharedState::new(task, worker_count, config);

    let mut workers = (0..worker_count).map(WorkerState::new).collect::<Vec<_>>();

    debug!(worker_count, ?duration, "starting benchmark workers");

    let (elapsed, joined) = thread::scope(|s| -> Result<(Duration, usize)> {
        let mut handles = Vec::with_capacity(worker_count);

        for worker in &mut workers {
            let index = worker.index();
            let shared = &shared;

            let spawned = thread::Builder::new()
                .name(format!("rate-bench-{index}"))
                .spawn_scoped(s, move || worker_entrypoint(shared, worker));

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    shared.abandon();
                    join_all(handles);

                    return Err(Error::Spawn { index, source });
                }
            }
        }

        shared.wait_all_ready();

        let start_time = Instant::now();
        shared.release();

        debug!("all workers ready, measurement started");

        thread::sleep(duration);
        shared.raise_stop();
        shared.wait_all_drained();

        let elapsed = start_time.elapsed();

        debug!(?elapsed, "all workers drained, measurement ended");

        Ok((elapsed, join_all(handles)))
    })?;

    let worker_ops = workers
        .iter()
        .map(WorkerState::op_count)
        .collect::<Box<[_]>>();

    let total_ops = worker_ops
        .iter()
        .try_fold(0_u64, |total, ops| total.checked_add(*ops))
        .expect("the sum of u64 iteration counters cannot overflow within a realistic run");

    let report = RunReport {
        rate: calculate_rate(total_ops, elapsed),
        total_ops,
        elapsed,
        requested_duration: duration,
        worker_count: joined,
        worker_ops,
    };

    debug!(
        total_ops,
        rate = report.rate,
        worker_count = report.worker_count,
        "benchmark run complete"
    );

    Ok(report)
}

fn validate<Config, State>(
    task: &TaskOps<'_, Config, State>,
    worker_count: usize,
    duration: Duration,
    config_size: usize,
) -> std::result::Result<(), ConfigError> {
    if worker_count == 0 {
        return Err(ConfigError::ZeroWorkers);
    }

    if !task.has_run() {
        return Err(ConfigError::MissingRunHook);
    }

    if config_size > SHARED_CONFIG_CAPACITY {
        return Err(ConfigError::SharedConfigTooLarge {
            size: config_size,
            capacity: SHARED_CONFIG_CAPACITY,
        });
    }

    if duration.is_zero() {
        return Err(ConfigError::ZeroDuration);
    }

    Ok(())
}

/// Joins every worker thread, returning how many were joined.
fn join_all(handles: Vec<ScopedJoinHandle<'_, ()>>) -> usize {
    let mut joined: usize = 0;

    for handle in handles {
        if let Err(payload) = handle.join() {
            // Workers abort the process instead of unwinding, so this is a bug in the harness
            // itself. Propagate it rather than report a rate built on partial data.
            panic::resume_unwind(payload);
        }

        joined = joined
            .checked_add(1)
            .expect("cannot join more threads than fit in memory");
    }

    joined
}

#[cfg_attr(test, mutants::skip)] // Difficult to simulate time and therefore set expectations.
#[expect(
    clippy::cast_precision_loss,
    reason = "rates are reported with a few significant digits, far below f64 precision"
)]
fn calculate_rate(total_ops: u64, elapsed: Duration) -> f64 {
    total_ops as f64 / elapsed.as_secs_f64()
}

/// The result of a benchmark run.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use rate_bench::Task;
///
/// let task = Task::new().run(|_| Ok(())).build();
/// let report = rate_bench::run(&task, 2, Duration::from_millis(20), ()).unwrap();
///
/// assert_eq!(report.worker_count(), 2);
/// assert_eq!(report.worker_ops().iter().sum::<u64>(), report.total_ops());
/// assert!(report.elapsed() >= report.requested_duration());
/// ```
#[derive(Clone, Debug, PartialEq)]
#[must_use = "the rate is the whole point of executing a benchmark run"]
pub struct RunReport {
    rate: f64,
    total_ops: u64,
    elapsed: Duration,
    requested_duration: Duration,
    worker_count: usize,
    worker_ops: Box<[u64]>,
}

impl RunReport {
    /// Completed `run` invocations per second, summed over all workers.
    ///
    /// For tasks where one invocation processes a fixed number of bytes, multiply by that number
    /// to obtain a bandwidth.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Real timing logic in tests is not desirable.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// The number of completed `run` invocations over all workers, as used for the rate.
    #[must_use]
    pub fn total_ops(&self) -> u64 {
        self.total_ops
    }

    /// The length of the measurement window.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// The duration the run was requested to last.
    #[must_use]
    pub fn requested_duration(&self) -> Duration {
        self.requested_duration
    }

    /// The number of worker threads that were joined after the run.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Completed `run` invocations of each worker, in worker index order.
    #[must_use]
    pub fn worker_ops(&self) -> &[u64] {
        &self.worker_ops
    }
}
