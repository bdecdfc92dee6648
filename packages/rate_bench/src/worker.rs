use std::process;

use tracing::{error, trace};

use crate::shared::SharedState;
use crate::{ValidationFailure, args};

/// The largest amount of memory a single invocation of a `run` hook should touch.
///
/// Workers only observe the stop signal between invocations, so a task scanning a large memory
/// region processes it in chunks of at most this size per invocation. This keeps the overshoot
/// past the end of the measurement window small compared to the window itself.
pub const MAX_CHUNK_BYTES: usize = 32 * 1024 * 1024;

/// Per-worker bookkeeping, owned by the coordinator and lent to exactly one worker thread.
#[derive(Debug)]
pub(crate) struct WorkerState {
    index: usize,

    /// Completed `run` invocations. Only read by the coordinator after the worker is joined.
    op_count: u64,
}

impl WorkerState {
    pub(crate) fn new(index: usize) -> Self {
        Self { index, op_count: 0 }
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn op_count(&self) -> u64 {
        self.op_count
    }
}

/// Executes the full lifecycle of one worker:
/// prepare -> warmup -> ready -> wait for start -> run until stopped -> drained -> cleanup.
#[cfg_attr(test, mutants::skip)] // Mutations here mostly deadlock the coordinator.
pub(crate) fn worker_entrypoint<Config, State>(
    shared: &SharedState<'_, '_, Config, State>,
    worker: &mut WorkerState,
) {
    let index = worker.index;

    // A panicking hook would never report ready or drained, leaving the coordinator waiting
    // forever, and the partial results would be meaningless anyway.
    let _abort_on_panic = scopeguard::guard_on_unwind((), move |()| {
        error!(worker_index = index, "benchmark task panicked, aborting");
        process::abort();
    });

    let task = shared.task();

    trace!(worker_index = index, "preparing");

    let mut state = task.prepare_state(args::Prepare::new(
        index,
        shared.worker_target(),
        shared.config(),
    ));

    if let Some(warmup) = &task.warmup_fn {
        trace!(worker_index = index, "warming up");
        abort_on_failure(index, warmup(&mut state));
    }

    shared.report_ready();
    shared.wait_for_start();

    let run = task
        .run_fn
        .as_ref()
        .expect("tasks without a run hook are rejected before any worker is spawned");

    while !shared.should_stop() {
        abort_on_failure(index, run(&mut state));

        worker.op_count = worker
            .op_count
            .checked_add(1)
            .expect("a u64 iteration counter cannot overflow within a realistic run");
    }

    shared.report_drained();

    trace!(
        worker_index = index,
        op_count = worker.op_count,
        "drained, cleaning up"
    );

    task.cleanup_state(state);
}

#[inline]
fn abort_on_failure(worker_index: usize, result: Result<(), ValidationFailure>) {
    if let Err(failure) = result {
        error!(worker_index, %failure, "benchmark task produced a wrong result, aborting");
        process::abort();
    }
}

#[cfg(test)]
#[cfg(not(miri))] // Real threads and sleeps make these impractical under Miri.
mod tests {
    use std::sync::atomic::{self, AtomicUsize};
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::Task;

    #[test]
    fn new_worker_has_no_ops() {
        let worker = WorkerState::new(7);

        assert_eq!(worker.index(), 7);
        assert_eq!(worker.op_count(), 0);
    }

    #[test]
    fn lifecycle_counts_every_run_invocation() {
        let prepared = AtomicUsize::new(0);
        let warmed_up = AtomicUsize::new(0);
        let runs = AtomicUsize::new(0);
        let cleaned_up = AtomicUsize::new(0);

        let task = Task::with_config::<usize>()
            .prepare(|args| {
                prepared.fetch_add(1, atomic::Ordering::SeqCst);
                *args.config()
            })
            .warmup(|_| {
                warmed_up.fetch_add(1, atomic::Ordering::SeqCst);
                Ok(())
            })
            .run(|_| {
                runs.fetch_add(1, atomic::Ordering::SeqCst);
                Ok(())
            })
            .cleanup(|state| {
                assert_eq!(state, 99);
                cleaned_up.fetch_add(1, atomic::Ordering::SeqCst);
            })
            .build();

        let shared = SharedState::new(&task, 1, 99_usize);
        let mut worker = WorkerState::new(0);

        thread::scope(|s| {
            s.spawn(|| worker_entrypoint(&shared, &mut worker));

            shared.wait_all_ready();
            shared.release();
            thread::sleep(Duration::from_millis(10));
            shared.raise_stop();
            shared.wait_all_drained();
        });

        assert_eq!(prepared.load(atomic::Ordering::SeqCst), 1);
        assert_eq!(warmed_up.load(atomic::Ordering::SeqCst), 1);
        assert_eq!(cleaned_up.load(atomic::Ordering::SeqCst), 1);
        assert_eq!(
            worker.op_count(),
            runs.load(atomic::Ordering::SeqCst) as u64
        );
    }

    #[test]
    fn stop_before_start_skips_measured_loop() {
        let runs = AtomicUsize::new(0);

        let task = Task::new()
            .run(|_| {
                runs.fetch_add(1, atomic::Ordering::SeqCst);
                Ok(())
            })
            .build();

        let shared = SharedState::new(&task, 1, ());
        let mut worker = WorkerState::new(0);

        thread::scope(|s| {
            s.spawn(|| worker_entrypoint(&shared, &mut worker));
            shared.abandon();
        });

        assert_eq!(runs.load(atomic::Ordering::SeqCst), 0);
        assert_eq!(worker.op_count(), 0);
    }
}
