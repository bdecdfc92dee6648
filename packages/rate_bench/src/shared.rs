use std::sync::atomic::{self, AtomicBool};

use parking_lot::{Condvar, Mutex};

use crate::TaskOps;

/// State of one benchmark run that is visible to the coordinator and every worker.
///
/// Created before any worker exists and borrowed by all of them; it never outlives the run.
#[derive(derive_more::Debug)]
pub(crate) struct SharedState<'t, 'a, Config, State> {
    #[debug(ignore)]
    task: &'t TaskOps<'a, Config, State>,

    worker_target: usize,

    phase: Mutex<Phase>,

    /// Ready and drained notifications, both waited on by the coordinator.
    worker_to_coordinator: Condvar,

    /// Start notification, waited on by the workers.
    coordinator_to_worker: Condvar,

    /// Polled by the workers between iterations without taking the lock.
    stop: AtomicBool,

    #[debug(ignore)]
    config: Config,
}

#[derive(Debug, Default)]
struct Phase {
    /// Workers that have finished warmup. After the start signal this counts the workers that
    /// have not yet drained.
    ready_count: usize,

    start: bool,
}

impl<'t, 'a, Config, State> SharedState<'t, 'a, Config, State> {
    pub(crate) fn new(
        task: &'t TaskOps<'a, Config, State>,
        worker_target: usize,
        config: Config,
    ) -> Self {
        Self {
            task,
            worker_target,
            phase: Mutex::new(Phase::default()),
            worker_to_coordinator: Condvar::new(),
            coordinator_to_worker: Condvar::new(),
            stop: AtomicBool::new(false),
            config,
        }
    }

    pub(crate) fn task(&self) -> &'t TaskOps<'a, Config, State> {
        self.task
    }

    pub(crate) fn worker_target(&self) -> usize {
        self.worker_target
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    /// Called by a worker once its warmup is complete.
    pub(crate) fn report_ready(&self) {
        let mut phase = self.phase.lock();

        phase.ready_count = phase
            .ready_count
            .checked_add(1)
            .expect("ready count is bounded by the worker target");

        debug_assert!(phase.ready_count <= self.worker_target);

        if phase.ready_count == self.worker_target {
            self.worker_to_coordinator.notify_one();
        }
    }

    /// Blocks a worker until the coordinator releases all workers.
    pub(crate) fn wait_for_start(&self) {
        let mut phase = self.phase.lock();

        while !phase.start {
            self.coordinator_to_worker.wait(&mut phase);
        }
    }

    /// Checked by workers between iterations.
    ///
    /// A relaxed load is enough: the flag carries no data, and observing it one iteration late
    /// only extends the overshoot that the measurement window already accounts for.
    #[inline]
    pub(crate) fn should_stop(&self) -> bool {
        self.stop.load(atomic::Ordering::Relaxed)
    }

    /// Called by a worker after it has left the measured loop.
    pub(crate) fn report_drained(&self) {
        let mut phase = self.phase.lock();

        phase.ready_count = phase
            .ready_count
            .checked_sub(1)
            .expect("every drained worker was previously counted as ready");

        if phase.ready_count == 0 {
            self.worker_to_coordinator.notify_one();
        }
    }

    /// Blocks the coordinator until every worker has finished warmup.
    pub(crate) fn wait_all_ready(&self) {
        let mut phase = self.phase.lock();

        while phase.ready_count != self.worker_target {
            self.worker_to_coordinator.wait(&mut phase);
        }
    }

    /// Releases all workers waiting for the start signal.
    pub(crate) fn release(&self) {
        let mut phase = self.phase.lock();

        debug_assert!(!phase.start, "start signal is raised at most once per run");

        phase.start = true;
        self.coordinator_to_worker.notify_all();
    }

    /// Ends the measured loop of every worker.
    pub(crate) fn raise_stop(&self) {
        self.stop.store(true, atomic::Ordering::Release);
    }

    /// Blocks the coordinator until every released worker has left the measured loop.
    pub(crate) fn wait_all_drained(&self) {
        let mut phase = self.phase.lock();

        while phase.ready_count != 0 {
            self.worker_to_coordinator.wait(&mut phase);
        }
    }

    /// Lets every worker that was already spawned run to completion without entering the
    /// measured loop. Used when the run cannot proceed after some workers exist.
    pub(crate) fn abandon(&self) {
        self.raise_stop();

        let mut phase = self.phase.lock();

        phase.start = true;
        self.coordinator_to_worker.notify_all();
    }
}
