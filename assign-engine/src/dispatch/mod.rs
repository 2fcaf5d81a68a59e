//! Path search dispatcher.
//!
//! Distributes per-passenger search tasks over a pool of persistent workers
//! and collects their results. With one worker (or one task worth of work)
//! everything runs sequentially in the caller; otherwise each worker thread
//! owns a private, independently-initialized copy of the search capability
//! and the pool communicates over exactly two channels: task submission in,
//! results out. Tasks are terminated by one shutdown sentinel per worker.
//!
//! Result order is unconstrained. A worker that dies without completing its
//! current task loses exactly that task: it is reported as not-found for the
//! iteration and never reassigned.

mod worker;

use std::collections::HashMap;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

use crate::domain::{PathOption, PersonId, TripListId};
use crate::search::{
    BumpWaitEntry, CapabilityFactory, SearchCapability, SearchCounters, SearchError, SearchTask,
    decode_pathset,
};

/// Message on the task channel: work, or the no-more-work sentinel.
enum TaskMessage {
    Task(SearchTask),
    Shutdown,
}

/// Message on the result channel.
enum WorkerReport {
    /// A worker picked up a task. Lets the dispatcher attribute a crash to
    /// the task that died with it.
    Started {
        worker: usize,
        person: PersonId,
        trip_list: TripListId,
    },
    Completed {
        worker: usize,
        trip_list: TripListId,
        paths: Vec<PathOption>,
        counters: SearchCounters,
    },
    /// The capability failed on one task; the worker terminates after this.
    Failed {
        worker: usize,
        trip_list: TripListId,
        error: SearchError,
    },
    /// Clean shutdown after the sentinel.
    Finished { worker: usize },
}

/// What one round of dispatching produced.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    /// Decoded candidate paths per searched request.
    pub pathsets: HashMap<TripListId, Vec<PathOption>>,
    /// Search performance counters per completed request.
    pub counters: Vec<(TripListId, SearchCounters)>,
    /// Requests whose search reported an error.
    pub failed: Vec<TripListId>,
    /// Requests lost to worker crashes, or never picked up because every
    /// worker died first.
    pub lost: Vec<TripListId>,
}

impl DispatchOutcome {
    /// Requests with no usable pathset this iteration, for any reason.
    pub fn not_found(&self) -> impl Iterator<Item = TripListId> + '_ {
        self.failed.iter().chain(self.lost.iter()).copied()
    }
}

struct WorkerState {
    working_on: Option<(PersonId, TripListId)>,
    exited_cleanly: bool,
    accounted: bool,
}

/// Fans search tasks out to workers and fans results back in.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    /// Configured worker count; 0 means host parallelism.
    workers: usize,
    /// Bounded wait on the result channel; an empty read within this window
    /// just means "not ready yet".
    poll_interval: Duration,
    reference_date: NaiveDate,
}

impl Dispatcher {
    pub fn new(workers: usize, reference_date: NaiveDate) -> Self {
        Self {
            workers,
            poll_interval: Duration::from_millis(500),
            reference_date,
        }
    }

    /// Overrides the result-channel poll interval (tests use a short one).
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// How many workers to actually run for a task count.
    ///
    /// Defaults to the configured count, or host parallelism when
    /// unconfigured. Worker startup is expensive enough that a pool is only
    /// worth it when each worker gets at least a few tasks, so few requests
    /// pull the count down toward a third of the task count.
    pub fn effective_workers(&self, tasks: usize) -> usize {
        let mut count = if self.workers == 0 {
            std::thread::available_parallelism()
                .map(std::num::NonZero::get)
                .unwrap_or(1)
        } else {
            self.workers
        };
        if count > 1 && count * 3 > tasks {
            count = (tasks / 3).max(1);
        }
        count
    }

    /// Produces one pathset result per task.
    ///
    /// Returns an error only when the sequential path cannot initialize its
    /// capability; pool workers that fail to initialize are logged and their
    /// unclaimed tasks reported as lost.
    pub fn dispatch<F: CapabilityFactory>(
        &self,
        iteration: u32,
        tasks: Vec<SearchTask>,
        factory: &F,
        bump_wait: &[BumpWaitEntry],
    ) -> Result<DispatchOutcome, SearchError> {
        let started = Instant::now();
        let task_count = tasks.len();
        let workers = self.effective_workers(task_count);

        let outcome = if workers <= 1 {
            debug!(iteration, tasks = task_count, "dispatching sequentially");
            self.dispatch_sequential(iteration, tasks, factory, bump_wait)?
        } else {
            info!(iteration, tasks = task_count, workers, "dispatching to worker pool");
            self.dispatch_pool(iteration, workers, tasks, factory, bump_wait)
        };

        info!(
            iteration,
            found = outcome.pathsets.len(),
            failed = outcome.failed.len(),
            lost = outcome.lost.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "path search complete"
        );
        Ok(outcome)
    }

    fn dispatch_sequential<F: CapabilityFactory>(
        &self,
        iteration: u32,
        tasks: Vec<SearchTask>,
        factory: &F,
        bump_wait: &[BumpWaitEntry],
    ) -> Result<DispatchOutcome, SearchError> {
        let mut capability = factory.build(0)?;
        if iteration > 1 && !bump_wait.is_empty() {
            capability.set_bump_waits(bump_wait);
        }

        let mut outcome = DispatchOutcome::default();
        for task in tasks {
            let trip_list = task.request.trip_list_id;
            let result = capability.find_pathset(&task).and_then(|raw| {
                let counters = raw.counters;
                let paths = decode_pathset(&raw, task.stochastic, self.reference_date)?;
                Ok((paths, counters))
            });
            match result {
                Ok((paths, counters)) => {
                    outcome.counters.push((trip_list, counters));
                    outcome.pathsets.insert(trip_list, paths);
                }
                Err(error) => {
                    warn!(%trip_list, %error, "search failed for request");
                    outcome.failed.push(trip_list);
                }
            }
        }
        Ok(outcome)
    }

    fn dispatch_pool<F: CapabilityFactory>(
        &self,
        iteration: u32,
        workers: usize,
        tasks: Vec<SearchTask>,
        factory: &F,
        bump_wait: &[BumpWaitEntry],
    ) -> DispatchOutcome {
        let (task_tx, task_rx) = mpsc::channel::<TaskMessage>();
        let task_rx = Arc::new(Mutex::new(task_rx));
        let (report_tx, report_rx) = mpsc::channel::<WorkerReport>();

        // Queue all work, then one sentinel per worker, before anything
        // starts: the receiver is alive, so these sends cannot fail.
        for task in tasks {
            let _ = task_tx.send(TaskMessage::Task(task));
        }
        for _ in 0..workers {
            let _ = task_tx.send(TaskMessage::Shutdown);
        }

        let mut outcome = DispatchOutcome::default();
        let mut states: Vec<WorkerState> = (0..workers)
            .map(|_| WorkerState {
                working_on: None,
                exited_cleanly: false,
                accounted: false,
            })
            .collect();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|w| {
                    let task_rx = Arc::clone(&task_rx);
                    let report_tx = report_tx.clone();
                    let bump_wait = bump_wait.to_vec();
                    let reference_date = self.reference_date;
                    scope.spawn(move || {
                        // A panicking worker must look like a dead worker,
                        // not take the whole dispatcher down at join time.
                        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                            worker::run(
                                w,
                                iteration,
                                factory,
                                bump_wait,
                                reference_date,
                                task_rx,
                                report_tx,
                            )
                        }));
                    })
                })
                .collect();
            // Workers hold the only remaining senders; the channel
            // disconnects exactly when the last one exits.
            drop(report_tx);

            loop {
                match report_rx.recv_timeout(self.poll_interval) {
                    Ok(report) => handle_report(report, &mut states, &mut outcome),
                    Err(RecvTimeoutError::Timeout) => {
                        // Not ready yet. Snapshot liveness before draining:
                        // a worker seen dead here sent everything it ever
                        // will, so after the drain its clean exit (if any)
                        // is already recorded and only real crashes remain.
                        let finished: Vec<bool> =
                            handles.iter().map(|h| h.is_finished()).collect();
                        while let Ok(report) = report_rx.try_recv() {
                            handle_report(report, &mut states, &mut outcome);
                        }
                        account_dead_workers(&finished, &mut states, &mut outcome);
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            // Disconnected: every sender is gone and the channel is empty.
            // Join the threads, then settle whoever is still unaccounted.
            for handle in handles {
                let _ = handle.join();
            }
            account_dead_workers(&vec![true; workers], &mut states, &mut outcome);
        });

        // If workers died early, tasks can be left on the channel: nobody
        // will ever run them, so they are not-found this iteration.
        let receiver = task_rx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        loop {
            match receiver.try_recv() {
                Ok(TaskMessage::Task(task)) => {
                    let trip_list = task.request.trip_list_id;
                    warn!(%trip_list, "search task never picked up by a live worker");
                    outcome.lost.push(trip_list);
                }
                Ok(TaskMessage::Shutdown) => continue,
                Err(_) => break,
            }
        }

        outcome
    }
}

fn handle_report(
    report: WorkerReport,
    states: &mut [WorkerState],
    outcome: &mut DispatchOutcome,
) {
    match report {
        WorkerReport::Started {
            worker,
            person,
            trip_list,
        } => {
            states[worker].working_on = Some((person, trip_list));
        }
        WorkerReport::Completed {
            worker,
            trip_list,
            paths,
            counters,
        } => {
            states[worker].working_on = None;
            debug!(worker, %trip_list, paths = paths.len(), "pathset received");
            outcome.counters.push((trip_list, counters));
            outcome.pathsets.insert(trip_list, paths);
        }
        WorkerReport::Failed {
            worker,
            trip_list,
            error,
        } => {
            states[worker].working_on = None;
            states[worker].exited_cleanly = true;
            warn!(worker, %trip_list, %error, "search failed; worker retired");
            outcome.failed.push(trip_list);
        }
        WorkerReport::Finished { worker } => {
            states[worker].exited_cleanly = true;
            debug!(worker, "worker finished");
        }
    }
}

/// Flags workers whose threads ended without a clean exit message and
/// writes off whatever they were working on. `finished` must be a liveness
/// snapshot taken before the result channel was last drained.
fn account_dead_workers(
    finished: &[bool],
    states: &mut [WorkerState],
    outcome: &mut DispatchOutcome,
) {
    for (worker, state) in states.iter_mut().enumerate() {
        if state.accounted || !finished[worker] {
            continue;
        }
        state.accounted = true;
        if state.exited_cleanly {
            continue;
        }
        match state.working_on.take() {
            Some((person, trip_list)) => {
                error!(
                    worker,
                    %person,
                    %trip_list,
                    "worker died without completing its task; pathset not found this iteration"
                );
                outcome.lost.push(trip_list);
            }
            None => {
                error!(worker, "worker died before taking a task");
            }
        }
    }
}
