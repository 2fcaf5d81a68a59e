//! The persistent search worker.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use tracing::{debug, error};

use crate::search::{
    BumpWaitEntry, CapabilityFactory, SearchCapability, decode_pathset,
};

use super::{TaskMessage, WorkerReport};

/// Body of one worker thread.
///
/// Builds this worker's private capability, pushes the bump-wait table for
/// re-search iterations, then drains the shared task channel until the
/// shutdown sentinel arrives. A capability failure on a task is reported and
/// ends the worker: its labeling state can no longer be trusted, so it takes
/// no further tasks.
pub(super) fn run<F: CapabilityFactory>(
    worker: usize,
    iteration: u32,
    factory: &F,
    bump_wait: Vec<BumpWaitEntry>,
    reference_date: NaiveDate,
    tasks: Arc<Mutex<mpsc::Receiver<TaskMessage>>>,
    reports: mpsc::Sender<WorkerReport>,
) {
    let mut capability = match factory.build(worker) {
        Ok(capability) => capability,
        Err(err) => {
            // The dispatcher notices the dead worker through its join
            // handle; the cause is only visible here.
            error!(worker, error = %err, "search capability init failed");
            return;
        }
    };
    if iteration > 1 && !bump_wait.is_empty() {
        capability.set_bump_waits(&bump_wait);
    }
    debug!(worker, iteration, "worker ready");

    loop {
        let message = match tasks.lock() {
            Ok(guard) => guard.recv(),
            // Poisoned by another worker's panic: treat as end of work.
            Err(_) => break,
        };
        let task = match message {
            Ok(TaskMessage::Task(task)) => task,
            Ok(TaskMessage::Shutdown) | Err(_) => break,
        };

        let trip_list = task.request.trip_list_id;
        let _ = reports.send(WorkerReport::Started {
            worker,
            person: task.request.person_id.clone(),
            trip_list,
        });

        let result = capability.find_pathset(&task).and_then(|raw| {
            let counters = raw.counters;
            let paths = decode_pathset(&raw, task.stochastic, reference_date)?;
            Ok((paths, counters))
        });

        match result {
            Ok((paths, counters)) => {
                let _ = reports.send(WorkerReport::Completed {
                    worker,
                    trip_list,
                    paths,
                    counters,
                });
            }
            Err(error) => {
                let _ = reports.send(WorkerReport::Failed {
                    worker,
                    trip_list,
                    error,
                });
                return;
            }
        }
    }

    let _ = reports.send(WorkerReport::Finished { worker });
}
