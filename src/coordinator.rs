//! Runs workers in parallel and collects what they report.
//!
//! Each worker gets its own `WorkAssignment` and `CancellationWatcher` and
//! runs on a dedicated thread of a rayon pool. The coordinator stays on the
//! calling thread, receiving `WorkerMessage`s until every worker has hung up,
//! and polls for a stop request in between.

use std::time::Duration;

use crossbeam_channel::select;
use log::{debug, info};
use rayon::ThreadPoolBuilder;

use crate::cancel::{self, CancellationWatcher};
use crate::error::{Error, Result};
use crate::partition::WorkAssignment;
use crate::report::{ResultAggregator, RunReport, WorkerMessage, WorkerOutcome};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

pub struct Coordinator {
    workers: usize,
    poll_interval: Duration,
}

impl Coordinator {
    pub fn new(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(Error::Config {
                message: "workers must be at least 1".to_string(),
                hint: Some("Pass --workers 1 or more".to_string()),
            });
        }
        Ok(Self {
            workers,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// How often the stop check runs while no worker is reporting.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `work` once per worker and wait for all of them.
    ///
    /// `stop_requested` is polled on the calling thread. The first time it
    /// returns `true` every worker is sent `Control::Stop` and the report is
    /// marked cancelled; workers still send their results before exiting.
    pub fn run<F>(&self, work: F, stop_requested: &dyn Fn() -> bool) -> Result<RunReport>
    where
        F: Fn(WorkAssignment, &mut CancellationWatcher) -> WorkerOutcome + Sync,
    {
        let assignments = WorkAssignment::all(self.workers)?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("mirror-worker-{}", i))
            .build()
            .map_err(|e| Error::Worker {
                message: format!("cannot start worker pool: {}", e),
            })?;

        let (mut broadcaster, watchers) = cancel::channels(self.workers);
        let (results_tx, results_rx) = crossbeam_channel::unbounded::<WorkerMessage>();
        let mut aggregator = ResultAggregator::new(self.workers);
        let work = &work;

        info!(target: "coordinator", "starting {} workers", self.workers);

        pool.in_place_scope(|scope| {
            for (assignment, mut watcher) in assignments.into_iter().zip(watchers) {
                let results = results_tx.clone();
                scope.spawn(move |_| {
                    let step = assignment.step();
                    let outcome = work(assignment, &mut watcher);
                    debug!(target: "coordinator", "worker {} finished", step);
                    for message in outcome.into_messages(step) {
                        // Only fails if the coordinator is gone.
                        let _ = results.send(message);
                    }
                });
            }
            drop(results_tx);

            loop {
                let disconnected = select! {
                    recv(results_rx) -> message => match message {
                        Ok(message) => {
                            aggregator.record(message);
                            false
                        }
                        Err(_) => true,
                    },
                    default(self.poll_interval) => false,
                };
                if disconnected {
                    break;
                }

                if !broadcaster.is_sent() && stop_requested() {
                    info!(target: "coordinator", "stop requested, waiting for workers to finish their current item");
                    broadcaster.broadcast();
                    aggregator.mark_cancelled();
                }
            }
        });

        if !aggregator.is_complete() {
            return Err(Error::Worker {
                message: "a worker exited without reporting its results".to_string(),
            });
        }
        Ok(aggregator.finish())
    }
}
