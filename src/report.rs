//! End-of-run results.
//!
//! Workers never hand errors to the coordinator as values to be re-raised.
//! They send their success count and the text of every failure over the
//! results channel, and the coordinator folds those messages into a single
//! `RunReport`.

use log::debug;

/// Messages from a worker to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerMessage {
    /// Failures queued by worker `step`, sent before its count.
    Errors { step: usize, messages: Vec<String> },
    /// Items worker `step` mirrored. Always the last message of a worker.
    Count { step: usize, count: usize },
}

/// What one worker accomplished.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerOutcome {
    pub successes: usize,
    pub failures: Vec<String>,
    /// The worker stopped early because it was told to.
    pub stopped: bool,
}

impl WorkerOutcome {
    /// An outcome for a worker that could not start.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            failures: vec![message.into()],
            ..Self::default()
        }
    }

    pub fn into_messages(self, step: usize) -> Vec<WorkerMessage> {
        let mut messages = Vec::with_capacity(2);
        if !self.failures.is_empty() {
            messages.push(WorkerMessage::Errors {
                step,
                messages: self.failures,
            });
        }
        messages.push(WorkerMessage::Count {
            step,
            count: self.successes,
        });
        messages
    }
}

/// A subject and body for the notification sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

/// Totals across every worker of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub successes: usize,
    pub failures: Vec<String>,
    /// The run was cut short by a stop request.
    pub cancelled: bool,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Adds the results of a later pass, e.g. another source.
    pub fn absorb(&mut self, other: RunReport) {
        self.successes += other.successes;
        self.failures.extend(other.failures);
        self.cancelled |= other.cancelled;
    }

    /// The count summary, followed by an errors summary when anything
    /// failed.
    pub fn notifications(&self) -> Vec<Notification> {
        let mut body = format!("{} items mirrored successfully.", self.successes);
        if self.cancelled {
            body.push_str("\nThe run was stopped before every item was processed.");
        }
        let mut notifications = vec![Notification {
            subject: "Mirror run complete".to_string(),
            body,
        }];

        if self.has_failures() {
            notifications.push(Notification {
                subject: format!("Mirror run: {} errors", self.failures.len()),
                body: self.failures.join("\n"),
            });
        }
        notifications
    }
}

/// Folds worker messages into a `RunReport`.
#[derive(Debug)]
pub struct ResultAggregator {
    expected: usize,
    reported: Vec<bool>,
    report: RunReport,
}

impl ResultAggregator {
    pub fn new(workers: usize) -> Self {
        Self {
            expected: workers,
            reported: vec![false; workers],
            report: RunReport::default(),
        }
    }

    pub fn record(&mut self, message: WorkerMessage) {
        match message {
            WorkerMessage::Errors { step, messages } => {
                debug!(target: "coordinator", "worker {} reported {} errors", step, messages.len());
                self.report.failures.extend(messages);
            }
            WorkerMessage::Count { step, count } => {
                debug!(target: "coordinator", "worker {} mirrored {} items", step, count);
                self.report.successes += count;
                if let Some(done) = self.reported.get_mut(step) {
                    *done = true;
                }
            }
        }
    }

    pub fn mark_cancelled(&mut self) {
        self.report.cancelled = true;
    }

    /// Every worker has sent its count.
    pub fn is_complete(&self) -> bool {
        self.reported.iter().filter(|done| **done).count() == self.expected
    }

    pub fn finish(self) -> RunReport {
        self.report
    }
}
