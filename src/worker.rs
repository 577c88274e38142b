//! The per-worker backup loop.

use log::{debug, error, info, warn};

use crate::cancel::CancellationWatcher;
use crate::error::Result;
use crate::item::{ItemFilter, RemoteItem, RemoteRecord};
use crate::partition::WorkAssignment;
use crate::report::WorkerOutcome;
use crate::store::MirrorStore;

/// Back up this worker's share of `records` into `store`.
///
/// The watcher is checked before each owned item, so a stop request lets
/// the current clone or fetch finish and prevents the next one from
/// starting. A failed item is queued and the loop moves on; a failed
/// listing is queued and ends the loop, since no further records can
/// arrive from it.
pub fn run_worker<I>(
    records: I,
    assignment: WorkAssignment,
    store: &MirrorStore,
    filter: &ItemFilter,
    watcher: &mut CancellationWatcher,
) -> WorkerOutcome
where
    I: Iterator<Item = Result<RemoteRecord>>,
{
    let target = store.log_target();
    let mut outcome = WorkerOutcome::default();

    for record in assignment.partition_results(records) {
        if !watcher.is_running() {
            info!(target: target, "stop requested, leaving remaining items");
            outcome.stopped = true;
            break;
        }

        let record = match record {
            Ok(record) => record,
            Err(e) => {
                error!(target: target, "listing failed: {}", e);
                outcome.failures.push(format!("listing failed: {}", e));
                break;
            }
        };

        let item = RemoteItem::from_record(record, filter);
        match item.backup(store) {
            Ok(true) => outcome.successes += 1,
            Ok(false) => debug!(target: target, "skipped {}", item.display_name()),
            Err(failure) => {
                warn!(target: target, "{}", failure);
                outcome.failures.push(failure.to_string());
            }
        }
    }

    outcome
}
