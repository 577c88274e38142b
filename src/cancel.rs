//! Cooperative cancellation of workers.
//!
//! The coordinator owns signal handling. When SIGINT or SIGTERM arrives it
//! sends `Control::Stop` down one channel per worker; each worker checks its
//! `CancellationWatcher` between items and stops once it has seen the
//! message. An in-flight clone or fetch is never interrupted by this.

use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use log::{info, warn};

/// Messages from the coordinator to a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Stop,
}

/// Worker side of the cancel channel.
pub struct CancellationWatcher {
    rx: Receiver<Control>,
    running: bool,
}

impl CancellationWatcher {
    /// `false` once a stop has been received. It never becomes `true` again.
    pub fn is_running(&mut self) -> bool {
        if self.running {
            match self.rx.try_recv() {
                Ok(Control::Stop) => self.running = false,
                // A coordinator that went away cannot ask us to stop.
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {}
            }
        }
        self.running
    }

    /// A watcher that is never told to stop.
    pub fn detached() -> Self {
        let (_tx, rx) = crossbeam_channel::bounded(1);
        Self { rx, running: true }
    }
}

/// Coordinator side: one sender per worker.
pub struct CancelBroadcaster {
    senders: Vec<Sender<Control>>,
    sent: bool,
}

impl CancelBroadcaster {
    pub fn is_sent(&self) -> bool {
        self.sent
    }

    /// Tell every worker to stop. Only the first call sends anything.
    pub fn broadcast(&mut self) {
        if self.sent {
            return;
        }
        self.sent = true;
        for tx in &self.senders {
            // A worker that already finished has dropped its receiver.
            let _ = tx.try_send(Control::Stop);
        }
    }
}

/// Creates a broadcaster and one watcher per worker.
pub fn channels(workers: usize) -> (CancelBroadcaster, Vec<CancellationWatcher>) {
    let (senders, watchers): (Vec<_>, Vec<_>) = (0..workers)
        .map(|_| {
            let (tx, rx) = crossbeam_channel::bounded(1);
            (tx, CancellationWatcher { rx, running: true })
        })
        .unzip();
    (
        CancelBroadcaster {
            senders,
            sent: false,
        },
        watchers,
    )
}

static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Whether SIGINT or SIGTERM has been received since the handlers were
/// installed.
pub fn stop_requested() -> bool {
    STOP_REQUESTED.load(Ordering::SeqCst)
}

#[cfg(unix)]
extern "C" fn record_stop(_signal: nix::libc::c_int) {
    STOP_REQUESTED.store(true, Ordering::SeqCst);
}

/// Route SIGINT and SIGTERM to `stop_requested`.
#[cfg(unix)]
pub fn install_signal_handlers() -> crate::error::Result<()> {
    use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

    let action = SigAction::new(
        SigHandler::Handler(record_stop),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    for signal in [Signal::SIGINT, Signal::SIGTERM] {
        // SAFETY: the handler only stores to an atomic, which is async-signal-safe.
        unsafe { sigaction(signal, &action) }.map_err(|e| crate::error::Error::Worker {
            message: format!("cannot install {} handler: {}", signal, e),
        })?;
    }
    info!(target: "coordinator", "stop with SIGINT or SIGTERM; running clones finish first");
    Ok(())
}

#[cfg(not(unix))]
pub fn install_signal_handlers() -> crate::error::Result<()> {
    warn!(target: "coordinator", "signal handling is not supported on this platform");
    Ok(())
}

/// Clears a previously received stop, for reuse within one process.
pub fn reset_stop_request() {
    if STOP_REQUESTED.swap(false, Ordering::SeqCst) {
        warn!(target: "coordinator", "discarding an earlier stop request");
    }
}
