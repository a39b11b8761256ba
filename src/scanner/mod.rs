//! File tag rescanner
//!
//! Walks the catalog items that have not been scanned since the last complete
//! run, re-reads each file's embedded tags and writes any difference back to
//! the catalog. Progress is broadcast as a [`ScanState`] stream.
//!
//! Items are visited strictly one after another: the next item is pulled from
//! the catalog only once the previous one has been read, applied and marked.
//! A failure to pull the next item ends the run and leaves the checkpoint
//! alone; a failure on one item is reported and the run moves on.

mod checkpoint;
mod error;
mod ports;
mod scan_loop;
mod state;
mod step;

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub use checkpoint::{CURRENT_SCANNER_VERSION, Cutoff, ScanCheckpoint, compute_cutoff};
pub use error::ScanFailure;
pub use ports::{Catalog, CatalogItem, CheckpointStore, FailureReporter, TagReader};
pub use scan_loop::ScanOutcome;
pub use state::{ScanState, StateBroadcaster, StateStream};

/// Everything a run needs, shared between the façade and spawned runs.
pub(crate) struct ScanContext {
    pub(crate) catalog: Arc<dyn Catalog>,
    pub(crate) tag_reader: Arc<dyn TagReader>,
    pub(crate) checkpoints: Arc<dyn CheckpointStore>,
    pub(crate) reporter: Arc<dyn FailureReporter>,
    pub(crate) state: StateBroadcaster,
}

/// Entry point for host applications.
pub struct Scanner {
    ctx: Arc<ScanContext>,
    /// Held for the whole duration of a run.
    run_lock: Arc<Mutex<()>>,
}

impl Scanner {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        tag_reader: Arc<dyn TagReader>,
        checkpoints: Arc<dyn CheckpointStore>,
        reporter: Arc<dyn FailureReporter>,
    ) -> Self {
        Self {
            ctx: Arc::new(ScanContext {
                catalog,
                tag_reader,
                checkpoints,
                reporter,
                state: StateBroadcaster::new(),
            }),
            run_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Subscribe to scan state, starting with the current value.
    pub fn observe_state(&self) -> StateStream {
        self.ctx.state.subscribe()
    }

    /// The most recently broadcast state.
    pub fn current_state(&self) -> ScanState {
        self.ctx.state.current()
    }

    /// Start a scan in the background.
    ///
    /// Returns `None` without doing anything if a scan is already running.
    /// Must be called from within a tokio runtime.
    pub fn trigger_scan(&self) -> Option<JoinHandle<ScanOutcome>> {
        let Ok(guard) = self.run_lock.clone().try_lock_owned() else {
            debug!("File scan already in progress, ignoring trigger");
            return None;
        };
        if self.ctx.state.current().is_running() {
            debug!("File scan already in progress, ignoring trigger");
            return None;
        }

        let ctx = Arc::clone(&self.ctx);
        Some(tokio::spawn(async move {
            let _guard = guard;
            execute(&ctx).await
        }))
    }

    /// Run a scan to completion on the current task.
    ///
    /// Returns [`ScanOutcome::AlreadyRunning`] if another scan holds the scanner.
    pub async fn scan(&self) -> ScanOutcome {
        let Ok(_guard) = self.run_lock.try_lock() else {
            debug!("File scan already in progress, ignoring trigger");
            return ScanOutcome::AlreadyRunning;
        };
        if self.ctx.state.current().is_running() {
            return ScanOutcome::AlreadyRunning;
        }
        execute(&self.ctx).await
    }
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("state", &self.ctx.state.current())
            .finish()
    }
}

/// Publishes `Idle` if a run stops while still broadcasting `Running`, which
/// happens when its future is dropped mid-item or a collaborator panics.
struct RestOnExit<'a> {
    state: &'a StateBroadcaster,
}

impl Drop for RestOnExit<'_> {
    fn drop(&mut self) {
        if self.state.current().is_running() {
            warn!("File scan interrupted mid-item, returning to idle");
            self.state.publish(ScanState::Idle);
        }
    }
}

async fn execute(ctx: &ScanContext) -> ScanOutcome {
    let _rest = RestOnExit { state: &ctx.state };

    let checkpoint = match ctx.checkpoints.get().await {
        Ok(checkpoint) => checkpoint,
        Err(source) => {
            ctx.reporter.report(&ScanFailure::LoadCheckpoint(source));
            return ScanOutcome::Aborted { processed: 0 };
        }
    };

    let current_version = ctx.checkpoints.current_scanner_version();
    let cutoff = compute_cutoff(current_version, &checkpoint);
    if cutoff.forcing_full_rescan {
        info!(
            previous_version = checkpoint.scanner_version,
            current_version, "Scanner version changed, rescanning every file"
        );
        if let Err(source) = ctx.catalog.reset_scan_times().await {
            ctx.reporter.report(&ScanFailure::ResetScanTimes(source));
            return ScanOutcome::Aborted { processed: 0 };
        }
    } else {
        info!(cutoff = %cutoff.timestamp, "Starting file scan");
    }

    scan_loop::run_loop(ctx, cutoff, checkpoint).await
}
