//! Sequential pull loop over eligible catalog items

use chrono::Utc;
use tracing::{info, warn};

use super::checkpoint::{Cutoff, ScanCheckpoint};
use super::error::ScanFailure;
use super::state::ScanState;
use super::step::{StepOutcome, run_step};
use super::ScanContext;

/// Summary of one run of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Every eligible item was visited.
    Completed {
        processed: usize,
        failed: usize,
        /// Whether the new checkpoint was persisted.
        checkpoint_saved: bool,
    },
    /// The run stopped early; the checkpoint was left untouched.
    Aborted { processed: usize },
    /// Another run was already in progress, nothing was done.
    AlreadyRunning,
}

impl ScanOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Visit items one at a time until the catalog has no candidate left.
///
/// Each pull happens only after the previous step has fully finished. A
/// failure to select the next item ends the run without touching the
/// checkpoint; item failures never do. On exhaustion the checkpoint is
/// advanced from `previous` and `Idle` is published.
pub(crate) async fn run_loop(
    ctx: &ScanContext,
    cutoff: Cutoff,
    previous: ScanCheckpoint,
) -> ScanOutcome {
    let mut processed = 0usize;
    let mut failed = 0usize;

    loop {
        let item = match ctx.catalog.select_next_eligible(cutoff.timestamp).await {
            Ok(Some(item)) => item,
            Ok(None) => break,
            Err(source) => {
                warn!(processed, "Aborting file scan, could not select next item");
                ctx.reporter.report(&ScanFailure::SelectNext(source));
                // Back to rest if an item had been broadcast before the failure.
                if ctx.state.current().is_running() {
                    ctx.state.publish(ScanState::Idle);
                }
                return ScanOutcome::Aborted { processed };
            }
        };

        match run_step(ctx, &item).await {
            StepOutcome::Updated => processed += 1,
            StepOutcome::Failed => {
                processed += 1;
                failed += 1;
            }
            StepOutcome::Unmarked => {
                warn!(item_id = %item.id, processed, "Aborting file scan, scan time not recorded");
                ctx.state.publish(ScanState::Idle);
                return ScanOutcome::Aborted { processed };
            }
        }
    }

    let next = previous.advanced(ctx.checkpoints.current_scanner_version(), Utc::now());
    let checkpoint_saved = match ctx.checkpoints.set(next).await {
        Ok(()) => true,
        Err(source) => {
            ctx.reporter.report(&ScanFailure::StoreCheckpoint(source));
            false
        }
    };

    ctx.state.publish(ScanState::Idle);

    info!(
        processed,
        failed,
        checkpoint_saved,
        full_rescan = cutoff.forcing_full_rescan,
        "File scan completed"
    );

    ScanOutcome::Completed {
        processed,
        failed,
        checkpoint_saved,
    }
}
