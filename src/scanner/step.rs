//! Processing of a single catalog item

use chrono::Utc;
use tracing::{debug, trace};

use super::error::ScanFailure;
use super::ports::CatalogItem;
use super::state::ScanState;
use super::ScanContext;

/// How a step left the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StepOutcome {
    /// Tags were read and applied.
    Updated,
    /// Tag read or apply failed; the item was still marked as scanned.
    Failed,
    /// The scan time could not be recorded, so the item stays eligible.
    Unmarked,
}

/// Re-read one item's tags and write them back to the catalog.
///
/// Tag read and apply failures are reported and swallowed. The item's scan
/// time is recorded exactly once whatever happened before it.
pub(crate) async fn run_step(ctx: &ScanContext, item: &CatalogItem) -> StepOutcome {
    ctx.state.publish(ScanState::Running(item.clone()));
    debug!(item_id = %item.id, path = %item.path.display(), "Scanning file tags");

    let mut outcome = StepOutcome::Updated;
    match ctx.tag_reader.read_tags(item).await {
        Ok(tags) => {
            trace!(item_id = %item.id, ?tags, "Read file tags");
            if let Err(source) = ctx.catalog.apply_tags(item, &tags).await {
                ctx.reporter.report(&ScanFailure::ApplyTags {
                    item_id: item.id,
                    source,
                });
                outcome = StepOutcome::Failed;
            }
        }
        Err(source) => {
            ctx.reporter.report(&ScanFailure::ReadTags {
                item_id: item.id,
                source,
            });
            outcome = StepOutcome::Failed;
        }
    }

    if let Err(source) = ctx.catalog.mark_scanned(item, Utc::now()).await {
        ctx.reporter.report(&ScanFailure::MarkScanned {
            item_id: item.id,
            source,
        });
        return StepOutcome::Unmarked;
    }

    outcome
}
