//! Background job scheduling

use std::sync::Arc;

use futures::StreamExt;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, info};

use crate::scanner::{ScanState, Scanner, StateStream};

/// Initialize and start the job scheduler with the periodic file scan
pub async fn start_scheduler(scanner: Arc<Scanner>, schedule: &str) -> anyhow::Result<JobScheduler> {
    let scanner_job = Job::new_async(schedule, move |_uuid, _l| {
        let scanner = scanner.clone();
        Box::pin(async move {
            info!("Running file tag scanner");
            if scanner.trigger_scan().is_none() {
                debug!("Previous file scan still running, skipping this tick");
            }
        })
    })?;

    let scheduler = JobScheduler::new().await?;
    scheduler.add(scanner_job).await?;

    scheduler.start().await?;

    info!(schedule, "Job scheduler started");
    Ok(scheduler)
}

/// Log every scanner state change until the stream ends.
///
/// Returns the number of states seen.
pub async fn log_state_changes(mut states: StateStream) -> usize {
    let mut seen = 0;
    while let Some(state) = states.next().await {
        seen += 1;
        match state {
            ScanState::Idle => debug!("File scanner idle"),
            ScanState::Running(item) => {
                debug!(item_id = %item.id, path = %item.path.display(), "File scanner running")
            }
        }
    }
    seen
}
