//! Failure reporting through tracing

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{error, warn};

use crate::scanner::{FailureReporter, ScanFailure};

/// Logs scanner failures and counts them.
///
/// Fatal failures are logged at `error`, per-item failures at `warn`.
#[derive(Debug, Default)]
pub struct TracingFailureReporter {
    fatal: AtomicU64,
    item: AtomicU64,
}

/// Failure counts since the reporter was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FailureCounts {
    pub fatal: u64,
    pub item: u64,
}

impl TracingFailureReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> FailureCounts {
        FailureCounts {
            fatal: self.fatal.load(Ordering::Relaxed),
            item: self.item.load(Ordering::Relaxed),
        }
    }
}

impl FailureReporter for TracingFailureReporter {
    fn report(&self, failure: &ScanFailure) {
        let item_id = failure.item_id().map(|id| id.to_string());
        if failure.is_fatal() {
            self.fatal.fetch_add(1, Ordering::Relaxed);
            error!(item_id = item_id.as_deref(), error = %failure, "File scanner failure");
        } else {
            self.item.fetch_add(1, Ordering::Relaxed);
            warn!(item_id = item_id.as_deref(), error = %failure, "File scan failed for item");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_counts_by_kind() {
        let reporter = TracingFailureReporter::new();
        reporter.report(&ScanFailure::SelectNext(anyhow::anyhow!("locked")));
        reporter.report(&ScanFailure::ReadTags {
            item_id: Uuid::new_v4(),
            source: anyhow::anyhow!("bad header"),
        });
        reporter.report(&ScanFailure::ApplyTags {
            item_id: Uuid::new_v4(),
            source: anyhow::anyhow!("constraint"),
        });

        assert_eq!(reporter.counts(), FailureCounts { fatal: 1, item: 2 });
    }
}
