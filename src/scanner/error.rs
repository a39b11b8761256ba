//! Failures absorbed by the scanner

use uuid::Uuid;

/// A failure surfaced while scanning.
///
/// None of these reach the caller of [`Scanner::trigger_scan`](super::Scanner::trigger_scan);
/// they are handed to the [`FailureReporter`](super::FailureReporter) instead.
#[derive(Debug, thiserror::Error)]
pub enum ScanFailure {
    #[error("failed to select next item to scan: {0:#}")]
    SelectNext(#[source] anyhow::Error),

    #[error("failed to read tags for {item_id}: {source:#}")]
    ReadTags {
        item_id: Uuid,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to apply tags to {item_id}: {source:#}")]
    ApplyTags {
        item_id: Uuid,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to record scan time for {item_id}: {source:#}")]
    MarkScanned {
        item_id: Uuid,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to reset scan times for full rescan: {0:#}")]
    ResetScanTimes(#[source] anyhow::Error),

    #[error("failed to load scan checkpoint: {0:#}")]
    LoadCheckpoint(#[source] anyhow::Error),

    #[error("failed to store scan checkpoint: {0:#}")]
    StoreCheckpoint(#[source] anyhow::Error),
}

impl ScanFailure {
    /// Whether this failure ends the current run.
    ///
    /// Tag read and tag apply failures only affect one item; everything else
    /// means the catalog or checkpoint store cannot be trusted for this run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ReadTags { .. } | Self::ApplyTags { .. })
    }

    /// The item this failure concerns, if any.
    pub fn item_id(&self) -> Option<Uuid> {
        match self {
            Self::ReadTags { item_id, .. }
            | Self::ApplyTags { item_id, .. }
            | Self::MarkScanned { item_id, .. } => Some(*item_id),
            _ => None,
        }
    }
}
