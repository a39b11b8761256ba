//! Collaborators the scanner drives
//!
//! The scanner owns none of the storage or file access it needs. Each concern
//! sits behind one of these traits so the host can plug in the SQLite catalog,
//! the lofty tag reader and the tracing reporter, and tests can plug in fakes.

use std::fmt;
use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::checkpoint::ScanCheckpoint;
use super::error::ScanFailure;
use crate::media::Tags;

/// A catalog entry the scanner visits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CatalogItem {
    pub id: Uuid,
    pub path: PathBuf,
}

impl CatalogItem {
    pub fn new(id: Uuid, path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            path: path.into(),
        }
    }
}

impl fmt::Display for CatalogItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.path.display())
    }
}

/// Persistent store of known media items.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Pull one item whose last file scan is older than `cutoff`, or that has
    /// never been scanned. `None` when no candidate remains.
    async fn select_next_eligible(&self, cutoff: DateTime<Utc>) -> Result<Option<CatalogItem>>;

    /// Record that `item` was visited at `at`.
    async fn mark_scanned(&self, item: &CatalogItem, at: DateTime<Utc>) -> Result<()>;

    /// Write the fields of `tags` that differ from the stored record.
    async fn apply_tags(&self, item: &CatalogItem, tags: &Tags) -> Result<()>;

    /// Forget every recorded scan time, making all items eligible again even
    /// for the epoch cutoff used by a forced full rescan.
    async fn reset_scan_times(&self) -> Result<()>;
}

/// Reads embedded tags for one item. May suspend while the file is decoded.
#[async_trait]
pub trait TagReader: Send + Sync {
    async fn read_tags(&self, item: &CatalogItem) -> Result<Tags>;
}

/// Persists the scan checkpoint across process restarts.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Version of the tag extraction logic this build ships with.
    fn current_scanner_version(&self) -> i64;

    async fn get(&self) -> Result<ScanCheckpoint>;

    async fn set(&self, checkpoint: ScanCheckpoint) -> Result<()>;
}

/// Sink for failures the scanner absorbs. Must not block.
pub trait FailureReporter: Send + Sync {
    fn report(&self, failure: &ScanFailure);
}
