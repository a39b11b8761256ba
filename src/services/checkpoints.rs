//! Scan checkpoint persisted in `app_settings`

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::db::Database;
use crate::scanner::{CURRENT_SCANNER_VERSION, CheckpointStore, ScanCheckpoint};

/// Settings key holding the serialized [`ScanCheckpoint`].
pub const CHECKPOINT_KEY: &str = "file_scanner.checkpoint";

/// [`CheckpointStore`] backed by the settings table.
///
/// Version and timestamp are stored together under one key so they are
/// always written atomically.
#[derive(Clone)]
pub struct SettingsCheckpointStore {
    db: Database,
    current_version: i64,
}

impl SettingsCheckpointStore {
    pub fn new(db: Database) -> Self {
        Self::with_version(db, CURRENT_SCANNER_VERSION)
    }

    pub fn with_version(db: Database, current_version: i64) -> Self {
        Self {
            db,
            current_version,
        }
    }
}

#[async_trait]
impl CheckpointStore for SettingsCheckpointStore {
    fn current_scanner_version(&self) -> i64 {
        self.current_version
    }

    async fn get(&self) -> Result<ScanCheckpoint> {
        self.db
            .settings()
            .get_or_default(CHECKPOINT_KEY, ScanCheckpoint::initial())
            .await
            .context("Failed to read scan checkpoint")
    }

    async fn set(&self, checkpoint: ScanCheckpoint) -> Result<()> {
        self.db
            .settings()
            .set_with_category(
                CHECKPOINT_KEY,
                checkpoint,
                "scanner",
                Some("Scanner version and time of the last complete tag scan"),
            )
            .await
            .context("Failed to write scan checkpoint")?;
        Ok(())
    }
}
