//! SQLite-backed catalog for the file scanner

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::db::{Database, MediaFileRecord};
use crate::media::Tags;
use crate::scanner::{Catalog, CatalogItem};

/// [`Catalog`] over the `media_files` table.
#[derive(Clone)]
pub struct SqliteCatalog {
    db: Database,
}

impl SqliteCatalog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl From<MediaFileRecord> for CatalogItem {
    fn from(record: MediaFileRecord) -> Self {
        CatalogItem::new(record.id, record.path)
    }
}

#[async_trait]
impl Catalog for SqliteCatalog {
    async fn select_next_eligible(&self, cutoff: DateTime<Utc>) -> Result<Option<CatalogItem>> {
        let record = self.db.media_files().select_next_to_scan(cutoff).await?;
        Ok(record.map(CatalogItem::from))
    }

    async fn mark_scanned(&self, item: &CatalogItem, at: DateTime<Utc>) -> Result<()> {
        let marked = self
            .db
            .media_files()
            .set_last_file_scan_time(item.id, at)
            .await?;
        if !marked {
            // Removed from the catalog mid-scan; it cannot be selected again.
            debug!(item_id = %item.id, "Media file gone before scan time was recorded");
        }
        Ok(())
    }

    async fn apply_tags(&self, item: &CatalogItem, tags: &Tags) -> Result<()> {
        let changed = self.db.media_files().update_from_tags(item.id, tags).await?;
        if !changed.is_empty() {
            debug!(item_id = %item.id, fields = ?changed, "Updated media file from tags");
        }
        Ok(())
    }

    async fn reset_scan_times(&self) -> Result<()> {
        let cleared = self.db.media_files().clear_scan_times().await?;
        debug!(cleared, "Cleared file scan times for full rescan");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CreateMediaFile;

    async fn test_catalog() -> (tempfile::TempDir, Database, SqliteCatalog) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("catalog.db").display());
        let db = Database::connect(&url, 1).await.unwrap();
        db.migrate().await.unwrap();
        let catalog = SqliteCatalog::new(db.clone());
        (dir, db, catalog)
    }

    #[tokio::test]
    async fn test_marked_item_is_not_selected_again() {
        let (_dir, db, catalog) = test_catalog().await;
        let record = db
            .media_files()
            .insert(CreateMediaFile {
                path: "/music/a.flac".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let cutoff = Utc::now();

        let item = catalog.select_next_eligible(cutoff).await.unwrap().unwrap();
        assert_eq!(item, CatalogItem::new(record.id, "/music/a.flac"));

        catalog.mark_scanned(&item, Utc::now()).await.unwrap();
        assert!(catalog.select_next_eligible(cutoff).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_apply_tags_to_deleted_item_fails() {
        let (_dir, _db, catalog) = test_catalog().await;
        let ghost = CatalogItem::new(uuid::Uuid::new_v4(), "/music/ghost.mp3");

        assert!(catalog.apply_tags(&ghost, &Tags::default()).await.is_err());
        // Marking a vanished item is harmless.
        catalog.mark_scanned(&ghost, Utc::now()).await.unwrap();
    }
}
