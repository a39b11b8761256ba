//! Database connection and operations

pub mod media_files;
pub mod settings;
pub mod sqlite_helpers;

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

pub use media_files::{CreateMediaFile, MediaFileRecord, MediaFileRepository};
pub use settings::{SettingRecord, SettingsRepository};

/// Database wrapper providing connection pool access
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the SQLite database at `url`
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("Invalid database URL '{}'", url))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database '{}'", url))?;

        Ok(Self { pool })
    }

    /// Get a media files repository
    pub fn media_files(&self) -> MediaFileRepository {
        MediaFileRepository::new(self.pool.clone())
    }

    /// Get a settings repository
    pub fn settings(&self) -> SettingsRepository {
        SettingsRepository::new(self.pool.clone())
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Normalise a configured database location into a sqlx URL.
///
/// Bare paths (`./data/tagscan.db`) get the `sqlite://` scheme; URLs are
/// passed through.
pub fn database_url(location: &str) -> String {
    if location.starts_with("sqlite:") {
        location.to_string()
    } else {
        format!("sqlite://{}", location)
    }
}
