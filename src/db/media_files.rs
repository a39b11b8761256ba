//! Media files database repository

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::sqlite_helpers::{
    datetime_to_millis, i64_opt_to_u32, i64_opt_to_u64, json_to_vec, millis_to_datetime,
    now_iso8601, str_to_datetime, str_to_uuid, u32_opt_to_i64, u64_opt_to_i64, uuid_to_str,
    vec_to_json,
};
use crate::media::Tags;

const SELECT_COLUMNS: &str = r#"
    SELECT id, path, title, artist, album, album_artist, genres, year,
           track_number, disc_number, duration_ms, lyrics, last_file_scan_at,
           added_at, updated_at
    FROM media_files
"#;

/// Media file record from database
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFileRecord {
    pub id: Uuid,
    pub path: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub genres: Vec<String>,
    pub year: Option<u32>,
    pub track_number: Option<u32>,
    pub disc_number: Option<u32>,
    pub duration_ms: Option<u64>,
    pub lyrics: Option<String>,
    pub last_file_scan_at: Option<DateTime<Utc>>,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl sqlx::FromRow<'_, sqlx::sqlite::SqliteRow> for MediaFileRecord {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> sqlx::Result<Self> {
        use sqlx::Row;

        let decode = |e: anyhow::Error| sqlx::Error::Decode(e.into());

        let id_str: String = row.try_get("id")?;
        let genres_str: String = row.try_get("genres")?;
        let scanned_at: Option<i64> = row.try_get("last_file_scan_at")?;
        let added_str: String = row.try_get("added_at")?;
        let updated_str: String = row.try_get("updated_at")?;
        let duration_ms: Option<i64> = row.try_get("duration_ms")?;

        Ok(Self {
            id: str_to_uuid(&id_str).map_err(decode)?,
            path: row.try_get("path")?,
            title: row.try_get("title")?,
            artist: row.try_get("artist")?,
            album: row.try_get("album")?,
            album_artist: row.try_get("album_artist")?,
            genres: json_to_vec(&genres_str),
            year: i64_opt_to_u32(row.try_get("year")?),
            track_number: i64_opt_to_u32(row.try_get("track_number")?),
            disc_number: i64_opt_to_u32(row.try_get("disc_number")?),
            duration_ms: i64_opt_to_u64(duration_ms),
            lyrics: row.try_get("lyrics")?,
            last_file_scan_at: scanned_at.map(millis_to_datetime).transpose().map_err(decode)?,
            added_at: str_to_datetime(&added_str).map_err(decode)?,
            updated_at: str_to_datetime(&updated_str).map_err(decode)?,
        })
    }
}

impl MediaFileRecord {
    /// Tags as currently stored for this file
    pub fn stored_tags(&self) -> Tags {
        Tags {
            title: self.title.clone(),
            artist: self.artist.clone(),
            album: self.album.clone(),
            album_artist: self.album_artist.clone(),
            genres: self.genres.clone(),
            year: self.year,
            track_number: self.track_number,
            disc_number: self.disc_number,
            duration_ms: self.duration_ms,
            lyrics: self.lyrics.clone(),
        }
    }

    /// Names of the fields whose stored value differs from `tags`
    pub fn changed_fields(&self, tags: &Tags) -> Vec<&'static str> {
        let stored = self.stored_tags();
        let mut changed = Vec::new();
        if stored.title != tags.title {
            changed.push("title");
        }
        if stored.artist != tags.artist {
            changed.push("artist");
        }
        if stored.album != tags.album {
            changed.push("album");
        }
        if stored.album_artist != tags.album_artist {
            changed.push("album_artist");
        }
        if stored.genres != tags.genres {
            changed.push("genres");
        }
        if stored.year != tags.year {
            changed.push("year");
        }
        if stored.track_number != tags.track_number {
            changed.push("track_number");
        }
        if stored.disc_number != tags.disc_number {
            changed.push("disc_number");
        }
        if stored.duration_ms != tags.duration_ms {
            changed.push("duration_ms");
        }
        if stored.lyrics != tags.lyrics {
            changed.push("lyrics");
        }
        changed
    }
}

/// Input for creating a media file
#[derive(Debug, Default)]
pub struct CreateMediaFile {
    pub path: String,
    pub tags: Tags,
}

pub struct MediaFileRepository {
    pool: SqlitePool,
}

impl MediaFileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new media file, never scanned yet
    pub async fn insert(&self, input: CreateMediaFile) -> Result<MediaFileRecord> {
        let id = Uuid::new_v4();
        let now = now_iso8601();
        let tags = &input.tags;

        sqlx::query(
            r#"
            INSERT INTO media_files (
                id, path, title, artist, album, album_artist, genres, year,
                track_number, disc_number, duration_ms, lyrics, last_file_scan_at,
                added_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, NULL, ?13, ?13)
            "#,
        )
        .bind(uuid_to_str(id))
        .bind(&input.path)
        .bind(&tags.title)
        .bind(&tags.artist)
        .bind(&tags.album)
        .bind(&tags.album_artist)
        .bind(vec_to_json(&tags.genres))
        .bind(u32_opt_to_i64(tags.year))
        .bind(u32_opt_to_i64(tags.track_number))
        .bind(u32_opt_to_i64(tags.disc_number))
        .bind(u64_opt_to_i64(tags.duration_ms))
        .bind(&tags.lyrics)
        .bind(&now)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to insert media file {}", input.path))?;

        self.get_by_id(id)
            .await?
            .context("Media file vanished after insert")
    }

    /// Get a media file by ID
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<MediaFileRecord>> {
        let record = sqlx::query_as::<_, MediaFileRecord>(&format!("{SELECT_COLUMNS} WHERE id = ?1"))
            .bind(uuid_to_str(id))
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    /// Next file whose tags were last scanned before `cutoff`, or never.
    ///
    /// Never-scanned files come first, then the longest-unscanned.
    pub async fn select_next_to_scan(&self, cutoff: DateTime<Utc>) -> Result<Option<MediaFileRecord>> {
        let record = sqlx::query_as::<_, MediaFileRecord>(&format!(
            r#"{SELECT_COLUMNS}
            WHERE last_file_scan_at IS NULL OR last_file_scan_at < ?1
            ORDER BY last_file_scan_at IS NOT NULL, last_file_scan_at, id
            LIMIT 1
            "#
        ))
        .bind(datetime_to_millis(cutoff))
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Record when the file's tags were last scanned.
    ///
    /// Returns false if the file no longer exists.
    pub async fn set_last_file_scan_time(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query("UPDATE media_files SET last_file_scan_at = ?1 WHERE id = ?2")
            .bind(datetime_to_millis(at))
            .bind(uuid_to_str(id))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Clear every recorded scan time. Returns the number of files affected.
    pub async fn clear_scan_times(&self) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE media_files SET last_file_scan_at = NULL WHERE last_file_scan_at IS NOT NULL",
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Overwrite the stored tags when they differ from `tags`.
    ///
    /// Returns the names of the fields that changed; empty means nothing was written.
    pub async fn update_from_tags(&self, id: Uuid, tags: &Tags) -> Result<Vec<&'static str>> {
        let Some(existing) = self.get_by_id(id).await? else {
            bail!("Media file {} not found", id);
        };

        let changed = existing.changed_fields(tags);
        if changed.is_empty() {
            return Ok(changed);
        }

        sqlx::query(
            r#"
            UPDATE media_files SET
                title = ?1, artist = ?2, album = ?3, album_artist = ?4, genres = ?5,
                year = ?6, track_number = ?7, disc_number = ?8, duration_ms = ?9,
                lyrics = ?10, updated_at = ?11
            WHERE id = ?12
            "#,
        )
        .bind(&tags.title)
        .bind(&tags.artist)
        .bind(&tags.album)
        .bind(&tags.album_artist)
        .bind(vec_to_json(&tags.genres))
        .bind(u32_opt_to_i64(tags.year))
        .bind(u32_opt_to_i64(tags.track_number))
        .bind(u32_opt_to_i64(tags.disc_number))
        .bind(u64_opt_to_i64(tags.duration_ms))
        .bind(&tags.lyrics)
        .bind(now_iso8601())
        .bind(uuid_to_str(id))
        .execute(&self.pool)
        .await?;

        Ok(changed)
    }

    /// Count files whose tags were never scanned
    pub async fn count_never_scanned(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM media_files WHERE last_file_scan_at IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use chrono::Duration;

    async fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("test.db").display());
        let db = Database::connect(&url, 1).await.unwrap();
        db.migrate().await.unwrap();
        (dir, db)
    }

    fn create(path: &str) -> CreateMediaFile {
        CreateMediaFile {
            path: path.to_string(),
            tags: Tags {
                title: Some("Old Title".to_string()),
                genres: vec!["Rock".to_string()],
                year: Some(1999),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let (_dir, db) = test_db().await;
        let repo = db.media_files();

        let record = repo.insert(create("/music/a.mp3")).await.unwrap();
        assert_eq!(record.path, "/music/a.mp3");
        assert_eq!(record.genres, vec!["Rock".to_string()]);
        assert_eq!(record.year, Some(1999));
        assert_eq!(record.last_file_scan_at, None);

        let fetched = repo.get_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(fetched, record);
    }

    #[tokio::test]
    async fn test_select_prefers_never_scanned_then_oldest() {
        let (_dir, db) = test_db().await;
        let repo = db.media_files();
        let base = millis_to_datetime(1_000_000).unwrap();

        let old = repo.insert(create("/music/old.mp3")).await.unwrap();
        let older = repo.insert(create("/music/older.mp3")).await.unwrap();
        let fresh = repo.insert(create("/music/fresh.mp3")).await.unwrap();
        repo.set_last_file_scan_time(old.id, base).await.unwrap();
        repo.set_last_file_scan_time(older.id, base - Duration::seconds(10)).await.unwrap();

        let cutoff = base + Duration::seconds(1);
        let next = repo.select_next_to_scan(cutoff).await.unwrap().unwrap();
        assert_eq!(next.id, fresh.id);

        repo.set_last_file_scan_time(fresh.id, cutoff).await.unwrap();
        let next = repo.select_next_to_scan(cutoff).await.unwrap().unwrap();
        assert_eq!(next.id, older.id);

        repo.set_last_file_scan_time(older.id, cutoff).await.unwrap();
        let next = repo.select_next_to_scan(cutoff).await.unwrap().unwrap();
        assert_eq!(next.id, old.id);

        repo.set_last_file_scan_time(old.id, cutoff).await.unwrap();
        assert!(repo.select_next_to_scan(cutoff).await.unwrap().is_none());
        assert_eq!(repo.count_never_scanned().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cutoff_is_exclusive() {
        let (_dir, db) = test_db().await;
        let repo = db.media_files();
        let at = millis_to_datetime(5_000).unwrap();

        let file = repo.insert(create("/music/a.mp3")).await.unwrap();
        repo.set_last_file_scan_time(file.id, at).await.unwrap();

        assert!(repo.select_next_to_scan(at).await.unwrap().is_none());
        assert!(repo
            .select_next_to_scan(at + Duration::milliseconds(1))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_update_from_tags_writes_only_on_difference() {
        let (_dir, db) = test_db().await;
        let repo = db.media_files();
        let file = repo.insert(create("/music/a.mp3")).await.unwrap();

        let unchanged = repo.update_from_tags(file.id, &file.stored_tags()).await.unwrap();
        assert!(unchanged.is_empty());

        let tags = Tags {
            title: Some("New Title".to_string()),
            genres: vec!["Rock".to_string(), "Indie".to_string()],
            year: Some(1999),
            duration_ms: Some(215_000),
            ..Default::default()
        };
        let changed = repo.update_from_tags(file.id, &tags).await.unwrap();
        assert_eq!(changed, vec!["title", "genres", "duration_ms"]);

        let updated = repo.get_by_id(file.id).await.unwrap().unwrap();
        assert_eq!(updated.stored_tags(), tags);
    }

    #[tokio::test]
    async fn test_clear_scan_times_makes_everything_eligible() {
        let (_dir, db) = test_db().await;
        let repo = db.media_files();
        let a = repo.insert(create("/music/a.mp3")).await.unwrap();
        repo.insert(create("/music/b.mp3")).await.unwrap();
        repo.set_last_file_scan_time(a.id, Utc::now()).await.unwrap();

        assert_eq!(repo.count_never_scanned().await.unwrap(), 1);
        assert_eq!(repo.clear_scan_times().await.unwrap(), 1);
        assert_eq!(repo.count_never_scanned().await.unwrap(), 2);
        assert!(repo
            .select_next_to_scan(DateTime::<Utc>::UNIX_EPOCH)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_out_of_range_duration_is_not_stored() {
        let (_dir, db) = test_db().await;
        let repo = db.media_files();
        let mut input = create("/music/endless.flac");
        input.tags.duration_ms = Some(u64::MAX);

        let record = repo.insert(input).await.unwrap();
        assert_eq!(record.duration_ms, None);

        let tags = Tags {
            duration_ms: Some(u64::MAX),
            ..record.stored_tags()
        };
        assert!(repo.update_from_tags(record.id, &tags).await.unwrap().contains(&"duration_ms"));
        assert_eq!(repo.get_by_id(record.id).await.unwrap().unwrap().duration_ms, None);
    }

    #[tokio::test]
    async fn test_update_missing_file_fails() {
        let (_dir, db) = test_db().await;
        let err = db
            .media_files()
            .update_from_tags(Uuid::new_v4(), &Tags::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_mark_missing_file_reports_false() {
        let (_dir, db) = test_db().await;
        let marked = db
            .media_files()
            .set_last_file_scan_time(Uuid::new_v4(), Utc::now())
            .await
            .unwrap();
        assert!(!marked);
    }
}
