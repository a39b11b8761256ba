//! Application settings database operations

use anyhow::Result;
use serde_json::Value as JsonValue;
use sqlx::SqlitePool;

use crate::db::sqlite_helpers::{now_iso8601, str_to_datetime};

/// A setting record in the database
#[derive(Debug, Clone)]
pub struct SettingRecord {
    pub key: String,
    pub value: JsonValue,
    pub description: Option<String>,
    pub category: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl sqlx::FromRow<'_, sqlx::sqlite::SqliteRow> for SettingRecord {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> sqlx::Result<Self> {
        use sqlx::Row;

        let created_str: String = row.try_get("created_at")?;
        let updated_str: String = row.try_get("updated_at")?;
        let value_str: String = row.try_get("value")?;

        Ok(Self {
            key: row.try_get("key")?,
            value: serde_json::from_str(&value_str).map_err(|e| sqlx::Error::Decode(e.into()))?,
            description: row.try_get("description")?,
            category: row.try_get("category")?,
            created_at: str_to_datetime(&created_str).map_err(|e| sqlx::Error::Decode(e.into()))?,
            updated_at: str_to_datetime(&updated_str).map_err(|e| sqlx::Error::Decode(e.into()))?,
        })
    }
}

/// Settings repository for database operations
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a setting by key
    pub async fn get(&self, key: &str) -> Result<Option<SettingRecord>> {
        let record =
            sqlx::query_as::<_, SettingRecord>("SELECT * FROM app_settings WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(record)
    }

    /// Get a setting value as a specific type
    pub async fn get_value<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let record = self.get(key).await?;
        match record {
            Some(r) => Ok(Some(serde_json::from_value(r.value)?)),
            None => Ok(None),
        }
    }

    /// Get a setting value with a default
    pub async fn get_or_default<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
        default: T,
    ) -> Result<T> {
        match self.get_value(key).await? {
            Some(v) => Ok(v),
            None => Ok(default),
        }
    }

    /// Set a setting value with category
    pub async fn set_with_category<T: serde::Serialize>(
        &self,
        key: &str,
        value: T,
        category: &str,
        description: Option<&str>,
    ) -> Result<SettingRecord> {
        let json_value = serde_json::to_string(&serde_json::to_value(value)?)?;
        let now = now_iso8601();

        sqlx::query(
            r#"
            INSERT INTO app_settings (key, value, category, description, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            ON CONFLICT (key) DO UPDATE SET
                value = ?2,
                category = ?3,
                description = COALESCE(?4, app_settings.description),
                updated_at = ?5
            "#,
        )
        .bind(key)
        .bind(&json_value)
        .bind(category)
        .bind(description)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get(key).await?.ok_or_else(|| anyhow::anyhow!("Failed to retrieve setting after insert"))
    }
}
