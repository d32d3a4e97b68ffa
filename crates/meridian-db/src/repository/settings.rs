//! # Store Settings Repository
//!
//! Per-store key/value settings. The commit pipeline reads `kds_enabled`.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::DbResult;

/// Repository for store settings.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    /// Creates a new SettingsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Returns the raw value of a setting.
    pub async fn get(&self, store_id: &str, key: &str) -> DbResult<Option<String>> {
        let value: Option<String> = sqlx::query_scalar(
            "SELECT value FROM store_settings WHERE store_id = ?1 AND key = ?2",
        )
        .bind(store_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value)
    }

    /// Reads a boolean flag. Missing → `false`; `"true"`/`"1"` (any case) → `true`.
    pub async fn get_bool(&self, store_id: &str, key: &str) -> DbResult<bool> {
        Ok(self
            .get(store_id, key)
            .await?
            .map(|v| {
                let v = v.trim();
                v.eq_ignore_ascii_case("true") || v == "1"
            })
            .unwrap_or(false))
    }

    /// Creates or replaces a setting.
    pub async fn set(&self, store_id: &str, key: &str, value: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO store_settings (store_id, key, value, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (store_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(store_id)
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
