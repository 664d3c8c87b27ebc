//! System Settings Repository

use sqlx::SqlitePool;

use super::RepoResult;
use crate::db::models::SystemSetting;
use crate::utils::time::now_millis;

#[derive(Clone)]
pub struct SettingRepository {
    pool: SqlitePool,
}

impl SettingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, key: &str) -> RepoResult<Option<SystemSetting>> {
        let setting =
            sqlx::query_as::<_, SystemSetting>("SELECT * FROM system_settings WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(setting)
    }

    pub async fn find_all(&self) -> RepoResult<Vec<SystemSetting>> {
        let settings =
            sqlx::query_as::<_, SystemSetting>("SELECT * FROM system_settings ORDER BY key ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(settings)
    }

    /// Upsert a setting value
    pub async fn set(&self, key: &str, value: &str) -> RepoResult<SystemSetting> {
        let setting = sqlx::query_as::<_, SystemSetting>(
            r#"
            INSERT INTO system_settings (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now_millis())
        .fetch_one(&self.pool)
        .await?;
        Ok(setting)
    }
}
