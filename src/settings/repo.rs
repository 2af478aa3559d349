use anyhow::Context;
use async_trait::async_trait;
use sqlx::types::Json;

use super::repo_types::{SettingUpdate, SystemSetting};
use crate::store::PgStore;

#[async_trait]
pub trait SettingsRepo: Send + Sync {
    async fn get_setting(&self, key: &str) -> anyhow::Result<Option<SystemSetting>>;
    async fn list_settings(&self, public_only: bool) -> anyhow::Result<Vec<SystemSetting>>;
    async fn upsert_setting(&self, update: &SettingUpdate) -> anyhow::Result<SystemSetting>;
}

const SETTING_COLUMNS: &str =
    "key, value, description, category, is_public, updated_by, updated_at";

#[async_trait]
impl SettingsRepo for PgStore {
    async fn get_setting(&self, key: &str) -> anyhow::Result<Option<SystemSetting>> {
        let sql = format!("SELECT {SETTING_COLUMNS} FROM system_settings WHERE key = $1");
        let setting = sqlx::query_as::<_, SystemSetting>(&sql)
            .bind(key)
            .fetch_optional(&self.db)
            .await
            .context("get setting")?;
        Ok(setting)
    }

    async fn list_settings(&self, public_only: bool) -> anyhow::Result<Vec<SystemSetting>> {
        let sql = format!(
            "SELECT {SETTING_COLUMNS} FROM system_settings \
             WHERE ($1 = FALSE OR is_public) ORDER BY category, key"
        );
        let rows = sqlx::query_as::<_, SystemSetting>(&sql)
            .bind(public_only)
            .fetch_all(&self.db)
            .await
            .context("list settings")?;
        Ok(rows)
    }

    async fn upsert_setting(&self, update: &SettingUpdate) -> anyhow::Result<SystemSetting> {
        let sql = format!(
            r#"
            INSERT INTO system_settings (key, value, description, category, is_public, updated_by)
            VALUES ($1, $2, $3, COALESCE($4, 'GENERAL'), COALESCE($5, FALSE), $6)
            ON CONFLICT (key) DO UPDATE
               SET value = EXCLUDED.value,
                   description = COALESCE($3, system_settings.description),
                   category = COALESCE($4, system_settings.category),
                   is_public = COALESCE($5, system_settings.is_public),
                   updated_by = EXCLUDED.updated_by,
                   updated_at = now()
            RETURNING {SETTING_COLUMNS}
            "#
        );
        let setting = sqlx::query_as::<_, SystemSetting>(&sql)
            .bind(&update.key)
            .bind(Json(&update.value))
            .bind(&update.description)
            .bind(&update.category)
            .bind(update.is_public)
            .bind(update.updated_by)
            .fetch_one(&self.db)
            .await
            .context("upsert setting")?;
        Ok(setting)
    }
}
