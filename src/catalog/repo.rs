use anyhow::Context;
use async_trait::async_trait;
use sqlx::types::Json;
use uuid::Uuid;

use super::repo_types::{NewService, Service, ServicePatch};
use crate::store::PgStore;

#[async_trait]
pub trait CatalogRepo: Send + Sync {
    /// `None` when the slug is already taken.
    async fn insert_service(&self, new: &NewService) -> anyhow::Result<Option<Service>>;
    async fn find_service(&self, id: Uuid) -> anyhow::Result<Option<Service>>;
    async fn find_service_by_slug(&self, slug: &str) -> anyhow::Result<Option<Service>>;
    /// Active services, by name.
    async fn list_services(&self, category: Option<&str>) -> anyhow::Result<Vec<Service>>;
    async fn update_service(&self, id: Uuid, patch: &ServicePatch)
        -> anyhow::Result<Option<Service>>;
}

const SERVICE_COLUMNS: &str =
    "id, name, slug, category, description, price_cents, features, is_active, created_at, updated_at";

#[async_trait]
impl CatalogRepo for PgStore {
    async fn insert_service(&self, new: &NewService) -> anyhow::Result<Option<Service>> {
        let sql = format!(
            r#"
            INSERT INTO services (id, name, slug, category, description, price_cents, features)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (slug) DO NOTHING
            RETURNING {SERVICE_COLUMNS}
            "#
        );
        let service = sqlx::query_as::<_, Service>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new.name)
            .bind(&new.slug)
            .bind(&new.category)
            .bind(&new.description)
            .bind(new.price_cents)
            .bind(Json(&new.features))
            .fetch_optional(&self.db)
            .await
            .context("insert service")?;
        Ok(service)
    }

    async fn find_service(&self, id: Uuid) -> anyhow::Result<Option<Service>> {
        let sql = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = $1");
        let service = sqlx::query_as::<_, Service>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find service")?;
        Ok(service)
    }

    async fn find_service_by_slug(&self, slug: &str) -> anyhow::Result<Option<Service>> {
        let sql = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE slug = $1");
        let service = sqlx::query_as::<_, Service>(&sql)
            .bind(slug)
            .fetch_optional(&self.db)
            .await
            .context("find service by slug")?;
        Ok(service)
    }

    async fn list_services(&self, category: Option<&str>) -> anyhow::Result<Vec<Service>> {
        let sql = format!(
            "SELECT {SERVICE_COLUMNS} FROM services \
             WHERE is_active AND ($1::text IS NULL OR category = $1) ORDER BY name"
        );
        let rows = sqlx::query_as::<_, Service>(&sql)
            .bind(category)
            .fetch_all(&self.db)
            .await
            .context("list services")?;
        Ok(rows)
    }

    async fn update_service(
        &self,
        id: Uuid,
        patch: &ServicePatch,
    ) -> anyhow::Result<Option<Service>> {
        let sql = format!(
            r#"
            UPDATE services
               SET name = COALESCE($2, name),
                   category = COALESCE($3, category),
                   description = COALESCE($4, description),
                   price_cents = COALESCE($5, price_cents),
                   features = COALESCE($6, features),
                   is_active = COALESCE($7, is_active),
                   updated_at = now()
             WHERE id = $1
            RETURNING {SERVICE_COLUMNS}
            "#
        );
        let service = sqlx::query_as::<_, Service>(&sql)
            .bind(id)
            .bind(&patch.name)
            .bind(&patch.category)
            .bind(&patch.description)
            .bind(patch.price_cents)
            .bind(patch.features.as_ref().map(Json))
            .bind(patch.is_active)
            .fetch_optional(&self.db)
            .await
            .context("update service")?;
        Ok(service)
    }
}
