use anyhow::Context;
use async_trait::async_trait;
use sqlx::types::Json;
use uuid::Uuid;

use super::repo_types::{NewNotification, Notification, NotificationPage, NotificationQuery};
use crate::store::PgStore;

#[async_trait]
pub trait NotificationRepo: Send + Sync {
    async fn insert_notification(&self, new: &NewNotification) -> anyhow::Result<Notification>;
    /// Newest first.
    async fn list_notifications(&self, q: &NotificationQuery) -> anyhow::Result<NotificationPage>;
    /// `None` unless the notification exists and belongs to `user_id`.
    async fn mark_notification_read(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Option<Notification>>;
    async fn mark_all_notifications_read(&self, user_id: Uuid) -> anyhow::Result<u64>;
}

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, notification_type, title, message, data, priority, is_read, read_at, created_at";

#[async_trait]
impl NotificationRepo for PgStore {
    async fn insert_notification(&self, new: &NewNotification) -> anyhow::Result<Notification> {
        let sql = format!(
            r#"
            INSERT INTO notifications (id, user_id, notification_type, title, message, data, priority)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        );
        let n = sqlx::query_as::<_, Notification>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.user_id)
            .bind(new.notification_type.as_str())
            .bind(&new.title)
            .bind(&new.message)
            .bind(Json(&new.data))
            .bind(new.priority.as_str())
            .fetch_one(&self.db)
            .await
            .context("insert notification")?;
        Ok(n)
    }

    async fn list_notifications(&self, q: &NotificationQuery) -> anyhow::Result<NotificationPage> {
        let (total, unread) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT COUNT(*) FILTER (WHERE $2 = FALSE OR NOT is_read),
                   COUNT(*) FILTER (WHERE NOT is_read)
              FROM notifications
             WHERE user_id = $1
            "#,
        )
        .bind(q.user_id)
        .bind(q.unread_only)
        .fetch_one(&self.db)
        .await
        .context("count notifications")?;

        let sql = format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS}
              FROM notifications
             WHERE user_id = $1 AND ($2 = FALSE OR NOT is_read)
             ORDER BY created_at DESC, id DESC
             LIMIT $3 OFFSET $4
            "#
        );
        let items = sqlx::query_as::<_, Notification>(&sql)
            .bind(q.user_id)
            .bind(q.unread_only)
            .bind(q.limit)
            .bind(q.offset)
            .fetch_all(&self.db)
            .await
            .context("list notifications")?;

        Ok(NotificationPage { items, total, unread })
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Option<Notification>> {
        let sql = format!(
            r#"
            UPDATE notifications
               SET is_read = TRUE, read_at = COALESCE(read_at, now())
             WHERE id = $1 AND user_id = $2
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        );
        let n = sqlx::query_as::<_, Notification>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await
            .context("mark notification read")?;
        Ok(n)
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> anyhow::Result<u64> {
        let done = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = now() WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .execute(&self.db)
        .await
        .context("mark all notifications read")?
        .rows_affected();
        Ok(done)
    }
}
