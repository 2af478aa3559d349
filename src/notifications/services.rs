use tracing::info;
use uuid::Uuid;

use super::repo_types::{Notification, NotificationPage, NotificationQuery};
use crate::{auth::AuthUser, error::AppError, pagination::PageParams, state::AppState};

pub async fn list_notifications(
    st: &AppState,
    who: &AuthUser,
    unread_only: bool,
    page: &PageParams,
) -> Result<NotificationPage, AppError> {
    let q = NotificationQuery {
        user_id: who.id,
        unread_only,
        limit: page.limit(),
        offset: page.offset(),
    };
    Ok(st.store.list_notifications(&q).await?)
}

pub async fn mark_read(st: &AppState, who: &AuthUser, id: Uuid) -> Result<Notification, AppError> {
    st.store
        .mark_notification_read(id, who.id)
        .await?
        .ok_or(AppError::NotFound("notification"))
}

pub async fn mark_all_read(st: &AppState, who: &AuthUser) -> Result<u64, AppError> {
    let n = st.store.mark_all_notifications_read(who.id).await?;
    info!(user_id = %who.id, marked = n, "notifications marked read");
    Ok(n)
}
