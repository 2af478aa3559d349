use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{MarkedResponse, NotificationFilter, NotificationResponse, NotificationsResponse},
    services,
};
use crate::{
    auth::AuthUser,
    error::AppError,
    extract::{ApiPath, ApiQuery},
    pagination::PageParams,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/read-all", post(mark_all_read))
        .route("/notifications/:id/read", post(mark_read))
}

#[instrument(skip(state))]
pub async fn list_notifications(
    State(state): State<AppState>,
    who: AuthUser,
    ApiQuery(filter): ApiQuery<NotificationFilter>,
) -> Result<Json<NotificationsResponse>, AppError> {
    let page = PageParams { page: filter.page, limit: filter.limit };
    let result = services::list_notifications(&state, &who, filter.unread, &page).await?;
    Ok(Json(NotificationsResponse {
        success: true,
        pagination: page.meta(result.total),
        unread_count: result.unread,
        notifications: result.items,
    }))
}

#[instrument(skip(state))]
pub async fn mark_read(
    State(state): State<AppState>,
    who: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<NotificationResponse>, AppError> {
    let notification = services::mark_read(&state, &who, id).await?;
    Ok(Json(NotificationResponse { success: true, notification }))
}

#[instrument(skip(state))]
pub async fn mark_all_read(
    State(state): State<AppState>,
    who: AuthUser,
) -> Result<Json<MarkedResponse>, AppError> {
    let marked = services::mark_all_read(&state, &who).await?;
    Ok(Json(MarkedResponse { success: true, marked }))
}
