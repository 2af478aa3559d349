use axum::{
    extract::State,
    routing::{delete, get, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{CaregiverFilter, CaregiversResponse, ChangeRoleRequest, RemovedUserResponse},
    services,
};
use crate::{
    auth::{
        dto::{PublicUser, UserResponse},
        repo_types::CaregiverProfile,
        AuthUser,
    },
    error::AppError,
    extract::{ApiJson, ApiPath, ApiQuery},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/me/caregiver-profile", put(update_caregiver_profile))
        .route("/caregivers", get(list_caregivers))
        .route("/admin/users/:id/role", put(change_role))
        .route("/admin/users/:id", delete(remove_user))
}

#[instrument(skip(state, payload))]
pub async fn update_caregiver_profile(
    State(state): State<AppState>,
    who: AuthUser,
    ApiJson(payload): ApiJson<CaregiverProfile>,
) -> Result<Json<UserResponse>, AppError> {
    let user = services::update_caregiver_profile(&state, &who, payload).await?;
    Ok(Json(UserResponse {
        success: true,
        user: PublicUser::from(user),
    }))
}

#[instrument(skip(state))]
pub async fn list_caregivers(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<CaregiverFilter>,
) -> Result<Json<CaregiversResponse>, AppError> {
    let caregivers = services::list_caregivers(&state, filter.available).await?;
    Ok(Json(CaregiversResponse {
        success: true,
        caregivers: caregivers.into_iter().map(Into::into).collect(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn change_role(
    State(state): State<AppState>,
    who: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<ChangeRoleRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = services::change_role(&state, &who, id, payload.role).await?;
    Ok(Json(UserResponse {
        success: true,
        user: PublicUser::from(user),
    }))
}

#[instrument(skip(state))]
pub async fn remove_user(
    State(state): State<AppState>,
    who: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<RemovedUserResponse>, AppError> {
    let unassigned_bookings = services::remove_user(&state, &who, id).await?;
    Ok(Json(RemovedUserResponse {
        success: true,
        user_id: id,
        unassigned_bookings,
    }))
}
