use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{SettingResponse, SettingsResponse, UpdateSettingRequest},
    services,
};
use crate::{
    auth::AuthUser,
    error::AppError,
    extract::{ApiJson, ApiPath},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/settings", get(public_settings))
        .route("/admin/settings", get(all_settings))
        .route("/admin/settings/:key", get(get_setting).put(update_setting))
}

#[instrument(skip(state))]
pub async fn public_settings(
    State(state): State<AppState>,
) -> Result<Json<SettingsResponse>, AppError> {
    let settings = services::list_settings(&state, true).await?;
    Ok(Json(SettingsResponse { success: true, settings }))
}

#[instrument(skip(state))]
pub async fn all_settings(
    State(state): State<AppState>,
    who: AuthUser,
) -> Result<Json<SettingsResponse>, AppError> {
    who.require_admin()?;
    let settings = services::list_settings(&state, false).await?;
    Ok(Json(SettingsResponse { success: true, settings }))
}

#[instrument(skip(state))]
pub async fn get_setting(
    State(state): State<AppState>,
    who: AuthUser,
    ApiPath(key): ApiPath<String>,
) -> Result<Json<SettingResponse>, AppError> {
    let setting = services::get_setting(&state, &who, &key).await?;
    Ok(Json(SettingResponse { success: true, setting }))
}

#[instrument(skip(state, payload))]
pub async fn update_setting(
    State(state): State<AppState>,
    who: AuthUser,
    ApiPath(key): ApiPath<String>,
    ApiJson(payload): ApiJson<UpdateSettingRequest>,
) -> Result<Json<SettingResponse>, AppError> {
    let setting = services::update_setting(
        &state,
        &who,
        &key,
        payload.value,
        payload.description,
        payload.category,
        payload.is_public,
    )
    .await?;
    Ok(Json(SettingResponse { success: true, setting }))
}
