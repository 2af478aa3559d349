use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{
        CreateServiceRequest, ServiceFilter, ServiceResponse, ServicesResponse,
        UpdateServiceRequest,
    },
    services,
};
use crate::{
    auth::AuthUser,
    error::AppError,
    extract::{ApiJson, ApiPath, ApiQuery},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/services", get(list_services).post(create_service))
        // GET by slug, PUT by id
        .route("/services/:key", get(get_service).put(update_service))
}

#[instrument(skip(state))]
pub async fn list_services(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ServiceFilter>,
) -> Result<Json<ServicesResponse>, AppError> {
    let services = services::list_services(&state, filter.category.as_deref()).await?;
    Ok(Json(ServicesResponse { success: true, services }))
}

#[instrument(skip(state))]
pub async fn get_service(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<Json<ServiceResponse>, AppError> {
    let service = services::service_by_slug(&state, &slug).await?;
    Ok(Json(ServiceResponse { success: true, service }))
}

#[instrument(skip(state, payload))]
pub async fn create_service(
    State(state): State<AppState>,
    who: AuthUser,
    ApiJson(payload): ApiJson<CreateServiceRequest>,
) -> Result<(StatusCode, Json<ServiceResponse>), AppError> {
    let service = services::create_service(
        &state,
        &who,
        &payload.name,
        payload.slug.as_deref(),
        &payload.category,
        payload.description,
        payload.price_cents,
        payload.features,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(ServiceResponse { success: true, service })))
}

#[instrument(skip(state, payload))]
pub async fn update_service(
    State(state): State<AppState>,
    who: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateServiceRequest>,
) -> Result<Json<ServiceResponse>, AppError> {
    let service = services::update_service(&state, &who, id, payload.into()).await?;
    Ok(Json(ServiceResponse { success: true, service }))
}
