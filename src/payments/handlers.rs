use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{PaymentFilter, PaymentResponse, PaymentsResponse, SettleRequest},
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
        .route("/payments", get(list_payments))
        .route("/payments/:id/settle", post(settle_payment))
}

#[instrument(skip(state))]
pub async fn list_payments(
    State(state): State<AppState>,
    who: AuthUser,
    ApiQuery(filter): ApiQuery<PaymentFilter>,
) -> Result<Json<PaymentsResponse>, AppError> {
    let payments = services::payments_for_booking(&state, &who, filter.booking_id).await?;
    Ok(Json(PaymentsResponse { success: true, payments }))
}

#[instrument(skip(state, payload))]
pub async fn settle_payment(
    State(state): State<AppState>,
    who: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<SettleRequest>,
) -> Result<Json<PaymentResponse>, AppError> {
    let payment = services::settle_payment(&state, &who, payload.into_settlement(id)).await?;
    Ok(Json(PaymentResponse { success: true, payment }))
}
