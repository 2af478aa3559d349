use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{
        BookingListQuery, BookingResponse, BookingsResponse, CancelBookingRequest,
        CreateBookingRequest, InvoiceResponse, RefundRequest, StatsQuery, StatsResponse,
        UpdateBookingRequest,
    },
    services::{self, BookingLookup},
};
use crate::{
    auth::AuthUser,
    error::AppError,
    extract::{ApiJson, ApiPath, ApiQuery},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/bookings",
            get(get_bookings)
                .post(create_booking)
                .put(update_booking)
                .delete(cancel_booking),
        )
        .route("/bookings/stats", get(booking_stats))
        .route("/bookings/:id/invoice", get(booking_invoice))
        .route("/bookings/:id/refund", post(refund_booking))
}

#[instrument(skip(state, payload))]
pub async fn create_booking(
    State(state): State<AppState>,
    who: AuthUser,
    ApiJson(payload): ApiJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let booking = services::create_booking(&state, &who, payload).await?;
    Ok((StatusCode::CREATED, Json(BookingResponse { success: true, booking })))
}

/// `?id=` or `?booking_number=` returns one booking, anything else a page.
#[instrument(skip(state))]
pub async fn get_bookings(
    State(state): State<AppState>,
    who: AuthUser,
    ApiQuery(q): ApiQuery<BookingListQuery>,
) -> Result<Response, AppError> {
    let lookup = match (q.id, q.booking_number.as_deref()) {
        (Some(id), _) => Some(BookingLookup::Id(id)),
        (None, Some(n)) if !n.trim().is_empty() => Some(BookingLookup::Number(n.to_string())),
        _ => None,
    };
    if let Some(lookup) = lookup {
        let booking = services::get_booking(&state, &who, lookup).await?;
        return Ok(Json(BookingResponse { success: true, booking }).into_response());
    }

    let (bookings, pagination) = services::list_bookings(&state, &who, &q).await?;
    Ok(Json(BookingsResponse {
        success: true,
        bookings,
        pagination,
    })
    .into_response())
}

#[instrument(skip(state, payload))]
pub async fn update_booking(
    State(state): State<AppState>,
    who: AuthUser,
    ApiJson(payload): ApiJson<UpdateBookingRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = services::update_status(&state, &who, payload).await?;
    Ok(Json(BookingResponse { success: true, booking }))
}

#[instrument(skip(state, payload))]
pub async fn cancel_booking(
    State(state): State<AppState>,
    who: AuthUser,
    ApiJson(payload): ApiJson<CancelBookingRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = services::cancel_booking(&state, &who, payload.id, payload.reason).await?;
    Ok(Json(BookingResponse { success: true, booking }))
}

#[instrument(skip(state, payload))]
pub async fn refund_booking(
    State(state): State<AppState>,
    who: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    payload: Option<ApiJson<RefundRequest>>,
) -> Result<Json<BookingResponse>, AppError> {
    let reason = payload.and_then(|ApiJson(r)| r.reason);
    let booking = services::refund_booking(&state, &who, id, reason).await?;
    Ok(Json(BookingResponse { success: true, booking }))
}

#[instrument(skip(state))]
pub async fn booking_invoice(
    State(state): State<AppState>,
    who: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = services::booking_invoice(&state, &who, id).await?;
    Ok(Json(InvoiceResponse { success: true, invoice }))
}

#[instrument(skip(state))]
pub async fn booking_stats(
    State(state): State<AppState>,
    who: AuthUser,
    ApiQuery(q): ApiQuery<StatsQuery>,
) -> Result<Json<StatsResponse>, AppError> {
    let stats = services::booking_stats(&state, &who, q.user_id).await?;
    Ok(Json(StatsResponse {
        success: true,
        stats,
        currency: state.config.booking.currency.clone(),
    }))
}
