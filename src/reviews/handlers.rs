use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{CaregiverReviewsResponse, CreateReviewRequest, ReviewResponse},
    services,
};
use crate::{
    auth::AuthUser,
    error::AppError,
    extract::{ApiJson, ApiPath, ApiQuery},
    pagination::PageParams,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reviews", post(create_review))
        .route("/caregivers/:id/reviews", get(caregiver_reviews))
}

#[instrument(skip(state, payload))]
pub async fn create_review(
    State(state): State<AppState>,
    who: AuthUser,
    ApiJson(payload): ApiJson<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ReviewResponse>), AppError> {
    let review = services::create_review(&state, &who, payload).await?;
    Ok((StatusCode::CREATED, Json(ReviewResponse { success: true, review })))
}

#[instrument(skip(state))]
pub async fn caregiver_reviews(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(page): ApiQuery<PageParams>,
) -> Result<Json<CaregiverReviewsResponse>, AppError> {
    let (reviews, rating, pagination) = services::caregiver_reviews(&state, id, &page).await?;
    Ok(Json(CaregiverReviewsResponse {
        success: true,
        reviews,
        rating,
        pagination,
    }))
}
