use tracing::{info, warn};
use uuid::Uuid;

use super::dto::CreateReviewRequest;
use super::repo_types::{NewReview, RatingSummary, Review};
use crate::{
    auth::AuthUser,
    bookings::repo_types::BookingStatus,
    error::AppError,
    pagination::{PageMeta, PageParams},
    state::AppState,
};

const MAX_COMMENT_LEN: usize = 2_000;

fn check_score(name: &str, score: i32) -> Result<(), AppError> {
    if !(1..=5).contains(&score) {
        return Err(AppError::validation(format!("{name} must be between 1 and 5")));
    }
    Ok(())
}

pub async fn create_review(
    st: &AppState,
    who: &AuthUser,
    req: CreateReviewRequest,
) -> Result<Review, AppError> {
    check_score("rating", req.rating)?;
    for (name, score) in req.criteria.scores() {
        if let Some(score) = score {
            check_score(name, score)?;
        }
    }
    let comment = req
        .comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    if comment.as_ref().is_some_and(|c| c.chars().count() > MAX_COMMENT_LEN) {
        return Err(AppError::validation("comment is too long"));
    }

    let booking = st
        .store
        .find_booking(req.booking_id)
        .await?
        .ok_or(AppError::NotFound("booking"))?;
    if booking.user_id != who.id {
        return Err(AppError::Forbidden("Only the booking owner can review it"));
    }
    if booking.status != BookingStatus::Completed {
        return Err(AppError::validation("Only completed bookings can be reviewed"));
    }
    let Some(caregiver_id) = booking.caregiver_id else {
        return Err(AppError::validation("Booking has no caregiver to review"));
    };
    if booking.review_id.is_some() {
        return Err(AppError::conflict("Booking has already been reviewed"));
    }

    let new = NewReview {
        booking_id: booking.id,
        user_id: who.id,
        caregiver_id,
        service_id: booking.service_id,
        rating: req.rating,
        comment,
        criteria: req.criteria,
    };
    let Some(review) = st.store.insert_review(&new).await? else {
        warn!(booking_id = %booking.id, "duplicate review");
        return Err(AppError::conflict("Booking has already been reviewed"));
    };

    info!(review_id = %review.id, booking_id = %booking.id, rating = review.rating, "review created");
    Ok(review)
}

pub async fn caregiver_reviews(
    st: &AppState,
    caregiver_id: Uuid,
    page: &PageParams,
) -> Result<(Vec<Review>, RatingSummary, PageMeta), AppError> {
    let (reviews, total) = st
        .store
        .list_caregiver_reviews(caregiver_id, page.limit(), page.offset())
        .await?;
    let rating = st.store.caregiver_rating(caregiver_id).await?;
    Ok((reviews, rating, page.meta(total)))
}
