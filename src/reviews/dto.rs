use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::{RatingSummary, Review, ReviewCriteria};
use crate::pagination::PageMeta;

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    #[serde(alias = "bookingId")]
    pub booking_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    #[serde(default)]
    pub criteria: ReviewCriteria,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub success: bool,
    pub review: Review,
}

#[derive(Debug, Serialize)]
pub struct CaregiverReviewsResponse {
    pub success: bool,
    pub reviews: Vec<Review>,
    pub rating: RatingSummary,
    pub pagination: PageMeta,
}
