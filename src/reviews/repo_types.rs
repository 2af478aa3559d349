use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

/// Optional per-aspect sub-ratings, each 1..=5.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewCriteria {
    pub professionalism: Option<i32>,
    pub punctuality: Option<i32>,
    pub communication: Option<i32>,
    pub quality: Option<i32>,
    pub value: Option<i32>,
}

impl ReviewCriteria {
    pub fn scores(&self) -> [(&'static str, Option<i32>); 5] {
        [
            ("professionalism", self.professionalism),
            ("punctuality", self.punctuality),
            ("communication", self.communication),
            ("quality", self.quality),
            ("value", self.value),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub caregiver_id: Uuid,
    pub service_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub criteria: Json<ReviewCriteria>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub caregiver_id: Uuid,
    pub service_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub criteria: ReviewCriteria,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RatingSummary {
    pub count: i64,
    pub average: Option<f64>,
}
