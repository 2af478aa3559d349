use anyhow::Context;
use async_trait::async_trait;
use sqlx::types::Json;
use uuid::Uuid;

use super::repo_types::{NewReview, RatingSummary, Review};
use crate::store::PgStore;

#[async_trait]
pub trait ReviewRepo: Send + Sync {
    /// Stores the review and links it from the booking. `None` when the
    /// booking already has a review.
    async fn insert_review(&self, new: &NewReview) -> anyhow::Result<Option<Review>>;
    /// Newest first, with the caregiver's total review count.
    async fn list_caregiver_reviews(
        &self,
        caregiver_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<(Vec<Review>, i64)>;
    async fn caregiver_rating(&self, caregiver_id: Uuid) -> anyhow::Result<RatingSummary>;
}

const REVIEW_COLUMNS: &str =
    "id, booking_id, user_id, caregiver_id, service_id, rating, comment, criteria, created_at";

#[async_trait]
impl ReviewRepo for PgStore {
    async fn insert_review(&self, new: &NewReview) -> anyhow::Result<Option<Review>> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        let sql = format!(
            r#"
            INSERT INTO reviews (id, booking_id, user_id, caregiver_id, service_id, rating, comment, criteria)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (booking_id) DO NOTHING
            RETURNING {REVIEW_COLUMNS}
            "#
        );
        let Some(review) = sqlx::query_as::<_, Review>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.booking_id)
            .bind(new.user_id)
            .bind(new.caregiver_id)
            .bind(new.service_id)
            .bind(new.rating)
            .bind(&new.comment)
            .bind(Json(&new.criteria))
            .fetch_optional(&mut *tx)
            .await
            .context("insert review")?
        else {
            return Ok(None);
        };

        sqlx::query("UPDATE bookings SET review_id = $2, updated_at = now() WHERE id = $1")
            .bind(new.booking_id)
            .bind(review.id)
            .execute(&mut *tx)
            .await
            .context("link review to booking")?;

        tx.commit().await.context("commit tx")?;
        Ok(Some(review))
    }

    async fn list_caregiver_reviews(
        &self,
        caregiver_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<(Vec<Review>, i64)> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM reviews WHERE caregiver_id = $1",
        )
        .bind(caregiver_id)
        .fetch_one(&self.db)
        .await
        .context("count reviews")?;

        let sql = format!(
            r#"
            SELECT {REVIEW_COLUMNS}
              FROM reviews
             WHERE caregiver_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3
            "#
        );
        let rows = sqlx::query_as::<_, Review>(&sql)
            .bind(caregiver_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.db)
            .await
            .context("list reviews")?;
        Ok((rows, total))
    }

    async fn caregiver_rating(&self, caregiver_id: Uuid) -> anyhow::Result<RatingSummary> {
        let (count, average) = sqlx::query_as::<_, (i64, Option<f64>)>(
            "SELECT COUNT(*), AVG(rating)::float8 FROM reviews WHERE caregiver_id = $1",
        )
        .bind(caregiver_id)
        .fetch_one(&self.db)
        .await
        .context("caregiver rating")?;
        Ok(RatingSummary { count, average })
    }
}
