use anyhow::Context;
use async_trait::async_trait;
use uuid::Uuid;

use super::repo_types::{Booking, BookingQuery, NewBooking, StatusChange, StatusTotal};
use crate::payments::repo_types::PaymentStatus;
use crate::store::PgStore;

#[async_trait]
pub trait BookingRepo: Send + Sync {
    /// `None` when the booking number is already taken.
    async fn insert_booking(&self, new: &NewBooking) -> anyhow::Result<Option<Booking>>;
    async fn find_booking(&self, id: Uuid) -> anyhow::Result<Option<Booking>>;
    async fn find_booking_by_number(&self, number: &str) -> anyhow::Result<Option<Booking>>;
    /// Newest first, with the total count matching the filters.
    async fn list_bookings(&self, q: &BookingQuery) -> anyhow::Result<(Vec<Booking>, i64)>;
    /// Compare-and-set on the status. `None` when the stored status is no
    /// longer `change.expected`; nothing is written in that case.
    async fn apply_status_change(&self, change: &StatusChange) -> anyhow::Result<Option<Booking>>;
    /// One row per status present, over every booking or one user's.
    async fn booking_status_totals(&self, user_id: Option<Uuid>) -> anyhow::Result<Vec<StatusTotal>>;
}

const BOOKING_COLUMNS: &str = "id, booking_number, user_id, caregiver_id, service_id, date, \
     start_time, hours, address, special_requests, emergency_contact, medical_conditions, \
     hourly_rate_cents, tax_rate_bps, subtotal_cents, tax_cents, total_cents, currency, \
     status, payment_status, cancellation_reason, cancelled_at, review_id, created_at, updated_at";

const LIST_FILTER: &str = "($1::uuid IS NULL OR user_id = $1) \
     AND ($2::text IS NULL OR status = $2) \
     AND ($3::date IS NULL OR date >= $3) \
     AND ($4::date IS NULL OR date <= $4)";

#[async_trait]
impl BookingRepo for PgStore {
    async fn insert_booking(&self, new: &NewBooking) -> anyhow::Result<Option<Booking>> {
        let sql = format!(
            r#"
            INSERT INTO bookings (id, booking_number, user_id, service_id, date, start_time, hours,
                                  address, special_requests, emergency_contact, medical_conditions,
                                  hourly_rate_cents, tax_rate_bps, subtotal_cents, tax_cents,
                                  total_cents, currency, status, payment_status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                    'PENDING', 'PENDING')
            ON CONFLICT (booking_number) DO NOTHING
            RETURNING {BOOKING_COLUMNS}
            "#
        );
        let booking = sqlx::query_as::<_, Booking>(&sql)
            .bind(new.id)
            .bind(&new.booking_number)
            .bind(new.user_id)
            .bind(new.service_id)
            .bind(new.date)
            .bind(&new.start_time)
            .bind(new.hours)
            .bind(&new.address)
            .bind(&new.special_requests)
            .bind(&new.emergency_contact)
            .bind(&new.medical_conditions)
            .bind(new.hourly_rate_cents)
            .bind(new.tax_rate_bps)
            .bind(new.subtotal_cents)
            .bind(new.tax_cents)
            .bind(new.total_cents)
            .bind(&new.currency)
            .fetch_optional(&self.db)
            .await
            .context("insert booking")?;
        Ok(booking)
    }

    async fn find_booking(&self, id: Uuid) -> anyhow::Result<Option<Booking>> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
        let booking = sqlx::query_as::<_, Booking>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find booking")?;
        Ok(booking)
    }

    async fn find_booking_by_number(&self, number: &str) -> anyhow::Result<Option<Booking>> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE booking_number = $1");
        let booking = sqlx::query_as::<_, Booking>(&sql)
            .bind(number)
            .fetch_optional(&self.db)
            .await
            .context("find booking by number")?;
        Ok(booking)
    }

    async fn list_bookings(&self, q: &BookingQuery) -> anyhow::Result<(Vec<Booking>, i64)> {
        let status = q.status.map(|s| s.as_str());

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM bookings WHERE {LIST_FILTER}"
        ))
        .bind(q.user_id)
        .bind(status)
        .bind(q.date_from)
        .bind(q.date_to)
        .fetch_one(&self.db)
        .await
        .context("count bookings")?;

        let sql = format!(
            r#"
            SELECT {BOOKING_COLUMNS}
              FROM bookings
             WHERE {LIST_FILTER}
             ORDER BY created_at DESC, id DESC
             LIMIT $5 OFFSET $6
            "#
        );
        let rows = sqlx::query_as::<_, Booking>(&sql)
            .bind(q.user_id)
            .bind(status)
            .bind(q.date_from)
            .bind(q.date_to)
            .bind(q.limit)
            .bind(q.offset)
            .fetch_all(&self.db)
            .await
            .context("list bookings")?;

        Ok((rows, total))
    }

    async fn apply_status_change(&self, change: &StatusChange) -> anyhow::Result<Option<Booking>> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        let sql = format!(
            r#"
            UPDATE bookings
               SET status = $3,
                   caregiver_id = COALESCE($4, caregiver_id),
                   cancellation_reason = COALESCE($5, cancellation_reason),
                   cancelled_at = COALESCE($6, cancelled_at),
                   updated_at = now()
             WHERE id = $1 AND status = $2
            RETURNING {BOOKING_COLUMNS}
            "#
        );
        let Some(mut booking) = sqlx::query_as::<_, Booking>(&sql)
            .bind(change.booking_id)
            .bind(change.expected.as_str())
            .bind(change.next.as_str())
            .bind(change.caregiver_id)
            .bind(&change.cancellation_reason)
            .bind(change.cancelled_at)
            .fetch_optional(&mut *tx)
            .await
            .context("conditional status update")?
        else {
            return Ok(None);
        };

        if let Some(caregiver_id) = change.credit_caregiver {
            sqlx::query(
                "UPDATE users SET completed_jobs = completed_jobs + 1, updated_at = now() WHERE id = $1",
            )
            .bind(caregiver_id)
            .execute(&mut *tx)
            .await
            .context("credit caregiver")?;
        }

        if let Some(p) = &change.open_payment {
            sqlx::query(
                r#"
                INSERT INTO payments (id, booking_id, user_id, amount_cents, currency, status, method)
                VALUES ($1, $2, $3, $4, $5, 'PENDING', $6)
                "#,
            )
            .bind(p.id)
            .bind(p.booking_id)
            .bind(p.user_id)
            .bind(p.amount_cents)
            .bind(&p.currency)
            .bind(p.method.as_str())
            .execute(&mut *tx)
            .await
            .context("open payment")?;
        }

        if let Some(message) = &change.void_pending {
            let voided = sqlx::query(
                r#"
                UPDATE payments
                   SET status = 'FAILED', error_message = $2, updated_at = now()
                 WHERE booking_id = $1 AND status = 'PENDING'
                "#,
            )
            .bind(change.booking_id)
            .bind(message)
            .execute(&mut *tx)
            .await
            .context("void pending payments")?
            .rows_affected();

            if voided > 0 {
                let sql = format!(
                    "UPDATE bookings SET payment_status = 'FAILED' \
                     WHERE id = $1 AND payment_status = 'PENDING' RETURNING {BOOKING_COLUMNS}"
                );
                if let Some(b) = sqlx::query_as::<_, Booking>(&sql)
                    .bind(change.booking_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .context("mark booking payment failed")?
                {
                    booking = b;
                }
            }
        }

        if let Some(refund) = &change.refund {
            let refunded = sqlx::query(
                r#"
                UPDATE payments
                   SET status = 'REFUNDED',
                       refund_amount_cents = amount_cents,
                       refund_reason = $2,
                       refunded_at = $3,
                       updated_at = now()
                 WHERE booking_id = $1 AND status = 'PAID'
                "#,
            )
            .bind(change.booking_id)
            .bind(&refund.reason)
            .bind(refund.at)
            .execute(&mut *tx)
            .await
            .context("refund payments")?
            .rows_affected();

            if refunded > 0 {
                let sql = format!(
                    "UPDATE bookings SET payment_status = $2 WHERE id = $1 RETURNING {BOOKING_COLUMNS}"
                );
                booking = sqlx::query_as::<_, Booking>(&sql)
                    .bind(change.booking_id)
                    .bind(PaymentStatus::Refunded.as_str())
                    .fetch_one(&mut *tx)
                    .await
                    .context("mark booking refunded")?;
            }
        }

        tx.commit().await.context("commit tx")?;
        Ok(Some(booking))
    }

    async fn booking_status_totals(&self, user_id: Option<Uuid>) -> anyhow::Result<Vec<StatusTotal>> {
        let rows = sqlx::query_as::<_, StatusTotal>(
            r#"
            SELECT status,
                   COUNT(*) AS count,
                   COALESCE(SUM(total_cents) FILTER (WHERE payment_status = 'PAID'), 0)::BIGINT
                       AS paid_cents
              FROM bookings
             WHERE ($1::uuid IS NULL OR user_id = $1)
             GROUP BY status
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("booking status totals")?;
        Ok(rows)
    }
}
