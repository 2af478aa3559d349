use anyhow::Context;
use async_trait::async_trait;
use uuid::Uuid;

use super::repo_types::{Payment, PaymentSettlement};
use crate::store::PgStore;

#[async_trait]
pub trait PaymentRepo: Send + Sync {
    async fn find_payment(&self, id: Uuid) -> anyhow::Result<Option<Payment>>;
    /// Oldest first.
    async fn list_payments_for_booking(&self, booking_id: Uuid) -> anyhow::Result<Vec<Payment>>;
    /// PENDING → PAID/FAILED, mirrored onto the booking's payment status.
    /// `None` when the payment is no longer PENDING.
    async fn settle_payment(&self, s: &PaymentSettlement) -> anyhow::Result<Option<Payment>>;
}

const PAYMENT_COLUMNS: &str = "id, booking_id, user_id, amount_cents, currency, status, method, \
     external_reference, receipt_url, refund_amount_cents, refund_reason, refunded_at, \
     error_message, created_at, updated_at";

#[async_trait]
impl PaymentRepo for PgStore {
    async fn find_payment(&self, id: Uuid) -> anyhow::Result<Option<Payment>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1");
        let payment = sqlx::query_as::<_, Payment>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find payment")?;
        Ok(payment)
    }

    async fn list_payments_for_booking(&self, booking_id: Uuid) -> anyhow::Result<Vec<Payment>> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE booking_id = $1 ORDER BY created_at, id"
        );
        let rows = sqlx::query_as::<_, Payment>(&sql)
            .bind(booking_id)
            .fetch_all(&self.db)
            .await
            .context("list payments")?;
        Ok(rows)
    }

    async fn settle_payment(&self, s: &PaymentSettlement) -> anyhow::Result<Option<Payment>> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        let status = s.outcome();

        let sql = format!(
            r#"
            UPDATE payments
               SET status = $2,
                   external_reference = COALESCE($3, external_reference),
                   receipt_url = COALESCE($4, receipt_url),
                   error_message = $5,
                   updated_at = now()
             WHERE id = $1 AND status = 'PENDING'
            RETURNING {PAYMENT_COLUMNS}
            "#
        );
        let Some(payment) = sqlx::query_as::<_, Payment>(&sql)
            .bind(s.payment_id)
            .bind(status.as_str())
            .bind(&s.external_reference)
            .bind(&s.receipt_url)
            .bind(&s.error_message)
            .fetch_optional(&mut *tx)
            .await
            .context("settle payment")?
        else {
            return Ok(None);
        };

        sqlx::query("UPDATE bookings SET payment_status = $2, updated_at = now() WHERE id = $1")
            .bind(payment.booking_id)
            .bind(status.as_str())
            .execute(&mut *tx)
            .await
            .context("mirror payment status")?;

        tx.commit().await.context("commit tx")?;
        Ok(Some(payment))
    }
}
