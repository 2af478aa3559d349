use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::payments::repo_types::{NewPayment, PaymentStatus};
use crate::store::text_enum;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    Refunded,
}

text_enum!(BookingStatus {
    Pending => "PENDING",
    Confirmed => "CONFIRMED",
    InProgress => "IN_PROGRESS",
    Completed => "COMPLETED",
    Cancelled => "CANCELLED",
    Refunded => "REFUNDED",
});

impl BookingStatus {
    pub const ALL: [BookingStatus; 6] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::InProgress,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
        BookingStatus::Refunded,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::Refunded
        )
    }

    /// Direct status edits. REFUNDED is reached only through [`Self::can_refund`].
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, InProgress)
                | (Confirmed, Cancelled)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
        )
    }

    pub fn can_refund(self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Completed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub booking_number: String,
    pub user_id: Uuid,
    pub caregiver_id: Option<Uuid>,
    pub service_id: Uuid,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub start_time: String, // HH:MM, UTC
    pub hours: i32,
    pub address: String,
    pub special_requests: Option<String>,
    pub emergency_contact: Option<String>,
    pub medical_conditions: Option<String>,
    pub hourly_rate_cents: i64,
    pub tax_rate_bps: i32,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub currency: String,
    #[sqlx(try_from = "String")]
    pub status: BookingStatus,
    #[sqlx(try_from = "String")]
    pub payment_status: PaymentStatus,
    pub cancellation_reason: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub cancelled_at: Option<OffsetDateTime>,
    pub review_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Fully validated and priced booking, ready for insertion.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub id: Uuid,
    pub booking_number: String,
    pub user_id: Uuid,
    pub service_id: Uuid,
    pub date: Date,
    pub start_time: String,
    pub hours: i32,
    pub address: String,
    pub special_requests: Option<String>,
    pub emergency_contact: Option<String>,
    pub medical_conditions: Option<String>,
    pub hourly_rate_cents: i64,
    pub tax_rate_bps: i32,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct RefundOrder {
    pub reason: String,
    pub at: OffsetDateTime,
}

/// One conditional transition and the writes that must land with it.
///
/// Applied only if the stored status still equals `expected`.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub booking_id: Uuid,
    pub expected: BookingStatus,
    pub next: BookingStatus,
    pub caregiver_id: Option<Uuid>,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<OffsetDateTime>,
    /// Caregiver whose completed-job counter is incremented.
    pub credit_caregiver: Option<Uuid>,
    pub open_payment: Option<NewPayment>,
    /// Payments still PENDING are closed as FAILED with this message.
    pub void_pending: Option<String>,
    pub refund: Option<RefundOrder>,
}

impl StatusChange {
    pub fn new(booking_id: Uuid, expected: BookingStatus, next: BookingStatus) -> Self {
        Self {
            booking_id,
            expected,
            next,
            caregiver_id: None,
            cancellation_reason: None,
            cancelled_at: None,
            credit_caregiver: None,
            open_payment: None,
            void_pending: None,
            refund: None,
        }
    }
}

/// Bookings in one status, and how much of them has been paid.
#[derive(Debug, Clone, FromRow)]
pub struct StatusTotal {
    #[sqlx(try_from = "String")]
    pub status: BookingStatus,
    pub count: i64,
    pub paid_cents: i64,
}

/// Per-status counts. `total_spent_cents` only counts bookings whose payment
/// went through, so refunded money is not "spent".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BookingStats {
    pub total: i64,
    pub pending: i64,
    pub confirmed: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub refunded: i64,
    pub total_spent_cents: i64,
}

impl BookingStats {
    pub fn from_totals(rows: &[StatusTotal]) -> Self {
        let mut stats = Self::default();
        for row in rows {
            let slot = match row.status {
                BookingStatus::Pending => &mut stats.pending,
                BookingStatus::Confirmed => &mut stats.confirmed,
                BookingStatus::InProgress => &mut stats.in_progress,
                BookingStatus::Completed => &mut stats.completed,
                BookingStatus::Cancelled => &mut stats.cancelled,
                BookingStatus::Refunded => &mut stats.refunded,
            };
            *slot += row.count;
            stats.total += row.count;
            stats.total_spent_cents += row.paid_cents;
        }
        stats
    }
}

#[derive(Debug, Clone, Default)]
pub struct BookingQuery {
    pub user_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
    pub date_from: Option<Date>,
    pub date_to: Option<Date>,
    pub limit: i64,
    pub offset: i64,
}
