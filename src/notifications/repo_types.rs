use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::store::text_enum;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    BookingCreated,
    BookingConfirmed,
    BookingCancelled,
    BookingStarted,
    CaregiverAssigned,
    ReviewRequest,
    PaymentSuccess,
    PaymentFailed,
    PaymentRefunded,
    System,
}

text_enum!(NotificationType {
    BookingCreated => "BOOKING_CREATED",
    BookingConfirmed => "BOOKING_CONFIRMED",
    BookingCancelled => "BOOKING_CANCELLED",
    BookingStarted => "BOOKING_STARTED",
    CaregiverAssigned => "CAREGIVER_ASSIGNED",
    ReviewRequest => "REVIEW_REQUEST",
    PaymentSuccess => "PAYMENT_SUCCESS",
    PaymentFailed => "PAYMENT_FAILED",
    PaymentRefunded => "PAYMENT_REFUNDED",
    System => "SYSTEM",
});

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

text_enum!(Priority {
    Low => "LOW",
    Medium => "MEDIUM",
    High => "HIGH",
    Urgent => "URGENT",
});

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(try_from = "String")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub data: Json<serde_json::Value>,
    #[sqlx(try_from = "String")]
    pub priority: Priority,
    pub is_read: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub read_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
    pub priority: Priority,
}

impl NewNotification {
    pub fn new(
        user_id: Uuid,
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            notification_type,
            title: title.into(),
            message: message.into(),
            data: serde_json::Value::Object(Default::default()),
            priority: Priority::default(),
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct NotificationQuery {
    pub user_id: Uuid,
    pub unread_only: bool,
    pub limit: i64,
    pub offset: i64,
}

/// One page plus the counters shown next to it.
#[derive(Debug, Clone)]
pub struct NotificationPage {
    pub items: Vec<Notification>,
    pub total: i64,
    pub unread: i64,
}
