use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use super::{
    invoice::Invoice,
    repo_types::{Booking, BookingStats, BookingStatus},
};
use crate::pagination::{PageMeta, PageParams};
use crate::payments::repo_types::PaymentMethod;

time::serde::format_description!(wire_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    #[serde(alias = "serviceId")]
    pub service_id: Uuid,
    #[serde(with = "wire_date")]
    pub date: Date,
    #[serde(alias = "startTime")]
    pub start_time: String,
    pub hours: i32,
    pub address: String,
    #[serde(alias = "specialRequests")]
    pub special_requests: Option<String>,
    #[serde(alias = "emergencyContact")]
    pub emergency_contact: Option<String>,
    #[serde(alias = "medicalConditions")]
    pub medical_conditions: Option<String>,
}

/// `GET /bookings` query: a single booking by `id` / `booking_number`, or a page.
#[derive(Debug, Default, Deserialize)]
pub struct BookingListQuery {
    pub id: Option<Uuid>,
    #[serde(alias = "bookingNumber")]
    pub booking_number: Option<String>,
    pub status: Option<BookingStatus>,
    pub user_id: Option<Uuid>,
    #[serde(default, with = "wire_date::option")]
    pub date_from: Option<Date>,
    #[serde(default, with = "wire_date::option")]
    pub date_to: Option<Date>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl BookingListQuery {
    pub fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateBookingRequest {
    pub id: Uuid,
    pub status: BookingStatus,
    pub reason: Option<String>,
    #[serde(alias = "caregiverId")]
    pub caregiver_id: Option<Uuid>,
    #[serde(alias = "paymentMethod")]
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Deserialize)]
pub struct CancelBookingRequest {
    pub id: Uuid,
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefundRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub success: bool,
    pub booking: Booking,
}

#[derive(Debug, Serialize)]
pub struct BookingsResponse {
    pub success: bool,
    pub bookings: Vec<Booking>,
    pub pagination: PageMeta,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    #[serde(alias = "userId")]
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: BookingStats,
    pub currency: String,
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub success: bool,
    pub invoice: Invoice,
}
