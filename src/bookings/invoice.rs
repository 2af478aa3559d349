//! Invoices rendered from a booking's pricing snapshot. Amounts are never
//! recomputed here, so an invoice always agrees with what was booked.

use serde::Serialize;
use time::{Date, Duration};
use uuid::Uuid;

use super::repo_types::Booking;
use crate::{auth::repo_types::User, payments::repo_types::PaymentStatus};

time::serde::format_description!(invoice_date, Date, "[year]-[month]-[day]");

pub const PAYMENT_TERMS_DAYS: i64 = 7;

const PAYMENT_INSTRUCTIONS: &str =
    "Payment due within 7 days. You can pay by card, bank transfer or cash.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillTo {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceLine {
    pub description: String,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invoice {
    pub invoice_number: String,
    pub booking_id: Uuid,
    pub booking_number: String,
    #[serde(with = "invoice_date")]
    pub issued_on: Date,
    #[serde(with = "invoice_date")]
    pub due_on: Date,
    pub bill_to: BillTo,
    pub items: Vec<InvoiceLine>,
    pub subtotal_cents: i64,
    pub tax_rate_bps: i32,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub currency: String,
    pub payment_status: PaymentStatus,
    pub payment_instructions: &'static str,
}

/// `BK00123000ABCD` → `INV00123000ABCD`.
pub fn invoice_number(booking_number: &str) -> String {
    let tail = booking_number.strip_prefix("BK").unwrap_or(booking_number);
    format!("INV{tail}")
}

/// `customer` is `None` when the owning account no longer resolves; the
/// invoice is still issued against the booking address.
pub fn build_invoice(
    booking: &Booking,
    service_name: &str,
    customer: Option<&User>,
    issued_on: Date,
) -> Invoice {
    let bill_to = BillTo {
        name: customer.map_or_else(|| "Customer".to_string(), |u| u.name.clone()),
        email: customer.map(|u| u.email.clone()),
        phone: customer.and_then(|u| u.phone.clone()),
        address: booking.address.clone(),
    };
    let line = InvoiceLine {
        description: format!("{service_name} service ({} h)", booking.hours),
        quantity: booking.hours,
        unit_price_cents: booking.hourly_rate_cents,
        amount_cents: booking.subtotal_cents,
    };

    Invoice {
        invoice_number: invoice_number(&booking.booking_number),
        booking_id: booking.id,
        booking_number: booking.booking_number.clone(),
        issued_on,
        due_on: issued_on + Duration::days(PAYMENT_TERMS_DAYS),
        bill_to,
        items: vec![line],
        subtotal_cents: booking.subtotal_cents,
        tax_rate_bps: booking.tax_rate_bps,
        tax_cents: booking.tax_cents,
        total_cents: booking.total_cents,
        currency: booking.currency.clone(),
        payment_status: booking.payment_status,
        payment_instructions: PAYMENT_INSTRUCTIONS,
    }
}
