//! Booking lifecycle: validation, pricing, persistence and transitions.
//!
//! Every operation takes the caller's identity and decides access through
//! [`super::policy`]. Status changes are compare-and-set against the status
//! that was read, so a lost race surfaces as `Conflict` instead of a silent
//! overwrite.

use serde_json::json;
use time::OffsetDateTime;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    dto::{BookingListQuery, CreateBookingRequest, UpdateBookingRequest},
    invoice::{build_invoice, Invoice},
    number::{next_booking_number, MAX_ATTEMPTS},
    policy::{check_cancellation_window, check_transition, check_view, parse_start_time},
    pricing::calculate_pricing,
    repo::BookingRepo,
    repo_types::{
        Booking, BookingQuery, BookingStats, BookingStatus, NewBooking, RefundOrder, StatusChange,
    },
};
use crate::{
    auth::AuthUser,
    catalog::services::bookable_service,
    error::AppError,
    notifications::{
        notify,
        repo_types::{NewNotification, NotificationType, Priority},
    },
    pagination::PageMeta,
    payments::repo_types::NewPayment,
    settings::services::booking_rules,
    state::AppState,
};

/// How a single booking is addressed by clients.
#[derive(Debug, Clone)]
pub enum BookingLookup {
    Id(Uuid),
    Number(String),
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

pub async fn create_booking(
    st: &AppState,
    who: &AuthUser,
    req: CreateBookingRequest,
) -> Result<Booking, AppError> {
    let address = req.address.trim();
    if address.is_empty() {
        return Err(AppError::validation("address is required"));
    }
    if req.hours < 1 {
        return Err(AppError::validation("hours must be at least 1"));
    }
    let start = parse_start_time(&req.start_time)?;
    if req.date < OffsetDateTime::now_utc().date() {
        return Err(AppError::PastDate);
    }

    let rules = booking_rules(st).await?;
    rules.check_hours(req.hours)?;

    let service = bookable_service(st, req.service_id).await?;
    let pricing = calculate_pricing(service.price_cents, req.hours, rules.tax_rate)?;

    let draft = NewBooking {
        id: Uuid::new_v4(),
        booking_number: String::new(),
        user_id: who.id,
        service_id: service.id,
        date: req.date,
        start_time: format!("{:02}:{:02}", start.hour(), start.minute()),
        hours: req.hours,
        address: address.to_string(),
        special_requests: non_empty(req.special_requests),
        emergency_contact: non_empty(req.emergency_contact),
        medical_conditions: non_empty(req.medical_conditions),
        hourly_rate_cents: pricing.hourly_rate_cents,
        tax_rate_bps: pricing.tax_rate_bps as i32, // at most 10_000
        subtotal_cents: pricing.subtotal_cents,
        tax_cents: pricing.tax_cents,
        total_cents: pricing.total_cents,
        currency: rules.currency.clone(),
    };
    let booking = insert_with_retry(st.store.as_ref(), draft, next_booking_number).await?;

    info!(
        booking_id = %booking.id,
        booking_number = %booking.booking_number,
        user_id = %who.id,
        total_cents = booking.total_cents,
        "booking created"
    );
    notify(
        st,
        NewNotification::new(
            booking.user_id,
            NotificationType::BookingCreated,
            "Booking received",
            format!(
                "Your booking {} for {} is awaiting confirmation.",
                booking.booking_number, service.name
            ),
        )
        .with_data(booking_data(&booking)),
    )
    .await;

    Ok(booking)
}

/// Inserts `draft` under fresh booking numbers until one is free.
pub(crate) async fn insert_with_retry<S>(
    store: &S,
    mut draft: NewBooking,
    mut next_number: impl FnMut() -> String,
) -> Result<Booking, AppError>
where
    S: BookingRepo + ?Sized,
{
    for attempt in 1..=MAX_ATTEMPTS {
        draft.booking_number = next_number();
        if let Some(booking) = store.insert_booking(&draft).await? {
            return Ok(booking);
        }
        warn!(attempt, booking_number = %draft.booking_number, "booking number collision");
    }
    error!(attempts = MAX_ATTEMPTS, "booking number generation exhausted");
    Err(AppError::Generation)
}

pub async fn get_booking(
    st: &AppState,
    who: &AuthUser,
    lookup: BookingLookup,
) -> Result<Booking, AppError> {
    let found = match &lookup {
        BookingLookup::Id(id) => st.store.find_booking(*id).await?,
        BookingLookup::Number(n) => st.store.find_booking_by_number(n.trim()).await?,
    };
    let booking = found.ok_or(AppError::NotFound("booking"))?;
    check_view(who, &booking)?;
    Ok(booking)
}

pub async fn update_status(
    st: &AppState,
    who: &AuthUser,
    req: UpdateBookingRequest,
) -> Result<Booking, AppError> {
    let booking = st
        .store
        .find_booking(req.id)
        .await?
        .ok_or(AppError::NotFound("booking"))?;
    let next = req.status;
    check_transition(who, &booking, next)?;

    let now = OffsetDateTime::now_utc();
    if !who.is_admin() {
        let rules = booking_rules(st).await?;
        check_cancellation_window(&booking, now, rules.cancellation_hours)?;
    }
    if req.caregiver_id.is_some() && next != BookingStatus::Confirmed {
        return Err(AppError::validation(
            "a caregiver can only be assigned when confirming",
        ));
    }

    let mut change = StatusChange::new(booking.id, booking.status, next);
    let mut assigned = None;
    match next {
        BookingStatus::Confirmed => {
            if let Some(caregiver_id) = req.caregiver_id {
                let assignable = st
                    .store
                    .find_user(caregiver_id)
                    .await?
                    .is_some_and(|u| u.is_assignable_caregiver());
                if !assignable {
                    return Err(AppError::validation("caregiver is not available for assignment"));
                }
                change.caregiver_id = Some(caregiver_id);
                assigned = Some(caregiver_id);
            }
            change.open_payment = Some(NewPayment {
                id: Uuid::new_v4(),
                booking_id: booking.id,
                user_id: booking.user_id,
                amount_cents: booking.total_cents,
                currency: booking.currency.clone(),
                method: req.payment_method.unwrap_or_default(),
            });
        }
        BookingStatus::Completed => change.credit_caregiver = booking.caregiver_id,
        BookingStatus::Cancelled => {
            let fallback = if who.is_admin() {
                "Cancelled by administrator"
            } else {
                "Cancelled by customer"
            };
            change.cancellation_reason =
                Some(non_empty(req.reason).unwrap_or_else(|| fallback.to_string()));
            change.cancelled_at = Some(now);
            change.void_pending = Some("Booking cancelled".to_string());
        }
        _ => {}
    }

    let Some(updated) = st.store.apply_status_change(&change).await? else {
        warn!(booking_id = %booking.id, expected = %booking.status, to = %next, "status changed concurrently");
        return Err(AppError::conflict(
            "Booking was modified by another request; reload and retry",
        ));
    };
    info!(
        booking_id = %updated.id,
        from = %booking.status,
        to = %updated.status,
        actor_id = %who.id,
        "booking status changed"
    );

    status_notifications(st, &updated, assigned).await;
    Ok(updated)
}

async fn status_notifications(st: &AppState, booking: &Booking, assigned: Option<Uuid>) {
    let number = &booking.booking_number;
    let owner = booking.user_id;
    let data = booking_data(booking);
    let note = match booking.status {
        BookingStatus::Confirmed => NewNotification::new(
            owner,
            NotificationType::BookingConfirmed,
            "Booking confirmed",
            format!("Your booking {number} has been confirmed."),
        ),
        BookingStatus::InProgress => NewNotification::new(
            owner,
            NotificationType::BookingStarted,
            "Care has started",
            format!("Your caregiver has started booking {number}."),
        ),
        BookingStatus::Completed => NewNotification::new(
            owner,
            NotificationType::ReviewRequest,
            "How did it go?",
            format!("Booking {number} is complete. Please leave a review."),
        )
        .with_priority(Priority::Low),
        BookingStatus::Cancelled => NewNotification::new(
            owner,
            NotificationType::BookingCancelled,
            "Booking cancelled",
            format!("Booking {number} has been cancelled."),
        )
        .with_priority(Priority::High),
        BookingStatus::Pending | BookingStatus::Refunded => return,
    };
    notify(st, note.with_data(data.clone())).await;

    if let Some(caregiver_id) = assigned {
        notify(
            st,
            NewNotification::new(
                caregiver_id,
                NotificationType::CaregiverAssigned,
                "New assignment",
                format!(
                    "You have been assigned to booking {number} on {} at {}.",
                    booking.date, booking.start_time
                ),
            )
            .with_data(data)
            .with_priority(Priority::High),
        )
        .await;
    }
}

fn booking_data(b: &Booking) -> serde_json::Value {
    json!({ "booking_id": b.id, "booking_number": b.booking_number })
}

pub async fn cancel_booking(
    st: &AppState,
    who: &AuthUser,
    id: Uuid,
    reason: Option<String>,
) -> Result<Booking, AppError> {
    let req = UpdateBookingRequest {
        id,
        status: BookingStatus::Cancelled,
        reason,
        caregiver_id: None,
        payment_method: None,
    };
    update_status(st, who, req).await
}

/// CANCELLED/COMPLETED → REFUNDED, refunding every PAID payment and closing
/// any still PENDING.
pub async fn refund_booking(
    st: &AppState,
    who: &AuthUser,
    id: Uuid,
    reason: Option<String>,
) -> Result<Booking, AppError> {
    who.require_admin()?;
    let booking = st
        .store
        .find_booking(id)
        .await?
        .ok_or(AppError::NotFound("booking"))?;
    if !booking.status.can_refund() {
        return Err(AppError::InvalidTransition {
            from: booking.status,
            to: BookingStatus::Refunded,
        });
    }

    let mut change = StatusChange::new(booking.id, booking.status, BookingStatus::Refunded);
    change.refund = Some(RefundOrder {
        reason: non_empty(reason).unwrap_or_else(|| "Refunded by administrator".to_string()),
        at: OffsetDateTime::now_utc(),
    });
    change.void_pending = Some("Booking refunded".to_string());
    let Some(updated) = st.store.apply_status_change(&change).await? else {
        warn!(booking_id = %booking.id, "refund lost a concurrent update");
        return Err(AppError::conflict(
            "Booking was modified by another request; reload and retry",
        ));
    };
    info!(
        booking_id = %updated.id,
        payment_status = %updated.payment_status,
        admin_id = %who.id,
        "booking refunded"
    );

    notify(
        st,
        NewNotification::new(
            updated.user_id,
            NotificationType::PaymentRefunded,
            "Refund issued",
            format!("Booking {} has been refunded.", updated.booking_number),
        )
        .with_data(booking_data(&updated)),
    )
    .await;
    Ok(updated)
}

/// Newest first. Non-admins only ever see their own bookings.
pub async fn list_bookings(
    st: &AppState,
    who: &AuthUser,
    q: &BookingListQuery,
) -> Result<(Vec<Booking>, PageMeta), AppError> {
    if let (Some(from), Some(to)) = (q.date_from, q.date_to) {
        if from > to {
            return Err(AppError::validation("date_from must not be after date_to"));
        }
    }
    let page = q.page_params();
    let query = BookingQuery {
        user_id: if who.is_admin() { q.user_id } else { Some(who.id) },
        status: q.status,
        date_from: q.date_from,
        date_to: q.date_to,
        limit: page.limit(),
        offset: page.offset(),
    };
    let (rows, total) = st.store.list_bookings(&query).await?;
    Ok((rows, page.meta(total)))
}

/// Invoice for one booking, visible to its owner and to admins.
pub async fn booking_invoice(st: &AppState, who: &AuthUser, id: Uuid) -> Result<Invoice, AppError> {
    let booking = st
        .store
        .find_booking(id)
        .await?
        .ok_or(AppError::NotFound("booking"))?;
    check_view(who, &booking)?;

    let service_name = st
        .store
        .find_service(booking.service_id)
        .await?
        .map_or_else(|| "Care".to_string(), |s| s.name);
    let customer = st.store.find_user(booking.user_id).await?;
    Ok(build_invoice(
        &booking,
        &service_name,
        customer.as_ref(),
        OffsetDateTime::now_utc().date(),
    ))
}

/// Counts by status plus money spent. Non-admins always get their own
/// numbers; admins get everyone's unless `user_id` narrows it.
pub async fn booking_stats(
    st: &AppState,
    who: &AuthUser,
    user_id: Option<Uuid>,
) -> Result<BookingStats, AppError> {
    let scope = if who.is_admin() { user_id } else { Some(who.id) };
    let totals = st.store.booking_status_totals(scope).await?;
    Ok(BookingStats::from_totals(&totals))
}
