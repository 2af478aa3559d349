//! Who may see or move a booking, in one place.

use time::{macros::format_description, Duration, OffsetDateTime, PrimitiveDateTime, Time};

use super::repo_types::{Booking, BookingStatus};
use crate::{auth::AuthUser, error::AppError};

pub fn can_view(who: &AuthUser, booking: &Booking) -> bool {
    who.is_admin() || who.id == booking.user_id
}

pub fn check_view(who: &AuthUser, booking: &Booking) -> Result<(), AppError> {
    if can_view(who, booking) {
        Ok(())
    } else {
        Err(AppError::Forbidden("You can only access your own bookings"))
    }
}

/// Admins may apply any edge of the transition table. Owners may only cancel,
/// and only while the booking is PENDING or CONFIRMED. Everyone else is
/// refused before the requested status is even looked at.
pub fn check_transition(
    who: &AuthUser,
    booking: &Booking,
    next: BookingStatus,
) -> Result<(), AppError> {
    if !who.is_admin() {
        if who.id != booking.user_id {
            return Err(AppError::Forbidden("You can only modify your own bookings"));
        }
        if next != BookingStatus::Cancelled {
            return Err(AppError::Forbidden("Booking owners may only cancel"));
        }
        if !matches!(booking.status, BookingStatus::Pending | BookingStatus::Confirmed) {
            return Err(AppError::InvalidTransition {
                from: booking.status,
                to: next,
            });
        }
    }
    if !booking.status.can_transition_to(next) {
        return Err(AppError::InvalidTransition {
            from: booking.status,
            to: next,
        });
    }
    Ok(())
}

pub fn parse_start_time(raw: &str) -> Result<Time, AppError> {
    Time::parse(raw.trim(), format_description!("[hour]:[minute]"))
        .map_err(|_| AppError::validation("start_time must be HH:MM (24h)"))
}

pub fn scheduled_start(booking: &Booking) -> Result<OffsetDateTime, AppError> {
    let time = parse_start_time(&booking.start_time)?;
    Ok(PrimitiveDateTime::new(booking.date, time).assume_utc())
}

/// Owners cannot cancel once the start is closer than `cancellation_hours`.
pub fn check_cancellation_window(
    booking: &Booking,
    now: OffsetDateTime,
    cancellation_hours: i64,
) -> Result<(), AppError> {
    if cancellation_hours <= 0 {
        return Ok(());
    }
    let start = scheduled_start(booking)?;
    if start - now < Duration::hours(cancellation_hours) {
        return Err(AppError::CancellationWindow {
            hours: cancellation_hours,
        });
    }
    Ok(())
}
