use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use super::repo_types::{Payment, PaymentSettlement, PaymentStatus};
use crate::{
    auth::AuthUser,
    bookings::{policy::check_view, repo_types::BookingStatus},
    error::AppError,
    notifications::{
        notify,
        repo_types::{NewNotification, NotificationType, Priority},
    },
    state::AppState,
};

pub async fn payments_for_booking(
    st: &AppState,
    who: &AuthUser,
    booking_id: Uuid,
) -> Result<Vec<Payment>, AppError> {
    let booking = st
        .store
        .find_booking(booking_id)
        .await?
        .ok_or(AppError::NotFound("booking"))?;
    check_view(who, &booking)?;
    Ok(st.store.list_payments_for_booking(booking.id).await?)
}

/// Records the processor's verdict on a PENDING payment.
pub async fn settle_payment(
    st: &AppState,
    who: &AuthUser,
    settlement: PaymentSettlement,
) -> Result<Payment, AppError> {
    who.require_admin()?;
    let pending = st
        .store
        .find_payment(settlement.payment_id)
        .await?
        .ok_or(AppError::NotFound("payment"))?;
    let booking = st
        .store
        .find_booking(pending.booking_id)
        .await?
        .ok_or(AppError::NotFound("booking"))?;
    if matches!(booking.status, BookingStatus::Cancelled | BookingStatus::Refunded) {
        warn!(payment_id = %pending.id, booking_status = %booking.status, "settle on closed booking");
        return Err(AppError::conflict(format!(
            "Booking is {}; its payments can no longer be settled",
            booking.status
        )));
    }

    let Some(payment) = st.store.settle_payment(&settlement).await? else {
        warn!(payment_id = %settlement.payment_id, "settle on non-pending payment");
        return Err(AppError::conflict("Payment is no longer pending"));
    };
    info!(
        payment_id = %payment.id,
        booking_id = %payment.booking_id,
        status = %payment.status,
        "payment settled"
    );

    let data = json!({ "booking_id": payment.booking_id, "payment_id": payment.id });
    let notification = match payment.status {
        PaymentStatus::Paid => NewNotification::new(
            payment.user_id,
            NotificationType::PaymentSuccess,
            "Payment received",
            format!("We received your payment of {}.", format_amount(&payment)),
        ),
        _ => NewNotification::new(
            payment.user_id,
            NotificationType::PaymentFailed,
            "Payment failed",
            "Your payment could not be processed. Please try again.",
        )
        .with_priority(Priority::High),
    };
    notify(st, notification.with_data(data)).await;

    Ok(payment)
}

pub(crate) fn format_amount(p: &Payment) -> String {
    format!(
        "{}.{:02} {}",
        p.amount_cents / 100,
        p.amount_cents % 100,
        p.currency
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookings::services::{
        cancel_booking, refund_booking,
        tests::{create, drive, fixture, notifications_of, seed_user},
    };
    use crate::auth::repo_types::Role;

    fn verdict(payment_id: Uuid, paid: bool) -> PaymentSettlement {
        PaymentSettlement {
            payment_id,
            paid,
            external_reference: Some("ch_42".into()),
            receipt_url: None,
            error_message: (!paid).then(|| "card declined".to_string()),
        }
    }

    #[tokio::test]
    async fn settling_mirrors_onto_the_booking_once() {
        let f = fixture().await;
        let b = create(&f).await;
        drive(&f, b.id, &[BookingStatus::Confirmed]).await;

        let payments = payments_for_booking(&f.st, &f.owner, b.id).await.unwrap();
        assert_eq!(payments.len(), 1);
        let id = payments[0].id;

        assert!(matches!(
            settle_payment(&f.st, &f.owner, verdict(id, true)).await,
            Err(AppError::Forbidden(_))
        ));

        let paid = settle_payment(&f.st, &f.admin, verdict(id, true)).await.unwrap();
        assert_eq!(paid.status, PaymentStatus::Paid);
        assert_eq!(paid.external_reference.as_deref(), Some("ch_42"));
        assert_eq!(format_amount(&paid), "129.60 USD");

        let booking = f.st.store.find_booking(b.id).await.unwrap().unwrap();
        assert_eq!(booking.payment_status, PaymentStatus::Paid);
        assert_eq!(notifications_of(&f.st, f.owner.id, NotificationType::PaymentSuccess).await, 1);

        assert!(matches!(
            settle_payment(&f.st, &f.admin, verdict(id, false)).await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            settle_payment(&f.st, &f.admin, verdict(Uuid::new_v4(), true)).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn failed_payment_notifies_with_high_priority() {
        let f = fixture().await;
        let b = create(&f).await;
        drive(&f, b.id, &[BookingStatus::Confirmed]).await;
        let id = f.st.store.list_payments_for_booking(b.id).await.unwrap()[0].id;

        let failed = settle_payment(&f.st, &f.admin, verdict(id, false)).await.unwrap();
        assert_eq!(failed.status, PaymentStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("card declined"));
        assert_eq!(notifications_of(&f.st, f.owner.id, NotificationType::PaymentFailed).await, 1);
    }

    #[tokio::test]
    async fn strangers_cannot_list_payments() {
        let f = fixture().await;
        let b = create(&f).await;
        let stranger = seed_user(&f.st, Role::User).await;
        assert!(matches!(
            payments_for_booking(&f.st, &stranger, b.id).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(payments_for_booking(&f.st, &f.admin, b.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn closing_a_booking_closes_its_open_payment() {
        let f = fixture().await;
        let b = create(&f).await;
        drive(&f, b.id, &[BookingStatus::Confirmed]).await;
        let id = f.st.store.list_payments_for_booking(b.id).await.unwrap()[0].id;

        let cancelled = cancel_booking(&f.st, &f.admin, b.id, None).await.unwrap();
        assert_eq!(cancelled.payment_status, PaymentStatus::Failed);
        let voided = f.st.store.find_payment(id).await.unwrap().unwrap();
        assert_eq!(voided.status, PaymentStatus::Failed);
        assert_eq!(voided.error_message.as_deref(), Some("Booking cancelled"));

        let refunded = refund_booking(&f.st, &f.admin, b.id, None).await.unwrap();
        assert_eq!(refunded.status, BookingStatus::Refunded);
        assert_eq!(refunded.payment_status, PaymentStatus::Failed);

        assert!(matches!(
            settle_payment(&f.st, &f.admin, verdict(id, true)).await,
            Err(AppError::Conflict(_))
        ));
        let after = f.st.store.find_booking(b.id).await.unwrap().unwrap();
        assert_eq!(after.payment_status, PaymentStatus::Failed);
        assert_eq!(notifications_of(&f.st, f.owner.id, NotificationType::PaymentSuccess).await, 0);
    }

    #[tokio::test]
    async fn refunding_a_completed_unpaid_booking_voids_the_payment() {
        let f = fixture().await;
        let b = create(&f).await;
        drive(
            &f,
            b.id,
            &[BookingStatus::Confirmed, BookingStatus::InProgress, BookingStatus::Completed],
        )
        .await;
        let id = f.st.store.list_payments_for_booking(b.id).await.unwrap()[0].id;

        refund_booking(&f.st, &f.admin, b.id, Some("Never charged".into())).await.unwrap();
        let p = f.st.store.find_payment(id).await.unwrap().unwrap();
        assert_eq!(p.status, PaymentStatus::Failed);
        assert_eq!(p.refund_amount_cents, None);
        assert!(matches!(
            settle_payment(&f.st, &f.admin, verdict(id, true)).await,
            Err(AppError::Conflict(_))
        ));
    }
}
