//! In-process store for tests. One mutex guards every table, so each
//! method is atomic the same way a PostgreSQL transaction is.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::{
        repo::UserRepo,
        repo_types::{CaregiverProfile, NewUser, Role, User, UserStatus},
    },
    bookings::{
        repo::BookingRepo,
        repo_types::{
            Booking, BookingQuery, BookingStatus, NewBooking, StatusChange, StatusTotal,
        },
    },
    catalog::{
        repo::CatalogRepo,
        repo_types::{NewService, Service, ServicePatch},
    },
    notifications::{
        repo::NotificationRepo,
        repo_types::{NewNotification, Notification, NotificationPage, NotificationQuery},
    },
    payments::{
        repo::PaymentRepo,
        repo_types::{Payment, PaymentSettlement, PaymentStatus},
    },
    reviews::{
        repo::ReviewRepo,
        repo_types::{NewReview, RatingSummary, Review},
    },
    settings::{
        repo::SettingsRepo,
        repo_types::{SettingUpdate, SystemSetting},
    },
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    services: Vec<Service>,
    bookings: Vec<Booking>,
    payments: Vec<Payment>,
    notifications: Vec<Notification>,
    reviews: Vec<Review>,
    settings: Vec<SystemSetting>,
    /// Write applied right after the next read of that booking.
    interleaved: Option<(Uuid, BookingStatus)>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `find_booking(booking_id)` returns the row as stored, then the
    /// row moves to `status` as if another request wrote in between.
    pub fn interleave_after_read(&self, booking_id: Uuid, status: BookingStatus) {
        self.lock().interleaved = Some((booking_id, status));
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// Rows are kept in insertion order; newest first is the reverse, with
/// `created_at` deciding between rows from different instants.
fn newest_first<T: Clone>(
    rows: &[T],
    created_at: impl Fn(&T) -> OffsetDateTime,
    keep: impl Fn(&T) -> bool,
) -> Vec<T> {
    let mut out: Vec<T> = rows.iter().rev().filter(|r| keep(r)).cloned().collect();
    out.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    out
}

fn page<T>(rows: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    rows.into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self.lock().users.iter().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, new: &NewUser) -> anyhow::Result<Option<User>> {
        let mut t = self.lock();
        if t.users.iter().any(|u| u.email == new.email) {
            return Ok(None);
        }
        let user = User {
            id: Uuid::new_v4(),
            name: new.name.clone(),
            email: new.email.clone(),
            password_hash: new.password_hash.clone(),
            phone: new.phone.clone(),
            role: new.role,
            status: UserStatus::Active,
            caregiver_profile: None,
            completed_jobs: 0,
            last_login_at: None,
            created_at: now(),
            updated_at: now(),
        };
        t.users.push(user.clone());
        Ok(Some(user))
    }

    async fn record_login(&self, id: Uuid) -> anyhow::Result<()> {
        if let Some(u) = self.lock().users.iter_mut().find(|u| u.id == id) {
            u.last_login_at = Some(now());
        }
        Ok(())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> anyhow::Result<bool> {
        let mut t = self.lock();
        let Some(u) = t.users.iter_mut().find(|u| u.id == id) else {
            return Ok(false);
        };
        u.password_hash = Some(password_hash.to_string());
        u.updated_at = now();
        Ok(true)
    }

    async fn update_role(&self, id: Uuid, role: Role) -> anyhow::Result<Option<User>> {
        let mut t = self.lock();
        Ok(t.users.iter_mut().find(|u| u.id == id).map(|u| {
            u.role = role;
            u.updated_at = now();
            u.clone()
        }))
    }

    async fn update_caregiver_profile(
        &self,
        id: Uuid,
        profile: &CaregiverProfile,
    ) -> anyhow::Result<Option<User>> {
        let mut t = self.lock();
        Ok(t.users.iter_mut().find(|u| u.id == id).map(|u| {
            u.caregiver_profile = Some(Json(profile.clone()));
            u.updated_at = now();
            u.clone()
        }))
    }

    async fn list_caregivers(&self, available_only: bool) -> anyhow::Result<Vec<User>> {
        let t = self.lock();
        let mut rows: Vec<User> = t
            .users
            .iter()
            .filter(|u| u.role == Role::Caregiver && u.is_active())
            .filter(|u| {
                !available_only
                    || u.caregiver_profile.as_ref().map_or(true, |p| p.0.is_available)
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.completed_jobs
                .cmp(&a.completed_jobs)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(rows)
    }

    async fn deactivate_user(&self, id: Uuid) -> anyhow::Result<Option<u64>> {
        let mut t = self.lock();
        let Some(u) = t.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        u.status = UserStatus::Deleted;
        u.updated_at = now();

        let mut unassigned = 0;
        for b in t.bookings.iter_mut().filter(|b| b.caregiver_id == Some(id)) {
            b.caregiver_id = None;
            b.updated_at = now();
            unassigned += 1;
        }
        Ok(Some(unassigned))
    }
}

#[async_trait]
impl CatalogRepo for MemoryStore {
    async fn insert_service(&self, new: &NewService) -> anyhow::Result<Option<Service>> {
        let mut t = self.lock();
        if t.services.iter().any(|s| s.slug == new.slug) {
            return Ok(None);
        }
        let service = Service {
            id: Uuid::new_v4(),
            name: new.name.clone(),
            slug: new.slug.clone(),
            category: new.category.clone(),
            description: new.description.clone(),
            price_cents: new.price_cents,
            features: Json(new.features.clone()),
            is_active: true,
            created_at: now(),
            updated_at: now(),
        };
        t.services.push(service.clone());
        Ok(Some(service))
    }

    async fn find_service(&self, id: Uuid) -> anyhow::Result<Option<Service>> {
        Ok(self.lock().services.iter().find(|s| s.id == id).cloned())
    }

    async fn find_service_by_slug(&self, slug: &str) -> anyhow::Result<Option<Service>> {
        Ok(self.lock().services.iter().find(|s| s.slug == slug).cloned())
    }

    async fn list_services(&self, category: Option<&str>) -> anyhow::Result<Vec<Service>> {
        let t = self.lock();
        let mut rows: Vec<Service> = t
            .services
            .iter()
            .filter(|s| s.is_active && category.map_or(true, |c| s.category == c))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn update_service(
        &self,
        id: Uuid,
        patch: &ServicePatch,
    ) -> anyhow::Result<Option<Service>> {
        let mut t = self.lock();
        let Some(s) = t.services.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        if let Some(v) = &patch.name {
            s.name = v.clone();
        }
        if let Some(v) = &patch.category {
            s.category = v.clone();
        }
        if let Some(v) = &patch.description {
            s.description = v.clone();
        }
        if let Some(v) = patch.price_cents {
            s.price_cents = v;
        }
        if let Some(v) = &patch.features {
            s.features = Json(v.clone());
        }
        if let Some(v) = patch.is_active {
            s.is_active = v;
        }
        s.updated_at = now();
        Ok(Some(s.clone()))
    }
}

#[async_trait]
impl BookingRepo for MemoryStore {
    async fn insert_booking(&self, new: &NewBooking) -> anyhow::Result<Option<Booking>> {
        let mut t = self.lock();
        if t.bookings.iter().any(|b| b.booking_number == new.booking_number) {
            return Ok(None);
        }
        let booking = Booking {
            id: new.id,
            booking_number: new.booking_number.clone(),
            user_id: new.user_id,
            caregiver_id: None,
            service_id: new.service_id,
            date: new.date,
            start_time: new.start_time.clone(),
            hours: new.hours,
            address: new.address.clone(),
            special_requests: new.special_requests.clone(),
            emergency_contact: new.emergency_contact.clone(),
            medical_conditions: new.medical_conditions.clone(),
            hourly_rate_cents: new.hourly_rate_cents,
            tax_rate_bps: new.tax_rate_bps,
            subtotal_cents: new.subtotal_cents,
            tax_cents: new.tax_cents,
            total_cents: new.total_cents,
            currency: new.currency.clone(),
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            cancellation_reason: None,
            cancelled_at: None,
            review_id: None,
            created_at: now(),
            updated_at: now(),
        };
        t.bookings.push(booking.clone());
        Ok(Some(booking))
    }

    async fn find_booking(&self, id: Uuid) -> anyhow::Result<Option<Booking>> {
        let mut t = self.lock();
        let found = t.bookings.iter().find(|b| b.id == id).cloned();
        if let Some((target, status)) = t.interleaved.filter(|(target, _)| *target == id) {
            t.interleaved = None;
            if let Some(b) = t.bookings.iter_mut().find(|b| b.id == target) {
                b.status = status;
                b.updated_at = now();
            }
        }
        Ok(found)
    }

    async fn find_booking_by_number(&self, number: &str) -> anyhow::Result<Option<Booking>> {
        Ok(self
            .lock()
            .bookings
            .iter()
            .find(|b| b.booking_number == number)
            .cloned())
    }

    async fn list_bookings(&self, q: &BookingQuery) -> anyhow::Result<(Vec<Booking>, i64)> {
        let t = self.lock();
        let rows = newest_first(&t.bookings, |b| b.created_at, |b| {
            q.user_id.map_or(true, |u| b.user_id == u)
                && q.status.map_or(true, |s| b.status == s)
                && q.date_from.map_or(true, |d| b.date >= d)
                && q.date_to.map_or(true, |d| b.date <= d)
        });
        let total = rows.len() as i64;
        Ok((page(rows, q.limit, q.offset), total))
    }

    async fn apply_status_change(&self, change: &StatusChange) -> anyhow::Result<Option<Booking>> {
        let mut t = self.lock();
        let Some(idx) = t
            .bookings
            .iter()
            .position(|b| b.id == change.booking_id && b.status == change.expected)
        else {
            return Ok(None);
        };

        {
            let b = &mut t.bookings[idx];
            b.status = change.next;
            if change.caregiver_id.is_some() {
                b.caregiver_id = change.caregiver_id;
            }
            if change.cancellation_reason.is_some() {
                b.cancellation_reason = change.cancellation_reason.clone();
            }
            if change.cancelled_at.is_some() {
                b.cancelled_at = change.cancelled_at;
            }
            b.updated_at = now();
        }

        if let Some(caregiver_id) = change.credit_caregiver {
            if let Some(u) = t.users.iter_mut().find(|u| u.id == caregiver_id) {
                u.completed_jobs += 1;
                u.updated_at = now();
            }
        }

        if let Some(p) = &change.open_payment {
            t.payments.push(Payment {
                id: p.id,
                booking_id: p.booking_id,
                user_id: p.user_id,
                amount_cents: p.amount_cents,
                currency: p.currency.clone(),
                status: PaymentStatus::Pending,
                method: p.method,
                external_reference: None,
                receipt_url: None,
                refund_amount_cents: None,
                refund_reason: None,
                refunded_at: None,
                error_message: None,
                created_at: now(),
                updated_at: now(),
            });
        }

        if let Some(message) = &change.void_pending {
            let mut voided = 0;
            for p in t.payments.iter_mut().filter(|p| {
                p.booking_id == change.booking_id && p.status == PaymentStatus::Pending
            }) {
                p.status = PaymentStatus::Failed;
                p.error_message = Some(message.clone());
                p.updated_at = now();
                voided += 1;
            }
            let b = &mut t.bookings[idx];
            if voided > 0 && b.payment_status == PaymentStatus::Pending {
                b.payment_status = PaymentStatus::Failed;
            }
        }

        if let Some(refund) = &change.refund {
            let mut refunded = 0;
            for p in t.payments.iter_mut().filter(|p| {
                p.booking_id == change.booking_id && p.status == PaymentStatus::Paid
            }) {
                p.status = PaymentStatus::Refunded;
                p.refund_amount_cents = Some(p.amount_cents);
                p.refund_reason = Some(refund.reason.clone());
                p.refunded_at = Some(refund.at);
                p.updated_at = now();
                refunded += 1;
            }
            if refunded > 0 {
                t.bookings[idx].payment_status = PaymentStatus::Refunded;
            }
        }

        Ok(Some(t.bookings[idx].clone()))
    }

    async fn booking_status_totals(&self, user_id: Option<Uuid>) -> anyhow::Result<Vec<StatusTotal>> {
        let t = self.lock();
        let mut rows: Vec<StatusTotal> = Vec::new();
        for b in t.bookings.iter().filter(|b| user_id.map_or(true, |u| b.user_id == u)) {
            let paid = if b.payment_status == PaymentStatus::Paid { b.total_cents } else { 0 };
            match rows.iter_mut().find(|r| r.status == b.status) {
                Some(r) => {
                    r.count += 1;
                    r.paid_cents += paid;
                }
                None => rows.push(StatusTotal { status: b.status, count: 1, paid_cents: paid }),
            }
        }
        Ok(rows)
    }
}

#[async_trait]
impl PaymentRepo for MemoryStore {
    async fn find_payment(&self, id: Uuid) -> anyhow::Result<Option<Payment>> {
        Ok(self.lock().payments.iter().find(|p| p.id == id).cloned())
    }

    async fn list_payments_for_booking(&self, booking_id: Uuid) -> anyhow::Result<Vec<Payment>> {
        Ok(self
            .lock()
            .payments
            .iter()
            .filter(|p| p.booking_id == booking_id)
            .cloned()
            .collect())
    }

    async fn settle_payment(&self, s: &PaymentSettlement) -> anyhow::Result<Option<Payment>> {
        let mut t = self.lock();
        let status = s.outcome();
        let Some(p) = t
            .payments
            .iter_mut()
            .find(|p| p.id == s.payment_id && p.status == PaymentStatus::Pending)
        else {
            return Ok(None);
        };
        p.status = status;
        if s.external_reference.is_some() {
            p.external_reference = s.external_reference.clone();
        }
        if s.receipt_url.is_some() {
            p.receipt_url = s.receipt_url.clone();
        }
        p.error_message = s.error_message.clone();
        p.updated_at = now();
        let payment = p.clone();

        if let Some(b) = t.bookings.iter_mut().find(|b| b.id == payment.booking_id) {
            b.payment_status = status;
            b.updated_at = now();
        }
        Ok(Some(payment))
    }
}

#[async_trait]
impl NotificationRepo for MemoryStore {
    async fn insert_notification(&self, new: &NewNotification) -> anyhow::Result<Notification> {
        let n = Notification {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            notification_type: new.notification_type,
            title: new.title.clone(),
            message: new.message.clone(),
            data: Json(new.data.clone()),
            priority: new.priority,
            is_read: false,
            read_at: None,
            created_at: now(),
        };
        self.lock().notifications.push(n.clone());
        Ok(n)
    }

    async fn list_notifications(&self, q: &NotificationQuery) -> anyhow::Result<NotificationPage> {
        let t = self.lock();
        let rows = newest_first(&t.notifications, |n| n.created_at, |n| {
            n.user_id == q.user_id && (!q.unread_only || !n.is_read)
        });
        let unread = t
            .notifications
            .iter()
            .filter(|n| n.user_id == q.user_id && !n.is_read)
            .count() as i64;
        let total = rows.len() as i64;
        Ok(NotificationPage {
            items: page(rows, q.limit, q.offset),
            total,
            unread,
        })
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Option<Notification>> {
        let mut t = self.lock();
        Ok(t
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
            .map(|n| {
                n.is_read = true;
                n.read_at.get_or_insert_with(now);
                n.clone()
            }))
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> anyhow::Result<u64> {
        let mut t = self.lock();
        let mut marked = 0;
        for n in t
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.is_read)
        {
            n.is_read = true;
            n.read_at = Some(now());
            marked += 1;
        }
        Ok(marked)
    }
}

#[async_trait]
impl ReviewRepo for MemoryStore {
    async fn insert_review(&self, new: &NewReview) -> anyhow::Result<Option<Review>> {
        let mut t = self.lock();
        if t.reviews.iter().any(|r| r.booking_id == new.booking_id) {
            return Ok(None);
        }
        let review = Review {
            id: Uuid::new_v4(),
            booking_id: new.booking_id,
            user_id: new.user_id,
            caregiver_id: new.caregiver_id,
            service_id: new.service_id,
            rating: new.rating,
            comment: new.comment.clone(),
            criteria: Json(new.criteria),
            created_at: now(),
        };
        t.reviews.push(review.clone());
        if let Some(b) = t.bookings.iter_mut().find(|b| b.id == new.booking_id) {
            b.review_id = Some(review.id);
            b.updated_at = now();
        }
        Ok(Some(review))
    }

    async fn list_caregiver_reviews(
        &self,
        caregiver_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<(Vec<Review>, i64)> {
        let t = self.lock();
        let rows = newest_first(&t.reviews, |r| r.created_at, |r| r.caregiver_id == caregiver_id);
        let total = rows.len() as i64;
        Ok((page(rows, limit, offset), total))
    }

    async fn caregiver_rating(&self, caregiver_id: Uuid) -> anyhow::Result<RatingSummary> {
        let t = self.lock();
        let ratings: Vec<i32> = t
            .reviews
            .iter()
            .filter(|r| r.caregiver_id == caregiver_id)
            .map(|r| r.rating)
            .collect();
        let count = ratings.len() as i64;
        let average = (count > 0).then(|| ratings.iter().map(|r| f64::from(*r)).sum::<f64>() / count as f64);
        Ok(RatingSummary { count, average })
    }
}

#[async_trait]
impl SettingsRepo for MemoryStore {
    async fn get_setting(&self, key: &str) -> anyhow::Result<Option<SystemSetting>> {
        Ok(self.lock().settings.iter().find(|s| s.key == key).cloned())
    }

    async fn list_settings(&self, public_only: bool) -> anyhow::Result<Vec<SystemSetting>> {
        let t = self.lock();
        let mut rows: Vec<SystemSetting> = t
            .settings
            .iter()
            .filter(|s| !public_only || s.is_public)
            .cloned()
            .collect();
        rows.sort_by(|a, b| (&a.category, &a.key).cmp(&(&b.category, &b.key)));
        Ok(rows)
    }

    async fn upsert_setting(&self, update: &SettingUpdate) -> anyhow::Result<SystemSetting> {
        let mut t = self.lock();
        if let Some(s) = t.settings.iter_mut().find(|s| s.key == update.key) {
            s.value = Json(update.value.clone());
            if update.description.is_some() {
                s.description = update.description.clone();
            }
            if let Some(c) = &update.category {
                s.category = c.clone();
            }
            if let Some(p) = update.is_public {
                s.is_public = p;
            }
            s.updated_by = Some(update.updated_by);
            s.updated_at = now();
            return Ok(s.clone());
        }
        let setting = SystemSetting {
            key: update.key.clone(),
            value: Json(update.value.clone()),
            description: update.description.clone(),
            category: update.category.clone().unwrap_or_else(|| "GENERAL".into()),
            is_public: update.is_public.unwrap_or(false),
            updated_by: Some(update.updated_by),
            updated_at: now(),
        };
        t.settings.push(setting.clone());
        Ok(setting)
    }
}
