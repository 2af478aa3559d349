use std::collections::HashSet;

use time::{macros::format_description, Time};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        repo_types::{CaregiverProfile, DaySlot, Role, User},
        AuthUser,
    },
    error::AppError,
    state::AppState,
};

const DAYS: [&str; 7] = [
    "MONDAY", "TUESDAY", "WEDNESDAY", "THURSDAY", "FRIDAY", "SATURDAY", "SUNDAY",
];

fn parse_clock(raw: &str) -> Result<Time, AppError> {
    Time::parse(raw.trim(), format_description!("[hour]:[minute]"))
        .map_err(|_| AppError::validation(format!("invalid time '{raw}', expected HH:MM")))
}

fn clean_slot(slot: DaySlot) -> Result<DaySlot, AppError> {
    let day = slot.day.trim().to_uppercase();
    if !DAYS.contains(&day.as_str()) {
        return Err(AppError::validation(format!("unknown day '{}'", slot.day)));
    }
    let (start, end) = (parse_clock(&slot.start)?, parse_clock(&slot.end)?);
    if start >= end {
        return Err(AppError::validation("schedule slot must end after it starts"));
    }
    Ok(DaySlot {
        day,
        start: slot.start.trim().to_string(),
        end: slot.end.trim().to_string(),
    })
}

/// Trimmed, non-empty, first occurrence kept.
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}

pub async fn update_caregiver_profile(
    st: &AppState,
    who: &AuthUser,
    profile: CaregiverProfile,
) -> Result<User, AppError> {
    if who.role != Role::Caregiver {
        return Err(AppError::Forbidden("Only caregivers have a caregiver profile"));
    }
    if profile.hourly_rate_cents < 0 {
        return Err(AppError::validation("hourly rate must not be negative"));
    }
    let profile = CaregiverProfile {
        hourly_rate_cents: profile.hourly_rate_cents,
        is_available: profile.is_available,
        specialties: clean_list(profile.specialties),
        certifications: clean_list(profile.certifications),
        schedule: profile
            .schedule
            .into_iter()
            .map(clean_slot)
            .collect::<Result<_, _>>()?,
    };

    let user = st
        .store
        .update_caregiver_profile(who.id, &profile)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    info!(user_id = %user.id, available = profile.is_available, "caregiver profile updated");
    Ok(user)
}

pub async fn list_caregivers(st: &AppState, available_only: bool) -> Result<Vec<User>, AppError> {
    Ok(st.store.list_caregivers(available_only).await?)
}

pub async fn change_role(
    st: &AppState,
    who: &AuthUser,
    user_id: Uuid,
    role: Role,
) -> Result<User, AppError> {
    who.require_admin()?;
    let user = st
        .store
        .update_role(user_id, role)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    info!(user_id = %user.id, role = %role, admin_id = %who.id, "user role changed");
    Ok(user)
}

/// Soft-deletes the account and unassigns it from every booking.
pub async fn remove_user(st: &AppState, who: &AuthUser, user_id: Uuid) -> Result<u64, AppError> {
    who.require_admin()?;
    if who.id == user_id {
        warn!(admin_id = %who.id, "admin attempted self-deletion");
        return Err(AppError::validation("You cannot delete your own account"));
    }
    let unassigned = st
        .store
        .deactivate_user(user_id)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    info!(user_id = %user_id, admin_id = %who.id, unassigned, "user removed");
    Ok(unassigned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::UserStatus;
    use crate::bookings::{
        repo_types::BookingStatus,
        services::{
            tests::{create, fixture, seed_caregiver, seed_user, to},
            update_status,
        },
    };

    fn slot(day: &str, start: &str, end: &str) -> DaySlot {
        DaySlot { day: day.into(), start: start.into(), end: end.into() }
    }

    #[test]
    fn repeated_entries_collapse_in_original_order() {
        let items = vec!["CPR", " First aid", "CPR ", "", "Dementia", "First aid"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(clean_list(items), vec!["CPR", "First aid", "Dementia"]);
    }

    #[tokio::test]
    async fn caregiver_profile_is_cleaned_and_validated() {
        let f = fixture().await;
        let cg = seed_user(&f.st, Role::Caregiver).await;
        let profile = CaregiverProfile {
            hourly_rate_cents: 2_500,
            is_available: true,
            specialties: vec![" Dementia ".into(), "".into()],
            certifications: vec![],
            schedule: vec![slot("monday", "08:00", "16:00")],
        };
        let user = update_caregiver_profile(&f.st, &cg, profile.clone()).await.unwrap();
        let saved = user.caregiver_profile.unwrap().0;
        assert_eq!(saved.specialties, vec!["Dementia".to_string()]);
        assert_eq!(saved.schedule[0].day, "MONDAY");

        let mut backwards = profile.clone();
        backwards.schedule = vec![slot("MONDAY", "16:00", "08:00")];
        assert!(update_caregiver_profile(&f.st, &cg, backwards).await.is_err());

        assert!(matches!(
            update_caregiver_profile(&f.st, &f.owner, profile).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn directory_filters_by_availability() {
        let f = fixture().await;
        let open = seed_caregiver(&f.st, true).await;
        let busy = seed_caregiver(&f.st, false).await;

        let all = list_caregivers(&f.st, false).await.unwrap();
        assert_eq!(all.len(), 2);
        let available = list_caregivers(&f.st, true).await.unwrap();
        assert_eq!(available.iter().map(|u| u.id).collect::<Vec<_>>(), vec![open]);

        remove_user(&f.st, &f.admin, busy).await.unwrap();
        assert_eq!(list_caregivers(&f.st, false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn role_change_is_admin_only() {
        let f = fixture().await;
        let res = change_role(&f.st, &f.owner, f.owner.id, Role::Admin).await;
        assert!(matches!(res, Err(AppError::Forbidden(_))));

        let user = change_role(&f.st, &f.admin, f.owner.id, Role::Caregiver).await.unwrap();
        assert_eq!(user.role, Role::Caregiver);
        assert!(matches!(
            change_role(&f.st, &f.admin, Uuid::new_v4(), Role::User).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn deleting_a_caregiver_unassigns_their_bookings() {
        let f = fixture().await;
        let caregiver = seed_caregiver(&f.st, true).await;
        let b = create(&f).await;
        let mut confirm = to(b.id, BookingStatus::Confirmed);
        confirm.caregiver_id = Some(caregiver);
        update_status(&f.st, &f.admin, confirm).await.unwrap();

        assert!(matches!(
            remove_user(&f.st, &f.admin, f.admin.id).await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(remove_user(&f.st, &f.admin, caregiver).await.unwrap(), 1);

        let stored = f.st.store.find_booking(b.id).await.unwrap().unwrap();
        assert_eq!(stored.caregiver_id, None);
        let gone = f.st.store.find_user(caregiver).await.unwrap().unwrap();
        assert_eq!(gone.status, UserStatus::Deleted);
        assert!(!gone.is_assignable_caregiver());
    }
}
