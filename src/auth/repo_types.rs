use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::store::text_enum;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Caregiver,
    Admin,
}

text_enum!(Role {
    User => "USER",
    Caregiver => "CAREGIVER",
    Admin => "ADMIN",
});

/// Soft lifecycle of an account; rows are never hard-deleted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Active,
    Suspended,
    Deleted,
}

text_enum!(UserStatus {
    Active => "ACTIVE",
    Suspended => "SUSPENDED",
    Deleted => "DELETED",
});

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DaySlot {
    pub day: String,   // "MONDAY".."SUNDAY"
    pub start: String, // HH:MM
    pub end: String,   // HH:MM
}

/// Caregiver-only profile, stored as JSONB on the user row.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaregiverProfile {
    pub hourly_rate_cents: i64,
    pub is_available: bool,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default)]
    pub schedule: Vec<DaySlot>,
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>, // None for OAuth-linked accounts
    pub phone: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[sqlx(try_from = "String")]
    pub status: UserStatus,
    pub caregiver_profile: Option<Json<CaregiverProfile>>,
    pub completed_jobs: i32,
    pub last_login_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    /// Active caregiver whose profile (if any) is open for work.
    pub fn is_assignable_caregiver(&self) -> bool {
        self.role == Role::Caregiver
            && self.is_active()
            && self
                .caregiver_profile
                .as_ref()
                .map_or(true, |p| p.0.is_available)
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
}
