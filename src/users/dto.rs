use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo_types::{CaregiverProfile, Role, User};

#[derive(Debug, Deserialize)]
pub struct CaregiverFilter {
    #[serde(default)]
    pub available: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: Role,
}

/// What the public caregiver directory shows; no contact details.
#[derive(Debug, Serialize)]
pub struct CaregiverCard {
    pub id: Uuid,
    pub name: String,
    pub completed_jobs: i32,
    pub profile: CaregiverProfile,
}

impl From<User> for CaregiverCard {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            completed_jobs: u.completed_jobs,
            profile: u.caregiver_profile.map(|p| p.0).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CaregiversResponse {
    pub success: bool,
    pub caregivers: Vec<CaregiverCard>,
}

#[derive(Debug, Serialize)]
pub struct RemovedUserResponse {
    pub success: bool,
    pub user_id: Uuid,
    pub unassigned_bookings: u64,
}
