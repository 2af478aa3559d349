use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use super::repo_types::{NewService, Service, ServicePatch};
use crate::{auth::AuthUser, error::AppError, state::AppState};

lazy_static! {
    static ref SLUG_RE: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
    static ref NON_ALNUM_RE: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
}

/// "Elderly Care (Night)" → "elderly-care-night"
pub fn slugify(name: &str) -> String {
    NON_ALNUM_RE
        .replace_all(&name.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

fn clean_features(features: Vec<String>) -> Vec<String> {
    features
        .into_iter()
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect()
}

fn check_price(price_cents: i64) -> Result<(), AppError> {
    if price_cents <= 0 {
        return Err(AppError::validation("price must be greater than zero"));
    }
    Ok(())
}

/// The service a new booking may reference: it must exist and be active.
pub async fn bookable_service(st: &AppState, id: Uuid) -> Result<Service, AppError> {
    st.store
        .find_service(id)
        .await?
        .filter(|s| s.is_active)
        .ok_or(AppError::ServiceNotFound)
}

pub async fn list_services(
    st: &AppState,
    category: Option<&str>,
) -> Result<Vec<Service>, AppError> {
    let category = category.map(str::trim).filter(|c| !c.is_empty());
    Ok(st.store.list_services(category).await?)
}

pub async fn service_by_slug(st: &AppState, slug: &str) -> Result<Service, AppError> {
    st.store
        .find_service_by_slug(slug)
        .await?
        .filter(|s| s.is_active)
        .ok_or(AppError::ServiceNotFound)
}

pub async fn create_service(
    st: &AppState,
    who: &AuthUser,
    name: &str,
    slug: Option<&str>,
    category: &str,
    description: Option<String>,
    price_cents: i64,
    features: Vec<String>,
) -> Result<Service, AppError> {
    who.require_admin()?;
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("name is required"));
    }
    let category = category.trim();
    if category.is_empty() {
        return Err(AppError::validation("category is required"));
    }
    check_price(price_cents)?;

    let slug = match slug.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.to_lowercase(),
        None => slugify(name),
    };
    if !SLUG_RE.is_match(&slug) {
        return Err(AppError::validation("slug may only contain a-z, 0-9 and dashes"));
    }

    let new = NewService {
        name: name.to_string(),
        slug,
        category: category.to_string(),
        description: description.unwrap_or_default().trim().to_string(),
        price_cents,
        features: clean_features(features),
    };
    let Some(service) = st.store.insert_service(&new).await? else {
        warn!(slug = %new.slug, "service slug already taken");
        return Err(AppError::conflict(format!("slug '{}' is already in use", new.slug)));
    };

    info!(service_id = %service.id, slug = %service.slug, "service created");
    Ok(service)
}

pub async fn update_service(
    st: &AppState,
    who: &AuthUser,
    id: Uuid,
    mut patch: ServicePatch,
) -> Result<Service, AppError> {
    who.require_admin()?;
    if let Some(price) = patch.price_cents {
        check_price(price)?;
    }
    if let Some(name) = patch.name.as_mut() {
        *name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("name must not be empty"));
        }
    }
    patch.features = patch.features.map(clean_features);

    let service = st
        .store
        .update_service(id, &patch)
        .await?
        .ok_or(AppError::ServiceNotFound)?;
    info!(service_id = %service.id, "service updated");
    Ok(service)
}
