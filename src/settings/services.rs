use serde_json::Value;
use tracing::{info, warn};

use super::repo_types::{
    SettingUpdate, SystemSetting, CANCELLATION_HOURS, MAX_BOOKING_HOURS, MIN_BOOKING_HOURS,
    TAX_RATE,
};
use crate::{
    auth::AuthUser, bookings::pricing::TaxRate, config::BookingDefaults, error::AppError,
    state::AppState,
};

/// Effective booking rules for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingRules {
    pub tax_rate: TaxRate,
    pub min_hours: i32,
    pub max_hours: i32,
    pub cancellation_hours: i64,
    pub currency: String,
}

impl BookingRules {
    pub fn from_defaults(d: &BookingDefaults) -> Result<Self, AppError> {
        Ok(Self {
            tax_rate: TaxRate::from_percent(d.tax_rate_percent)?,
            min_hours: d.min_hours,
            max_hours: d.max_hours,
            cancellation_hours: d.cancellation_hours,
            currency: d.currency.clone(),
        })
    }

    /// Applies stored overrides. Malformed rows are skipped with a warning.
    pub fn with_overrides(mut self, settings: &[SystemSetting]) -> Self {
        let mut min_hours = self.min_hours;
        let mut max_hours = self.max_hours;
        for s in settings {
            let applied = match s.key.as_str() {
                TAX_RATE => s
                    .as_f64()
                    .and_then(|p| TaxRate::from_percent(p).ok())
                    .map(|rate| self.tax_rate = rate),
                MIN_BOOKING_HOURS => positive_hours(s).map(|h| min_hours = h),
                MAX_BOOKING_HOURS => positive_hours(s).map(|h| max_hours = h),
                CANCELLATION_HOURS => s
                    .as_i64()
                    .filter(|h| *h >= 0)
                    .map(|h| self.cancellation_hours = h),
                _ => Some(()),
            };
            if applied.is_none() {
                warn!(key = %s.key, value = %s.value.0, "ignoring malformed setting");
            }
        }
        if min_hours <= max_hours {
            self.min_hours = min_hours;
            self.max_hours = max_hours;
        } else {
            warn!(min_hours, max_hours, "hour settings contradict each other; keeping defaults");
        }
        self
    }

    pub fn check_hours(&self, hours: i32) -> Result<(), AppError> {
        if hours < self.min_hours || hours > self.max_hours {
            return Err(AppError::validation(format!(
                "hours must be between {} and {}",
                self.min_hours, self.max_hours
            )));
        }
        Ok(())
    }
}

fn positive_hours(s: &SystemSetting) -> Option<i32> {
    s.as_i64()
        .filter(|h| *h >= 1)
        .and_then(|h| i32::try_from(h).ok())
}

/// Environment defaults overlaid with stored settings. A storage failure
/// falls back to the defaults.
pub async fn booking_rules(st: &AppState) -> Result<BookingRules, AppError> {
    let rules = BookingRules::from_defaults(&st.config.booking)?;
    match st.store.list_settings(false).await {
        Ok(settings) => Ok(rules.with_overrides(&settings)),
        Err(e) => {
            warn!(error = %e, "loading settings failed; using environment defaults");
            Ok(rules)
        }
    }
}

/// Normalises a setting value, enforcing the shape of the booking-rule keys.
pub fn validate_setting(key: &str, value: Value) -> Result<Value, AppError> {
    let number = || match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match key {
        TAX_RATE => {
            let pct = number()
                .ok_or_else(|| AppError::validation("TAX_RATE must be a number"))?;
            TaxRate::from_percent(pct)?;
            Ok(Value::from(pct))
        }
        MIN_BOOKING_HOURS | MAX_BOOKING_HOURS | CANCELLATION_HOURS => {
            let floor = if key == CANCELLATION_HOURS { 0.0 } else { 1.0 };
            match number() {
                Some(h) if h.fract() == 0.0 && h >= floor && h <= f64::from(i32::MAX) => {
                    Ok(Value::from(h as i64))
                }
                _ => Err(AppError::validation(format!(
                    "{key} must be a whole number of hours"
                ))),
            }
        }
        _ if value.is_null() => Err(AppError::validation("value is required")),
        _ => Ok(value),
    }
}

pub async fn list_settings(st: &AppState, public_only: bool) -> Result<Vec<SystemSetting>, AppError> {
    Ok(st.store.list_settings(public_only).await?)
}

/// One setting by key, public or not. Admin only.
pub async fn get_setting(st: &AppState, who: &AuthUser, key: &str) -> Result<SystemSetting, AppError> {
    who.require_admin()?;
    st.store
        .get_setting(&key.trim().to_uppercase())
        .await?
        .ok_or(AppError::NotFound("setting"))
}

pub async fn update_setting(
    st: &AppState,
    who: &AuthUser,
    key: &str,
    value: Value,
    description: Option<String>,
    category: Option<String>,
    is_public: Option<bool>,
) -> Result<SystemSetting, AppError> {
    who.require_admin()?;
    let key = key.trim().to_uppercase();
    if key.is_empty() {
        return Err(AppError::validation("key is required"));
    }
    let value = validate_setting(&key, value)?;

    let update = SettingUpdate {
        key,
        value,
        description,
        category: category.map(|c| c.trim().to_uppercase()),
        is_public,
        updated_by: who.id,
    };
    let setting = st.store.upsert_setting(&update).await?;
    info!(key = %setting.key, admin_id = %who.id, "setting updated");
    Ok(setting)
}
