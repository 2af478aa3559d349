use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

pub const TAX_RATE: &str = "TAX_RATE";
pub const MIN_BOOKING_HOURS: &str = "MIN_BOOKING_HOURS";
pub const MAX_BOOKING_HOURS: &str = "MAX_BOOKING_HOURS";
pub const CANCELLATION_HOURS: &str = "CANCELLATION_HOURS";

/// Runtime-editable key/value configuration.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SystemSetting {
    pub key: String, // upper-case
    pub value: Json<serde_json::Value>,
    pub description: Option<String>,
    pub category: String,
    pub is_public: bool,
    pub updated_by: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl SystemSetting {
    /// Numbers are accepted both as JSON numbers and numeric strings ("8.0").
    pub fn as_f64(&self) -> Option<f64> {
        match &self.value.0 {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_f64()
            .filter(|v| v.fract() == 0.0 && v.is_finite())
            .map(|v| v as i64)
    }
}

#[derive(Debug, Clone)]
pub struct SettingUpdate {
    pub key: String,
    pub value: serde_json::Value,
    pub description: Option<String>,
    pub category: Option<String>,
    pub is_public: Option<bool>,
    pub updated_by: Uuid,
}
