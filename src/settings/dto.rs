use serde::{Deserialize, Serialize};

use super::repo_types::SystemSetting;

#[derive(Debug, Deserialize)]
pub struct UpdateSettingRequest {
    pub value: serde_json::Value,
    pub description: Option<String>,
    pub category: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub success: bool,
    pub settings: Vec<SystemSetting>,
}

#[derive(Debug, Serialize)]
pub struct SettingResponse {
    pub success: bool,
    pub setting: SystemSetting,
}
