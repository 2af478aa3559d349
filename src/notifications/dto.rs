use serde::{Deserialize, Serialize};

use super::repo_types::Notification;
use crate::pagination::PageMeta;

#[derive(Debug, Deserialize)]
pub struct NotificationFilter {
    #[serde(default)]
    pub unread: bool,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub success: bool,
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
    pub pagination: PageMeta,
}

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub success: bool,
    pub notification: Notification,
}

#[derive(Debug, Serialize)]
pub struct MarkedResponse {
    pub success: bool,
    pub marked: u64,
}
