//! Outbound side effects of booking and payment changes.
//!
//! Dispatch is fire-and-forget from the caller's point of view: [`notify`]
//! never fails, it only logs.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::repo_types::NewNotification;
use crate::{state::AppState, store::Store};

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn dispatch(&self, notification: &NewNotification) -> anyhow::Result<()>;
}

/// Persists the notification for the in-app inbox.
pub struct StoreNotifier {
    store: Arc<dyn Store>,
}

impl StoreNotifier {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Notifier for StoreNotifier {
    async fn dispatch(&self, notification: &NewNotification) -> anyhow::Result<()> {
        let saved = self.store.insert_notification(notification).await?;
        debug!(
            notification_id = %saved.id,
            user_id = %saved.user_id,
            kind = %saved.notification_type,
            "notification stored"
        );
        Ok(())
    }
}

pub async fn notify(st: &AppState, notification: NewNotification) {
    if let Err(e) = st.notifier.dispatch(&notification).await {
        warn!(
            error = %e,
            user_id = %notification.user_id,
            kind = %notification.notification_type,
            "notification dispatch failed"
        );
    }
}
