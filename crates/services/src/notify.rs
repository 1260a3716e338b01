//! Notification side-effects of a comment read.

use std::sync::Arc;

use domains::{CookedNotify, DomainResult, EntityStore, User};
use tracing::debug;

use crate::cook::cook_notification;

pub struct NotificationService {
    store: Arc<dyn EntityStore>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Marks every notification of `user` read. Safe to repeat.
    pub async fn mark_all_read(&self, user: &User) -> DomainResult<()> {
        debug!(user_id = user.id, "marking notifications read");
        self.store.mark_all_notifications_read(user.id).await
    }

    /// Unread notifications of `user`, oldest first; empty without a user.
    pub async fn unread(&self, user: Option<&User>) -> DomainResult<Vec<CookedNotify>> {
        let Some(user) = user else {
            return Ok(Vec::new());
        };
        let notifications = self.store.find_unread_notifications(user.id).await?;
        Ok(notifications.iter().map(cook_notification).collect())
    }
}
