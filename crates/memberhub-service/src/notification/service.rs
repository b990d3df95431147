//! Notification persistence: create, count, list, mark read, purge.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use memberhub_core::AppError;
use memberhub_core::result::AppResult;
use memberhub_core::traits::Clock;
use memberhub_core::types::{NotificationId, PageRequest, PageResponse, UserId};
use memberhub_database::NotificationStore;
use memberhub_entity::notification::{NewNotification, Notification};

use super::retention::RetentionPolicy;
use crate::timeout::StoreGuard;

/// Maximum title length in characters.
const MAX_TITLE_CHARS: usize = 200;

/// Manages notification records. Pushing them to clients is the realtime
/// dispatcher's job, after [`NotificationService::create`] has succeeded.
#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
    guard: StoreGuard,
    clock: Arc<dyn Clock>,
    retention: RetentionPolicy,
}

impl std::fmt::Debug for NotificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationService")
            .field("guard", &self.guard)
            .field("retention", &self.retention)
            .finish()
    }
}

impl NotificationService {
    /// Creates a new notification service.
    pub fn new(
        store: Arc<dyn NotificationStore>,
        guard: StoreGuard,
        clock: Arc<dyn Clock>,
        retention: RetentionPolicy,
    ) -> Self {
        Self {
            store,
            guard,
            clock,
            retention,
        }
    }

    /// Persists a new notification. Failures propagate to the caller.
    pub async fn create(&self, draft: NewNotification) -> AppResult<Notification> {
        if draft.title.trim().is_empty() {
            return Err(AppError::validation("Notification title cannot be empty"));
        }
        if draft.title.chars().count() > MAX_TITLE_CHARS {
            return Err(AppError::validation(format!(
                "Notification title exceeds {MAX_TITLE_CHARS} characters"
            )));
        }

        let notification = draft.into_notification(self.clock.now());
        let stored = self
            .guard
            .call("insert_notification", self.store.insert(notification))
            .await?;
        debug!(
            notification_id = %stored.id,
            recipient_id = %stored.recipient_id,
            kind = %stored.kind,
            "Notification persisted"
        );
        Ok(stored)
    }

    /// Number of unread notifications for `user`.
    pub async fn unread_count(&self, user: UserId) -> AppResult<u64> {
        self.guard
            .call("count_unread", self.store.count_unread(user))
            .await
    }

    /// Lists `user`'s notifications, unread first, then newest first.
    pub async fn list(
        &self,
        user: UserId,
        page: PageRequest,
        unread_only: bool,
    ) -> AppResult<PageResponse<Notification>> {
        self.guard
            .call(
                "list_notifications",
                self.store.list_for_recipient(user, page, unread_only),
            )
            .await
    }

    /// Marks one notification read. Missing or foreign ids are a no-op.
    ///
    /// Returns whether a record changed.
    pub async fn mark_read(&self, user: UserId, id: NotificationId) -> AppResult<bool> {
        let changed = self
            .guard
            .call(
                "mark_notification_read",
                self.store.mark_read(user, id, self.clock.now()),
            )
            .await?;
        if !changed {
            debug!(notification_id = %id, user_id = %user, "Mark-read ignored");
        }
        Ok(changed)
    }

    /// Marks all of `user`'s notifications read. Returns the number changed.
    pub async fn mark_all_read(&self, user: UserId) -> AppResult<u64> {
        self.guard
            .call(
                "mark_all_notifications_read",
                self.store.mark_all_read(user, self.clock.now()),
            )
            .await
    }

    /// Deletes records past their retention horizon as of `now`.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let (read_before, unread_before) = self.retention.horizons(now);
        let removed = self
            .guard
            .call(
                "purge_notifications",
                self.store.purge(read_before, unread_before),
            )
            .await?;
        info!(
            removed,
            read_before = %read_before,
            unread_before = %unread_before,
            "Expired notifications purged"
        );
        Ok(removed)
    }

    /// Deletes expired records as of the service clock's now.
    pub async fn purge_expired_now(&self) -> AppResult<u64> {
        self.purge_expired(self.clock.now()).await
    }
}
