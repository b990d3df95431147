//! In-memory [`NotificationStore`].

use std::cmp::Reverse;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use memberhub_core::result::AppResult;
use memberhub_core::types::{NotificationId, PageRequest, PageResponse, UserId};
use memberhub_entity::notification::Notification;

use crate::traits::NotificationStore;

/// Notification store keyed by recipient, with an id index.
#[derive(Debug, Default)]
pub struct MemoryNotificationStore {
    by_recipient: DashMap<UserId, Vec<Notification>>,
    recipient_of: DashMap<NotificationId, UserId>,
}

impl MemoryNotificationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn insert(&self, notification: Notification) -> AppResult<Notification> {
        self.recipient_of
            .insert(notification.id, notification.recipient_id);
        self.by_recipient
            .entry(notification.recipient_id)
            .or_default()
            .push(notification.clone());
        Ok(notification)
    }

    async fn get(&self, id: NotificationId) -> AppResult<Option<Notification>> {
        let Some(recipient) = self.recipient_of.get(&id).map(|r| *r.value()) else {
            return Ok(None);
        };
        Ok(self
            .by_recipient
            .get(&recipient)
            .and_then(|list| list.iter().find(|n| n.id == id).cloned()))
    }

    async fn list_for_recipient(
        &self,
        recipient: UserId,
        page: PageRequest,
        unread_only: bool,
    ) -> AppResult<PageResponse<Notification>> {
        let mut items: Vec<Notification> = self
            .by_recipient
            .get(&recipient)
            .map(|list| {
                list.iter()
                    .filter(|n| !unread_only || !n.is_read())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        items.sort_by_key(|n| (n.is_read(), Reverse(n.created_at)));
        let total = items.len() as u64;
        Ok(PageResponse::new(page.slice(items), page, total))
    }

    async fn count_unread(&self, recipient: UserId) -> AppResult<u64> {
        Ok(self
            .by_recipient
            .get(&recipient)
            .map(|list| list.iter().filter(|n| !n.is_read()).count() as u64)
            .unwrap_or(0))
    }

    async fn mark_read(
        &self,
        recipient: UserId,
        id: NotificationId,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let Some(mut list) = self.by_recipient.get_mut(&recipient) else {
            return Ok(false);
        };
        Ok(list
            .iter_mut()
            .find(|n| n.id == id)
            .is_some_and(|n| n.mark_read(at)))
    }

    async fn mark_all_read(&self, recipient: UserId, at: DateTime<Utc>) -> AppResult<u64> {
        let Some(mut list) = self.by_recipient.get_mut(&recipient) else {
            return Ok(0);
        };
        let changed = list
            .iter_mut()
            .map(|n| n.mark_read(at))
            .filter(|changed| *changed)
            .count();
        Ok(changed as u64)
    }

    async fn purge(
        &self,
        read_before: DateTime<Utc>,
        unread_before: DateTime<Utc>,
    ) -> AppResult<u64> {
        let mut removed = 0u64;
        for mut list in self.by_recipient.iter_mut() {
            list.retain(|n| {
                let expired = n.is_expired(read_before, unread_before);
                if expired {
                    self.recipient_of.remove(&n.id);
                    removed += 1;
                }
                !expired
            });
        }
        self.by_recipient.retain(|_, list| !list.is_empty());
        Ok(removed)
    }
}
