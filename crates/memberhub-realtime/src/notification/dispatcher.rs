//! Notification dispatcher — persist, then push to the recipient's room.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use memberhub_core::result::AppResult;
use memberhub_core::types::{NotificationId, UserId};
use memberhub_database::UserDirectory;
use memberhub_entity::notification::{NewNotification, Notification};
use memberhub_entity::user::UserSummary;
use memberhub_service::{NotificationService, ReferenceResolver, ResolvedReference, StoreGuard};

use crate::connection::gateway::ConnectionGateway;
use crate::message::types::{UnreadCountPayload, events};
use crate::room::types::RoomName;

/// What a client receives with a `notification` event.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationPayload {
    /// The stored record.
    #[serde(flatten)]
    pub notification: Notification,
    /// Display fields of the sender, when there is one and it resolves.
    pub sender: Option<UserSummary>,
    /// Where the notification links to.
    pub link: Option<ResolvedReference>,
}

/// Two-phase notification fan-out.
///
/// The durable write decides success; the push afterwards is a hint and
/// its failures are only logged.
#[derive(Clone)]
pub struct NotificationDispatcher {
    service: Arc<NotificationService>,
    gateway: Arc<ConnectionGateway>,
    directory: Arc<dyn UserDirectory>,
    resolver: ReferenceResolver,
    guard: StoreGuard,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("resolver", &self.resolver)
            .field("guard", &self.guard)
            .finish()
    }
}

impl NotificationDispatcher {
    /// Create a new dispatcher
    pub fn new(
        service: Arc<NotificationService>,
        gateway: Arc<ConnectionGateway>,
        directory: Arc<dyn UserDirectory>,
        resolver: ReferenceResolver,
        guard: StoreGuard,
    ) -> Self {
        Self {
            service,
            gateway,
            directory,
            resolver,
            guard,
        }
    }

    /// The persistence service behind this dispatcher.
    pub fn service(&self) -> &Arc<NotificationService> {
        &self.service
    }

    /// Persists `draft`, then pushes it to `user:<recipient>`.
    ///
    /// Only the write can fail the call.
    pub async fn notify(&self, draft: NewNotification) -> AppResult<Notification> {
        let notification = self.service.create(draft).await?;
        self.push(&notification).await;
        Ok(notification)
    }

    /// Pushes a stored notification. Returns the number of connections
    /// reached; failures are logged and count as zero.
    pub async fn push(&self, notification: &Notification) -> usize {
        let payload = self.payload(notification).await;
        let room = RoomName::User(notification.recipient_id);
        match self.gateway.emit(&room, events::NOTIFICATION, &payload) {
            Ok(delivered) => {
                debug!(
                    notification_id = %notification.id,
                    recipient_id = %notification.recipient_id,
                    delivered,
                    "Notification pushed"
                );
                delivered
            }
            Err(e) => {
                warn!(
                    notification_id = %notification.id,
                    error = %e,
                    "Failed to push notification"
                );
                0
            }
        }
    }

    /// Builds the push payload: record, sender display fields, link.
    pub async fn payload(&self, notification: &Notification) -> NotificationPayload {
        let sender = match notification.sender_id {
            Some(sender_id) => self.sender_summary(sender_id).await,
            None => None,
        };
        let link = match &notification.reference {
            Some(reference) => self.resolver.resolve(reference).await,
            None => None,
        };
        NotificationPayload {
            notification: notification.clone(),
            sender,
            link,
        }
    }

    async fn sender_summary(&self, sender_id: UserId) -> Option<UserSummary> {
        match self
            .guard
            .call("sender_summary", self.directory.summary(sender_id))
            .await
        {
            Ok(Some(summary)) => Some(summary),
            Ok(None) => Some(UserSummary::unknown(sender_id)),
            Err(e) => {
                warn!(user_id = %sender_id, error = %e, "Failed to load sender display fields");
                None
            }
        }
    }

    /// Sends the current unread count to `user:<user>`. Best effort.
    pub async fn push_unread_count(&self, user: UserId) {
        let count = match self.service.unread_count(user).await {
            Ok(count) => count,
            Err(e) => {
                warn!(user_id = %user, error = %e, "Failed to count unread notifications");
                return;
            }
        };
        if let Err(e) = self.gateway.emit(
            &RoomName::User(user),
            events::NOTIFICATION_UNREAD_COUNT,
            &UnreadCountPayload { count },
        ) {
            warn!(user_id = %user, error = %e, "Failed to push unread count");
        }
    }

    /// Marks one notification read and refreshes the member's badge.
    pub async fn mark_read(&self, user: UserId, id: NotificationId) -> AppResult<bool> {
        let changed = self.service.mark_read(user, id).await?;
        if changed {
            self.push_unread_count(user).await;
        }
        Ok(changed)
    }

    /// Marks all of a member's notifications read and refreshes the badge.
    pub async fn mark_all_read(&self, user: UserId) -> AppResult<u64> {
        let changed = self.service.mark_all_read(user).await?;
        self.push_unread_count(user).await;
        Ok(changed)
    }
}
