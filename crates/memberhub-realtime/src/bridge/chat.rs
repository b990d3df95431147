//! Messaging bridge — ledger write, live push, message notifications.
//!
//! The ledger write is the only step a sender sees fail before the
//! message exists. After it, pushes are best effort, while the
//! per-recipient notification records are durable writes whose failure is
//! returned even though the message itself is already stored.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use memberhub_core::result::AppResult;
use memberhub_core::types::{ConversationId, UserId};
use memberhub_database::UserDirectory;
use memberhub_entity::conversation::{Conversation, Message};
use memberhub_entity::notification::Notification;
use memberhub_entity::user::UserSummary;
use memberhub_service::{ConversationLedger, StoreGuard};

use crate::connection::gateway::ConnectionGateway;
use crate::message::types::{ConversationReadPayload, events};
use crate::notification::dispatcher::NotificationDispatcher;
use crate::notification::formatter::NotificationFormatter;
use crate::room::types::RoomName;

/// Payload of `message:new`.
#[derive(Debug, Clone, Serialize)]
pub struct MessagePush {
    /// The stored message.
    pub message: Message,
    /// Sender display fields.
    pub sender: UserSummary,
    /// The receiving member's unread count for this conversation; absent
    /// on the shared conversation room.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unread_count: Option<u32>,
}

/// Result of a successful send.
#[derive(Debug, Clone)]
pub struct SentMessage {
    /// The stored message with its sequence number.
    pub message: Message,
    /// The conversation after the append.
    pub conversation: Conversation,
    /// One notification per other participant.
    pub notifications: Vec<Notification>,
}

/// Runs the send and mark-read flows end to end.
#[derive(Clone)]
pub struct MessagingBridge {
    ledger: Arc<ConversationLedger>,
    gateway: Arc<ConnectionGateway>,
    dispatcher: Arc<NotificationDispatcher>,
    directory: Arc<dyn UserDirectory>,
    guard: StoreGuard,
}

impl std::fmt::Debug for MessagingBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagingBridge")
            .field("ledger", &self.ledger)
            .field("guard", &self.guard)
            .finish()
    }
}

impl MessagingBridge {
    /// Creates the bridge.
    pub fn new(
        ledger: Arc<ConversationLedger>,
        gateway: Arc<ConnectionGateway>,
        dispatcher: Arc<NotificationDispatcher>,
        directory: Arc<dyn UserDirectory>,
        guard: StoreGuard,
    ) -> Self {
        Self {
            ledger,
            gateway,
            dispatcher,
            directory,
            guard,
        }
    }

    /// The ledger this bridge writes to.
    pub fn ledger(&self) -> &Arc<ConversationLedger> {
        &self.ledger
    }

    /// Sends `content` from `sender` to `recipient`, creating their direct
    /// conversation on first contact.
    pub async fn send_direct(
        &self,
        sender: UserId,
        recipient: UserId,
        content: &str,
    ) -> AppResult<SentMessage> {
        Message::validate_content(content)?;
        let conversation = self.ledger.find_or_create_direct(sender, recipient).await?;
        self.send_to_conversation(conversation.id, sender, content)
            .await
    }

    /// Appends to an existing conversation, then pushes and notifies.
    pub async fn send_to_conversation(
        &self,
        conversation_id: ConversationId,
        sender: UserId,
        content: &str,
    ) -> AppResult<SentMessage> {
        let (message, conversation) = self
            .ledger
            .append_message(conversation_id, sender, content)
            .await?;
        let summary = self.sender_summary(sender).await;
        let recipients: Vec<UserId> = conversation.others(sender).collect();

        for &recipient in &recipients {
            self.push(
                &RoomName::User(recipient),
                &MessagePush {
                    message: message.clone(),
                    sender: summary.clone(),
                    unread_count: Some(conversation.unread_for(recipient)),
                },
            );
        }
        self.push(
            &RoomName::Conversation(conversation.id),
            &MessagePush {
                message: message.clone(),
                sender: summary.clone(),
                unread_count: None,
            },
        );

        let mut notifications = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            let draft =
                NotificationFormatter::direct_message(&summary, recipient, conversation.id, &message);
            notifications.push(self.dispatcher.notify(draft).await?);
        }

        info!(
            conversation_id = %conversation.id,
            message_id = %message.id,
            sender_id = %sender,
            recipients = notifications.len(),
            "Message delivered"
        );
        Ok(SentMessage {
            message,
            conversation,
            notifications,
        })
    }

    /// Marks a conversation read for `user` and tells the member's other
    /// tabs. Missing conversations and non-participants are a no-op.
    pub async fn mark_conversation_read(
        &self,
        conversation_id: ConversationId,
        user: UserId,
    ) -> AppResult<Option<Conversation>> {
        let Some(conversation) = self.ledger.mark_read(conversation_id, user).await? else {
            return Ok(None);
        };
        if let Err(e) = self.gateway.emit(
            &RoomName::User(user),
            events::CONVERSATION_READ,
            &ConversationReadPayload {
                conversation_id,
                unread_count: conversation.unread_for(user),
            },
        ) {
            warn!(conversation_id = %conversation_id, user_id = %user, error = %e, "Failed to push read state");
        }
        Ok(Some(conversation))
    }

    fn push(&self, room: &RoomName, payload: &MessagePush) {
        if let Err(e) = self.gateway.emit(room, events::MESSAGE_NEW, payload) {
            warn!(room = %room, message_id = %payload.message.id, error = %e, "Failed to push message");
        }
    }

    async fn sender_summary(&self, sender: UserId) -> UserSummary {
        match self
            .guard
            .call("sender_summary", self.directory.summary(sender))
            .await
        {
            Ok(summary) => summary.unwrap_or_else(|| UserSummary::unknown(sender)),
            Err(e) => {
                warn!(user_id = %sender, error = %e, "Failed to load sender display fields");
                UserSummary::unknown(sender)
            }
        }
    }
}
