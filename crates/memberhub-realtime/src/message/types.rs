//! Inbound client events and outbound event payloads.

use serde::{Deserialize, Serialize};

use memberhub_core::types::{ConnectionId, ConversationId, UserId};
use memberhub_entity::presence::{PresenceChange, PresenceStatus};

/// Events sent by the client to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InboundEvent {
    /// Bind the connection to a member using a bearer credential.
    Authenticate {
        /// Signed token.
        token: String,
    },
    /// Keep-alive that also counts as activity.
    Heartbeat,
    /// Join a room.
    Subscribe {
        /// Room name, e.g. `presence:<uuid>`.
        room: String,
    },
    /// Leave a room.
    Unsubscribe {
        /// Room name.
        room: String,
    },
}

impl InboundEvent {
    /// Event name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Authenticate { .. } => "authenticate",
            Self::Heartbeat => "heartbeat",
            Self::Subscribe { .. } => "subscribe",
            Self::Unsubscribe { .. } => "unsubscribe",
        }
    }
}

/// Outbound event names.
pub mod events {
    /// A new notification record.
    pub const NOTIFICATION: &str = "notification";
    /// Fresh unread notification count.
    pub const NOTIFICATION_UNREAD_COUNT: &str = "notification:unread_count";
    /// A member's presence changed.
    pub const PRESENCE_UPDATE: &str = "presence:update";
    /// A message was appended to a conversation.
    pub const MESSAGE_NEW: &str = "message:new";
    /// The member read a conversation from another tab.
    pub const CONVERSATION_READ: &str = "conversation:read";
    /// Authentication accepted.
    pub const AUTHENTICATED: &str = "authenticated";
    /// Reply to `heartbeat`.
    pub const HEARTBEAT_ACK: &str = "heartbeat_ack";
    /// Room joined.
    pub const SUBSCRIBED: &str = "subscribed";
    /// Room left.
    pub const UNSUBSCRIBED: &str = "unsubscribed";
    /// Protocol error.
    pub const ERROR: &str = "error";
}

/// Codes carried by `error` events.
pub mod codes {
    pub const INVALID_FRAME: &str = "INVALID_FRAME";
    pub const INVALID_EVENT: &str = "INVALID_EVENT";
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const AUTHENTICATION_FAILED: &str = "AUTHENTICATION_FAILED";
    pub const SUBSCRIBE_FAILED: &str = "SUBSCRIBE_FAILED";
}

/// Payload of `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

/// Payload of `authenticated`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedPayload {
    pub user_id: UserId,
    pub connection_id: ConnectionId,
}

/// Payload of `subscribed` and `unsubscribed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomPayload {
    pub room: String,
}

/// Payload of `presence:update`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PresenceUpdatePayload {
    pub user_id: UserId,
    pub status: PresenceStatus,
}

impl From<PresenceChange> for PresenceUpdatePayload {
    fn from(change: PresenceChange) -> Self {
        Self {
            user_id: change.user_id,
            status: change.status,
        }
    }
}

/// Payload of `notification:unread_count`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UnreadCountPayload {
    pub count: u64,
}

/// Payload of `conversation:read`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConversationReadPayload {
    pub conversation_id: ConversationId,
    pub unread_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inbound_events() {
        let event: InboundEvent =
            serde_json::from_str(r#"{"event":"subscribe","room":"presence:abc"}"#).unwrap();
        assert_eq!(
            event,
            InboundEvent::Subscribe {
                room: "presence:abc".into()
            }
        );

        let event: InboundEvent = serde_json::from_str(r#"{"event":"heartbeat"}"#).unwrap();
        assert_eq!(event.name(), "heartbeat");
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        assert!(serde_json::from_str::<InboundEvent>(r#"{"event":"shutdown"}"#).is_err());
        assert!(serde_json::from_str::<InboundEvent>(r#"{"room":"user:1"}"#).is_err());
    }
}
