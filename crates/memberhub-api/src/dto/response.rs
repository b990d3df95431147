//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use memberhub_core::types::{ConversationId, MessageId, UserId};
use memberhub_entity::conversation::{Conversation, Message};

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Liveness and load summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status: `ok` or `degraded`.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Seconds since start.
    pub uptime_seconds: u64,
    /// Store backend state.
    pub store: String,
    /// Open WebSocket connections.
    pub ws_connections: usize,
    /// Members with at least one authenticated connection.
    pub connected_members: usize,
}

/// Count response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountResponse {
    /// The count.
    pub count: u64,
}

/// Result of a single mark-read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkReadResponse {
    /// Whether a record changed state.
    pub changed: bool,
}

/// Result of a bulk mark-read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkAllReadResponse {
    /// Records that changed state.
    pub marked: u64,
}

/// A conversation as seen by one participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationResponse {
    /// Conversation id.
    pub id: ConversationId,
    /// All participants.
    pub participants: Vec<UserId>,
    /// Whether this is a group conversation.
    pub is_group: bool,
    /// Last message id.
    pub last_message_id: Option<MessageId>,
    /// Last message time.
    pub last_message_at: Option<DateTime<Utc>>,
    /// Short preview of the last message.
    pub last_message_preview: Option<String>,
    /// The viewer's unread count.
    pub unread_count: u32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl ConversationResponse {
    /// Projects `conversation` for `viewer`.
    pub fn for_viewer(conversation: Conversation, viewer: UserId) -> Self {
        Self {
            unread_count: conversation.unread_for(viewer),
            id: conversation.id,
            participants: conversation.participants,
            is_group: conversation.is_group,
            last_message_id: conversation.last_message_id,
            last_message_at: conversation.last_message_at,
            last_message_preview: conversation.last_message_preview,
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
        }
    }
}

/// Result of a send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentMessageResponse {
    /// The stored message.
    pub message: Message,
    /// The conversation after the append, from the sender's view.
    pub conversation: ConversationResponse,
    /// Notifications created for the other participants.
    pub notified: usize,
}

/// Result of marking a conversation read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationReadResponse {
    /// Conversation id.
    pub conversation_id: ConversationId,
    /// Whether the conversation existed for the caller.
    pub updated: bool,
}
