//! Polymorphic link from a notification to the thing it is about.

use memberhub_core::AppError;
use memberhub_core::types::{ConversationId, MessageId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discriminant of a [`NotificationReference`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Message,
    Conversation,
    Brag,
    ForumThread,
    ForumReply,
    Equipment,
    LibraryItem,
}

impl ReferenceKind {
    /// Every kind, in declaration order.
    pub const ALL: [ReferenceKind; 7] = [
        Self::Message,
        Self::Conversation,
        Self::Brag,
        Self::ForumThread,
        Self::ForumReply,
        Self::Equipment,
        Self::LibraryItem,
    ];

    /// Return the kind as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Conversation => "conversation",
            Self::Brag => "brag",
            Self::ForumThread => "forum_thread",
            Self::ForumReply => "forum_reply",
            Self::Equipment => "equipment",
            Self::LibraryItem => "library_item",
        }
    }
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReferenceKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| AppError::validation(format!("Invalid reference kind: '{s}'")))
    }
}

/// What a notification points at. Serialized as `{"kind": ..., "id": ...}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum NotificationReference {
    Message(MessageId),
    Conversation(ConversationId),
    Brag(Uuid),
    ForumThread(Uuid),
    ForumReply(Uuid),
    Equipment(Uuid),
    LibraryItem(Uuid),
}

impl NotificationReference {
    /// The variant's discriminant.
    pub fn kind(&self) -> ReferenceKind {
        match self {
            Self::Message(_) => ReferenceKind::Message,
            Self::Conversation(_) => ReferenceKind::Conversation,
            Self::Brag(_) => ReferenceKind::Brag,
            Self::ForumThread(_) => ReferenceKind::ForumThread,
            Self::ForumReply(_) => ReferenceKind::ForumReply,
            Self::Equipment(_) => ReferenceKind::Equipment,
            Self::LibraryItem(_) => ReferenceKind::LibraryItem,
        }
    }

    /// The referenced record's raw id.
    pub fn id(&self) -> Uuid {
        match self {
            Self::Message(id) => id.into_uuid(),
            Self::Conversation(id) => id.into_uuid(),
            Self::Brag(id)
            | Self::ForumThread(id)
            | Self::ForumReply(id)
            | Self::Equipment(id)
            | Self::LibraryItem(id) => *id,
        }
    }

    /// Rebuild a reference from its stored `(kind, id)` columns.
    pub fn from_parts(kind: ReferenceKind, id: Uuid) -> Self {
        match kind {
            ReferenceKind::Message => Self::Message(MessageId::from_uuid(id)),
            ReferenceKind::Conversation => Self::Conversation(ConversationId::from_uuid(id)),
            ReferenceKind::Brag => Self::Brag(id),
            ReferenceKind::ForumThread => Self::ForumThread(id),
            ReferenceKind::ForumReply => Self::ForumReply(id),
            ReferenceKind::Equipment => Self::Equipment(id),
            ReferenceKind::LibraryItem => Self::LibraryItem(id),
        }
    }
}
