//! Chat message entity. Messages are append-only.

use chrono::{DateTime, Utc};
use memberhub_core::AppError;
use memberhub_core::types::{ConversationId, MessageId, UserId};
use serde::{Deserialize, Serialize};

/// Maximum message length in characters.
pub const MAX_CONTENT_CHARS: usize = 5000;

/// A member having read a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadReceipt {
    /// Reader.
    pub user_id: UserId,
    /// When it was read.
    pub read_at: DateTime<Utc>,
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier.
    pub id: MessageId,
    /// Owning conversation.
    pub conversation_id: ConversationId,
    /// Author.
    pub sender_id: UserId,
    /// Body, 1 to 5000 characters.
    pub content: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Store insertion sequence; breaks ties between equal timestamps.
    pub seq: i64,
    /// Members who have read this message.
    pub read_by: Vec<ReadReceipt>,
}

impl Message {
    /// Build a validated, not yet persisted message. `seq` is assigned by the store.
    pub fn new(
        conversation_id: ConversationId,
        sender_id: UserId,
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, AppError> {
        let content = content.into();
        Self::validate_content(&content)?;
        Ok(Self {
            id: MessageId::new(),
            conversation_id,
            sender_id,
            content,
            created_at: now,
            seq: 0,
            read_by: Vec::new(),
        })
    }

    /// Reject empty or overlong bodies.
    pub fn validate_content(content: &str) -> Result<(), AppError> {
        if content.trim().is_empty() {
            return Err(AppError::validation("Message content cannot be empty"));
        }
        let chars = content.chars().count();
        if chars > MAX_CONTENT_CHARS {
            return Err(AppError::validation(format!(
                "Message content is {chars} characters, maximum is {MAX_CONTENT_CHARS}"
            )));
        }
        Ok(())
    }

    /// Whether `user` has a receipt on this message.
    pub fn is_read_by(&self, user: UserId) -> bool {
        self.read_by.iter().any(|r| r.user_id == user)
    }

    /// Record a receipt unless `user` wrote the message or already read it.
    ///
    /// Returns `true` when a receipt was added.
    pub fn record_read(&mut self, user: UserId, at: DateTime<Utc>) -> bool {
        if self.sender_id == user || self.is_read_by(user) {
            return false;
        }
        self.read_by.push(ReadReceipt {
            user_id: user,
            read_at: at,
        });
        true
    }

    /// Ordering key: creation time, then store sequence.
    pub fn order_key(&self) -> (DateTime<Utc>, i64) {
        (self.created_at, self.seq)
    }
}
