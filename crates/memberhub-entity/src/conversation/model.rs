//! Conversation entity and its unread vector.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use memberhub_core::AppError;
use memberhub_core::types::{ConversationId, MessageId, UserId};
use serde::{Deserialize, Serialize};

use super::direct_key::DirectKey;
use super::message::Message;

/// Maximum length of `last_message_preview`, in characters.
pub const MAX_PREVIEW_CHARS: usize = 100;

/// A direct or group conversation. Conversations are never hard-deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation identifier.
    pub id: ConversationId,
    /// Members, at least two, without duplicates.
    pub participants: Vec<UserId>,
    /// Whether this is a group conversation.
    pub is_group: bool,
    /// Most recent message.
    pub last_message_id: Option<MessageId>,
    /// Time of the most recent message.
    pub last_message_at: Option<DateTime<Utc>>,
    /// First characters of the most recent message.
    pub last_message_preview: Option<String>,
    /// Unread message count per participant.
    pub unread_counts: HashMap<UserId, u32>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// A fresh direct conversation for `key`, with zero unread for both members.
    pub fn new_direct(key: DirectKey, now: DateTime<Utc>) -> Self {
        Self::build(key.members().to_vec(), false, now)
    }

    /// A fresh group conversation. Duplicate members are collapsed.
    pub fn new_group(participants: Vec<UserId>, now: DateTime<Utc>) -> Result<Self, AppError> {
        let mut unique: Vec<UserId> = Vec::with_capacity(participants.len());
        for p in participants {
            if !unique.contains(&p) {
                unique.push(p);
            }
        }
        if unique.len() < 2 {
            return Err(AppError::validation(
                "A conversation needs at least two distinct participants",
            ));
        }
        Ok(Self::build(unique, true, now))
    }

    fn build(participants: Vec<UserId>, is_group: bool, now: DateTime<Utc>) -> Self {
        let unread_counts = participants.iter().map(|p| (*p, 0)).collect();
        Self {
            id: ConversationId::new(),
            participants,
            is_group,
            last_message_id: None,
            last_message_at: None,
            last_message_preview: None,
            unread_counts,
            created_at: now,
            updated_at: now,
        }
    }

    /// The direct key for two-member, non-group conversations.
    pub fn direct_key(&self) -> Option<DirectKey> {
        match (self.is_group, self.participants.as_slice()) {
            (false, [a, b]) => DirectKey::new(*a, *b).ok(),
            _ => None,
        }
    }

    /// Whether `user` is a member.
    pub fn is_participant(&self, user: UserId) -> bool {
        self.participants.contains(&user)
    }

    /// Members other than `user`.
    pub fn others(&self, user: UserId) -> impl Iterator<Item = UserId> + '_ {
        self.participants.iter().copied().filter(move |p| *p != user)
    }

    /// Unread count for `user`; zero for non-members.
    pub fn unread_for(&self, user: UserId) -> u32 {
        self.unread_counts.get(&user).copied().unwrap_or(0)
    }

    /// Apply an appended message: update the `last_message_*` fields and
    /// increment every other participant's counter.
    ///
    /// Callers must hold whatever lock makes this step atomic.
    pub fn apply_message(&mut self, message: &Message) {
        self.last_message_id = Some(message.id);
        self.last_message_at = Some(message.created_at);
        self.last_message_preview = Some(preview(&message.content));
        self.updated_at = message.created_at;
        for p in &self.participants {
            if *p != message.sender_id {
                let count = self.unread_counts.entry(*p).or_insert(0);
                *count = count.saturating_add(1);
            }
        }
    }

    /// Zero `user`'s counter. Returns `false` for non-members.
    pub fn reset_unread(&mut self, user: UserId, now: DateTime<Utc>) -> bool {
        if !self.is_participant(user) {
            return false;
        }
        self.unread_counts.insert(user, 0);
        self.updated_at = now;
        true
    }
}

/// Truncate `content` to [`MAX_PREVIEW_CHARS`] characters on a char boundary.
pub fn preview(content: &str) -> String {
    match content.char_indices().nth(MAX_PREVIEW_CHARS) {
        Some((idx, _)) => content[..idx].to_string(),
        None => content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_message_increments_others_only() {
        let a = UserId::new();
        let b = UserId::new();
        let now = Utc::now();
        let mut conv = Conversation::new_direct(DirectKey::new(a, b).unwrap(), now);
        for _ in 0..3 {
            let msg = Message::new(conv.id, a, "hello", now).unwrap();
            conv.apply_message(&msg);
        }
        assert_eq!(conv.unread_for(a), 0);
        assert_eq!(conv.unread_for(b), 3);
        assert_eq!(conv.last_message_preview.as_deref(), Some("hello"));
    }

    #[test]
    fn test_reset_then_append_counts_one() {
        let a = UserId::new();
        let b = UserId::new();
        let now = Utc::now();
        let mut conv = Conversation::new_direct(DirectKey::new(a, b).unwrap(), now);
        conv.apply_message(&Message::new(conv.id, a, "one", now).unwrap());
        assert!(conv.reset_unread(b, now));
        conv.apply_message(&Message::new(conv.id, a, "two", now).unwrap());
        assert_eq!(conv.unread_for(b), 1);
        assert!(!conv.reset_unread(UserId::new(), now));
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "日本語".repeat(50);
        let p = preview(&long);
        assert_eq!(p.chars().count(), MAX_PREVIEW_CHARS);
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn test_group_requires_two_distinct() {
        let a = UserId::new();
        assert!(Conversation::new_group(vec![a, a], Utc::now()).is_err());
        let conv = Conversation::new_group(vec![a, UserId::new(), a], Utc::now()).unwrap();
        assert_eq!(conv.participants.len(), 2);
        assert!(conv.is_group);
        assert!(conv.direct_key().is_none());
    }
}
