//! In-memory [`ConversationStore`].

use std::cmp::Reverse;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use memberhub_core::AppError;
use memberhub_core::result::AppResult;
use memberhub_core::types::{ConversationId, PageRequest, PageResponse, UserId};
use memberhub_entity::conversation::{Conversation, DirectKey, Message};

use crate::traits::ConversationStore;

/// A conversation and its append-only message log.
#[derive(Debug)]
struct ConversationRecord {
    conversation: Conversation,
    messages: Vec<Message>,
}

/// Conversation store backed by sharded concurrent maps.
#[derive(Debug, Default)]
pub struct MemoryConversationStore {
    conversations: DashMap<ConversationId, ConversationRecord>,
    direct_index: DashMap<DirectKey, ConversationId>,
    next_seq: AtomicI64,
}

impl MemoryConversationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored conversations.
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    /// Whether the store holds no conversations.
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn find_direct(&self, key: &DirectKey) -> AppResult<Option<Conversation>> {
        let Some(id) = self.direct_index.get(key).map(|r| *r.value()) else {
            return Ok(None);
        };
        Ok(self
            .conversations
            .get(&id)
            .map(|r| r.conversation.clone()))
    }

    async fn insert_direct(
        &self,
        key: &DirectKey,
        conversation: Conversation,
    ) -> AppResult<Conversation> {
        match self.direct_index.entry(*key) {
            Entry::Occupied(_) => Err(AppError::conflict(format!(
                "Direct conversation {key} already exists"
            ))),
            Entry::Vacant(slot) => {
                // Insert the record before publishing the index entry so a
                // concurrent find never sees a dangling id.
                self.conversations.insert(
                    conversation.id,
                    ConversationRecord {
                        conversation: conversation.clone(),
                        messages: Vec::new(),
                    },
                );
                slot.insert(conversation.id);
                Ok(conversation)
            }
        }
    }

    async fn insert_group(&self, conversation: Conversation) -> AppResult<Conversation> {
        match self.conversations.entry(conversation.id) {
            Entry::Occupied(_) => Err(AppError::conflict(format!(
                "Conversation {} already exists",
                conversation.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(ConversationRecord {
                    conversation: conversation.clone(),
                    messages: Vec::new(),
                });
                Ok(conversation)
            }
        }
    }

    async fn get(&self, id: ConversationId) -> AppResult<Option<Conversation>> {
        Ok(self.conversations.get(&id).map(|r| r.conversation.clone()))
    }

    async fn list_for_user(
        &self,
        user: UserId,
        page: PageRequest,
    ) -> AppResult<PageResponse<Conversation>> {
        let mut matching: Vec<Conversation> = self
            .conversations
            .iter()
            .filter(|r| r.conversation.is_participant(user))
            .map(|r| r.conversation.clone())
            .collect();
        matching.sort_by_key(|c| Reverse(c.last_message_at.unwrap_or(c.created_at)));
        let total = matching.len() as u64;
        Ok(PageResponse::new(page.slice(matching), page, total))
    }

    async fn append_message(&self, mut message: Message) -> AppResult<(Message, Conversation)> {
        let mut record = self
            .conversations
            .get_mut(&message.conversation_id)
            .ok_or_else(|| {
                AppError::not_found(format!("Conversation {} not found", message.conversation_id))
            })?;
        message.seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(last) = record.conversation.last_message_at {
            message.created_at = message.created_at.max(last);
        }
        record.conversation.apply_message(&message);
        record.messages.push(message.clone());
        Ok((message, record.conversation.clone()))
    }

    async fn mark_read(
        &self,
        id: ConversationId,
        user: UserId,
        at: DateTime<Utc>,
    ) -> AppResult<Option<(Conversation, u64)>> {
        let Some(mut record) = self.conversations.get_mut(&id) else {
            return Ok(None);
        };
        let record = &mut *record;
        if !record.conversation.reset_unread(user, at) {
            return Ok(None);
        }
        let added = record
            .messages
            .iter_mut()
            .map(|m| m.record_read(user, at))
            .filter(|added| *added)
            .count();
        Ok(Some((record.conversation.clone(), added as u64)))
    }

    async fn list_messages(
        &self,
        id: ConversationId,
        page: PageRequest,
    ) -> AppResult<PageResponse<Message>> {
        let Some(record) = self.conversations.get(&id) else {
            return Ok(PageResponse::new(Vec::new(), page, 0));
        };
        let total = record.messages.len() as u64;
        let mut ordered: Vec<&Message> = record.messages.iter().collect();
        ordered.sort_by_key(|m| Reverse(m.order_key()));
        let items = page.slice(ordered.into_iter().cloned());
        Ok(PageResponse::new(items, page, total))
    }
}
