//! Conversations, messages and per-participant unread counters.
//!
//! The ledger is the single writer of unread vectors. Every store call is
//! bounded by a [`StoreGuard`]; a timeout fails the triggering action.

use std::sync::Arc;

use tracing::{debug, info};

use memberhub_core::AppError;
use memberhub_core::result::AppResult;
use memberhub_core::traits::Clock;
use memberhub_core::types::{ConversationId, PageRequest, PageResponse, UserId};
use memberhub_database::ConversationStore;
use memberhub_entity::conversation::{Conversation, DirectKey, Message};

use crate::timeout::StoreGuard;

/// Find-then-insert rounds before giving up on a contended direct pair.
const DIRECT_CREATE_ATTEMPTS: usize = 3;

/// Owns conversation and message persistence.
#[derive(Clone)]
pub struct ConversationLedger {
    store: Arc<dyn ConversationStore>,
    guard: StoreGuard,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ConversationLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationLedger")
            .field("guard", &self.guard)
            .finish()
    }
}

impl ConversationLedger {
    /// Creates a ledger over `store`.
    pub fn new(store: Arc<dyn ConversationStore>, guard: StoreGuard, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            guard,
            clock,
        }
    }

    /// Returns the direct conversation between `a` and `b`, creating it if needed.
    ///
    /// Concurrent callers for the same pair all receive the same
    /// conversation: a lost insert race shows up as `Conflict` and is
    /// resolved by looking the pair up again.
    pub async fn find_or_create_direct(&self, a: UserId, b: UserId) -> AppResult<Conversation> {
        let key = DirectKey::new(a, b)?;

        for attempt in 1..=DIRECT_CREATE_ATTEMPTS {
            if let Some(existing) = self
                .guard
                .call("find_direct", self.store.find_direct(&key))
                .await?
            {
                return Ok(existing);
            }

            let fresh = Conversation::new_direct(key, self.clock.now());
            match self
                .guard
                .call("insert_direct", self.store.insert_direct(&key, fresh))
                .await
            {
                Ok(created) => {
                    info!(conversation_id = %created.id, direct_key = %key, "Direct conversation created");
                    return Ok(created);
                }
                Err(e) if e.is_conflict() => {
                    debug!(direct_key = %key, attempt, "Lost direct conversation insert race");
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::internal(format!(
            "Direct conversation {key} could not be resolved after {DIRECT_CREATE_ATTEMPTS} attempts"
        )))
    }

    /// Creates a group conversation. The creator is always a participant.
    pub async fn create_group(
        &self,
        creator: UserId,
        participants: Vec<UserId>,
    ) -> AppResult<Conversation> {
        let mut members = Vec::with_capacity(participants.len() + 1);
        members.push(creator);
        members.extend(participants);
        let conversation = Conversation::new_group(members, self.clock.now())?;

        let created = self
            .guard
            .call("insert_group", self.store.insert_group(conversation))
            .await?;
        info!(
            conversation_id = %created.id,
            participants = created.participants.len(),
            "Group conversation created"
        );
        Ok(created)
    }

    /// Appends a message and applies it to the unread vector in one store step.
    ///
    /// Fails with `NotFound` for an unknown conversation and `Authorization`
    /// when `sender` is not a participant.
    pub async fn append_message(
        &self,
        conversation_id: ConversationId,
        sender: UserId,
        content: &str,
    ) -> AppResult<(Message, Conversation)> {
        Message::validate_content(content)?;

        let conversation = self
            .guard
            .call("get_conversation", self.store.get(conversation_id))
            .await?
            .ok_or_else(|| AppError::not_found(format!("Conversation {conversation_id} not found")))?;
        if !conversation.is_participant(sender) {
            return Err(AppError::authorization(format!(
                "User {sender} is not a participant of conversation {conversation_id}"
            )));
        }

        let message = Message::new(conversation_id, sender, content, self.clock.now())?;
        let (message, conversation) = self
            .guard
            .call("append_message", self.store.append_message(message))
            .await?;

        debug!(
            conversation_id = %conversation_id,
            message_id = %message.id,
            seq = message.seq,
            "Message appended"
        );
        Ok((message, conversation))
    }

    /// Resets `user`'s unread counter and records read receipts in one
    /// store step, so a message appended concurrently is either counted and
    /// unread or reset and read, never half of each.
    ///
    /// A missing conversation or a non-participant is a no-op and yields `None`.
    pub async fn mark_read(
        &self,
        conversation_id: ConversationId,
        user: UserId,
    ) -> AppResult<Option<Conversation>> {
        let now = self.clock.now();
        let Some((conversation, receipts)) = self
            .guard
            .call(
                "mark_conversation_read",
                self.store.mark_read(conversation_id, user, now),
            )
            .await?
        else {
            debug!(conversation_id = %conversation_id, user_id = %user, "Mark-read ignored");
            return Ok(None);
        };
        debug!(conversation_id = %conversation_id, user_id = %user, receipts, "Conversation marked read");
        Ok(Some(conversation))
    }

    /// Fetches a conversation visible to `viewer`.
    pub async fn get(&self, conversation_id: ConversationId, viewer: UserId) -> AppResult<Conversation> {
        self.guard
            .call("get_conversation", self.store.get(conversation_id))
            .await?
            .filter(|c| c.is_participant(viewer))
            .ok_or_else(|| AppError::not_found(format!("Conversation {conversation_id} not found")))
    }

    /// Lists `user`'s conversations, most recent activity first.
    pub async fn list_for_user(
        &self,
        user: UserId,
        page: PageRequest,
    ) -> AppResult<PageResponse<Conversation>> {
        self.guard
            .call("list_conversations", self.store.list_for_user(user, page))
            .await
    }

    /// Lists messages newest first. `viewer` must be a participant.
    pub async fn list_messages(
        &self,
        conversation_id: ConversationId,
        viewer: UserId,
        page: PageRequest,
    ) -> AppResult<PageResponse<Message>> {
        self.get(conversation_id, viewer).await?;
        self.guard
            .call(
                "list_messages",
                self.store.list_messages(conversation_id, page),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use memberhub_core::ErrorKind;
    use memberhub_core::traits::ManualClock;
    use memberhub_database::memory::MemoryConversationStore;

    use super::*;

    fn ledger() -> ConversationLedger {
        ConversationLedger::new(
            Arc::new(MemoryConversationStore::new()),
            StoreGuard::new(Duration::from_secs(1)),
            Arc::new(ManualClock::starting_now()),
        )
    }

    #[tokio::test]
    async fn test_find_or_create_is_symmetric() {
        let ledger = ledger();
        let a = UserId::new();
        let b = UserId::new();
        let first = ledger.find_or_create_direct(a, b).await.unwrap();
        let second = ledger.find_or_create_direct(b, a).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.unread_for(a), 0);
        assert_eq!(first.unread_for(b), 0);
    }

    #[tokio::test]
    async fn test_self_conversation_is_rejected() {
        let a = UserId::new();
        let err = ledger().find_or_create_direct(a, a).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_find_or_create_yields_one() {
        let ledger = ledger();
        let a = UserId::new();
        let b = UserId::new();
        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let ledger = ledger.clone();
                tokio::spawn(async move {
                    if i % 2 == 0 {
                        ledger.find_or_create_direct(a, b).await
                    } else {
                        ledger.find_or_create_direct(b, a).await
                    }
                })
            })
            .collect();
        let ids: Vec<ConversationId> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap().unwrap().id)
            .collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test]
    async fn test_m_appends_count_m_for_recipient() {
        let ledger = ledger();
        let a = UserId::new();
        let b = UserId::new();
        let conv = ledger.find_or_create_direct(a, b).await.unwrap();
        let mut last = conv.clone();
        for i in 0..5 {
            (_, last) = ledger
                .append_message(conv.id, a, &format!("message {i}"))
                .await
                .unwrap();
        }
        assert_eq!(last.unread_for(b), 5);
        assert_eq!(last.unread_for(a), 0);
        assert_eq!(last.last_message_preview.as_deref(), Some("message 4"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_lose_no_increments() {
        let ledger = ledger();
        let a = UserId::new();
        let b = UserId::new();
        let conv = ledger.find_or_create_direct(a, b).await.unwrap();

        let tasks: Vec<_> = (0..40)
            .map(|i| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.append_message(conv.id, a, &format!("m{i}")).await })
            })
            .collect();
        let seqs: std::collections::HashSet<i64> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap().unwrap().0.seq)
            .collect();
        assert_eq!(seqs.len(), 40);

        let current = ledger.get(conv.id, b).await.unwrap();
        assert_eq!(current.unread_for(b), 40);
        assert_eq!(current.unread_for(a), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_unread_counter_matches_unread_messages_under_interleaving() {
        let ledger = ledger();
        let a = UserId::new();
        let b = UserId::new();
        let conv = ledger.find_or_create_direct(a, b).await.unwrap();

        let sender = {
            let ledger = ledger.clone();
            tokio::spawn(async move {
                for i in 0..60 {
                    ledger.append_message(conv.id, a, &format!("m{i}")).await.unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };
        let reader = {
            let ledger = ledger.clone();
            tokio::spawn(async move {
                for _ in 0..60 {
                    ledger.mark_read(conv.id, b).await.unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };
        sender.await.unwrap();
        reader.await.unwrap();

        let current = ledger.get(conv.id, b).await.unwrap();
        let messages = ledger
            .list_messages(conv.id, b, PageRequest::new(1, 100))
            .await
            .unwrap();
        let unread = messages.items.iter().filter(|m| !m.is_read_by(b)).count();
        assert_eq!(current.unread_for(b) as usize, unread);
    }

    #[tokio::test]
    async fn test_append_order_matches_timestamps() {
        let clock = Arc::new(ManualClock::starting_now());
        let ledger = ConversationLedger::new(
            Arc::new(MemoryConversationStore::new()),
            StoreGuard::default(),
            clock.clone(),
        );
        let a = UserId::new();
        let b = UserId::new();
        let conv = ledger.find_or_create_direct(a, b).await.unwrap();

        clock.advance(chrono::Duration::seconds(10));
        let (first, _) = ledger.append_message(conv.id, a, "first").await.unwrap();
        clock.advance(chrono::Duration::seconds(-5));
        let (second, after) = ledger.append_message(conv.id, b, "second").await.unwrap();

        assert!(second.created_at >= first.created_at);
        assert_eq!(after.last_message_id, Some(second.id));
        let listed = ledger
            .list_messages(conv.id, a, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(listed.items[0].id, second.id);
    }

    #[tokio::test]
    async fn test_mark_read_then_append_counts_one() {
        let ledger = ledger();
        let a = UserId::new();
        let b = UserId::new();
        let conv = ledger.find_or_create_direct(a, b).await.unwrap();
        ledger.append_message(conv.id, a, "one").await.unwrap();
        ledger.append_message(conv.id, a, "two").await.unwrap();

        let read = ledger.mark_read(conv.id, b).await.unwrap().unwrap();
        assert_eq!(read.unread_for(b), 0);

        let (_, after) = ledger.append_message(conv.id, a, "three").await.unwrap();
        assert_eq!(after.unread_for(b), 1);

        let messages = ledger
            .list_messages(conv.id, b, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(messages.items[0].content, "three");
        assert!(!messages.items[0].is_read_by(b));
        assert!(messages.items[1].is_read_by(b));
    }

    #[tokio::test]
    async fn test_append_errors() {
        let ledger = ledger();
        let a = UserId::new();
        let b = UserId::new();
        let missing = ledger
            .append_message(ConversationId::new(), a, "hello")
            .await
            .unwrap_err();
        assert!(missing.is_not_found());

        let conv = ledger.find_or_create_direct(a, b).await.unwrap();
        let outsider = ledger
            .append_message(conv.id, UserId::new(), "hello")
            .await
            .unwrap_err();
        assert_eq!(outsider.kind, ErrorKind::Authorization);

        let empty = ledger.append_message(conv.id, a, "").await.unwrap_err();
        assert_eq!(empty.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_mark_read_is_noop_for_missing_or_outsider() {
        let ledger = ledger();
        assert!(
            ledger
                .mark_read(ConversationId::new(), UserId::new())
                .await
                .unwrap()
                .is_none()
        );
        let conv = ledger
            .find_or_create_direct(UserId::new(), UserId::new())
            .await
            .unwrap();
        assert!(ledger.mark_read(conv.id, UserId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_group_includes_creator() {
        let ledger = ledger();
        let creator = UserId::new();
        let other = UserId::new();
        let group = ledger.create_group(creator, vec![other]).await.unwrap();
        assert!(group.is_group);
        assert!(group.is_participant(creator));
        assert!(ledger.create_group(creator, vec![creator]).await.is_err());
    }

    #[tokio::test]
    async fn test_list_for_user_orders_by_activity() {
        let clock = Arc::new(ManualClock::starting_now());
        let ledger = ConversationLedger::new(
            Arc::new(MemoryConversationStore::new()),
            StoreGuard::default(),
            clock.clone(),
        );
        let me = UserId::new();
        let older = ledger.find_or_create_direct(me, UserId::new()).await.unwrap();
        let newer = ledger.find_or_create_direct(me, UserId::new()).await.unwrap();
        clock.advance(chrono::Duration::seconds(5));
        ledger.append_message(older.id, me, "bump").await.unwrap();

        let page = ledger.list_for_user(me, PageRequest::default()).await.unwrap();
        let order: Vec<ConversationId> = page.items.iter().map(|c| c.id).collect();
        assert_eq!(order, vec![older.id, newer.id]);
    }
}
