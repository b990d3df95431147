//! Store contracts consumed by the service layer.
//!
//! Implementations must make [`ConversationStore::append_message`] a single
//! atomic step: the message row, the `last_message_*` fields and every
//! other participant's unread increment land together or not at all.
//! [`ConversationStore::mark_read`] is atomic with respect to appends on
//! the same conversation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use memberhub_core::result::AppResult;
use memberhub_core::types::{ConversationId, NotificationId, PageRequest, PageResponse, UserId};
use memberhub_entity::conversation::{Conversation, DirectKey, Message};
use memberhub_entity::notification::Notification;
use memberhub_entity::user::UserSummary;

/// Persistence for conversations, their unread vectors and messages.
#[async_trait]
pub trait ConversationStore: Send + Sync + 'static {
    /// Look up the direct conversation for an unordered pair.
    async fn find_direct(&self, key: &DirectKey) -> AppResult<Option<Conversation>>;

    /// Insert a direct conversation. Fails with `Conflict` if `key` exists.
    async fn insert_direct(&self, key: &DirectKey, conversation: Conversation)
    -> AppResult<Conversation>;

    /// Insert a group conversation.
    async fn insert_group(&self, conversation: Conversation) -> AppResult<Conversation>;

    /// Fetch a conversation by id.
    async fn get(&self, id: ConversationId) -> AppResult<Option<Conversation>>;

    /// Conversations `user` participates in, most recent activity first.
    async fn list_for_user(
        &self,
        user: UserId,
        page: PageRequest,
    ) -> AppResult<PageResponse<Conversation>>;

    /// Persist `message`, assign its `seq`, and apply it to the owning
    /// conversation atomically. `created_at` is raised to the conversation's
    /// `last_message_at` when it is earlier, so commit order and timestamp
    /// order agree. Fails with `NotFound` for an unknown conversation.
    async fn append_message(&self, message: Message) -> AppResult<(Message, Conversation)>;

    /// Zero `user`'s unread counter and add `user`'s read receipts in one
    /// atomic step. Receipts cover exactly the messages appended before the
    /// reset, so a concurrent append stays both counted and unread.
    ///
    /// Returns the updated conversation and the number of receipts added,
    /// or `None` when the conversation is missing or `user` is not a
    /// participant.
    async fn mark_read(
        &self,
        id: ConversationId,
        user: UserId,
        at: DateTime<Utc>,
    ) -> AppResult<Option<(Conversation, u64)>>;

    /// Messages of a conversation, newest first by `(created_at, seq)`.
    async fn list_messages(
        &self,
        id: ConversationId,
        page: PageRequest,
    ) -> AppResult<PageResponse<Message>>;
}

/// Persistence for notifications.
#[async_trait]
pub trait NotificationStore: Send + Sync + 'static {
    /// Persist a new notification.
    async fn insert(&self, notification: Notification) -> AppResult<Notification>;

    /// Fetch a notification by id.
    async fn get(&self, id: NotificationId) -> AppResult<Option<Notification>>;

    /// A recipient's notifications, unread first, then newest first.
    async fn list_for_recipient(
        &self,
        recipient: UserId,
        page: PageRequest,
        unread_only: bool,
    ) -> AppResult<PageResponse<Notification>>;

    /// Number of unread notifications for a recipient.
    async fn count_unread(&self, recipient: UserId) -> AppResult<u64>;

    /// Mark one notification read. Returns `false` when it is missing,
    /// belongs to someone else, or was already read.
    async fn mark_read(
        &self,
        recipient: UserId,
        id: NotificationId,
        at: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Mark every unread notification of a recipient read. Returns rows changed.
    async fn mark_all_read(&self, recipient: UserId, at: DateTime<Utc>) -> AppResult<u64>;

    /// Delete read records created before `read_before` and unread records
    /// created before `unread_before`. Returns rows deleted.
    async fn purge(
        &self,
        read_before: DateTime<Utc>,
        unread_before: DateTime<Utc>,
    ) -> AppResult<u64>;
}

/// Read access to the portal's member directory.
#[async_trait]
pub trait UserDirectory: Send + Sync + 'static {
    /// Display fields for one member.
    async fn summary(&self, user: UserId) -> AppResult<Option<UserSummary>>;
}
