//! Notification drafts for the portal's triggering actions.

use uuid::Uuid;

use memberhub_core::types::{ConversationId, UserId};
use memberhub_entity::conversation::Message;
use memberhub_entity::conversation::model::preview;
use memberhub_entity::notification::{NewNotification, NotificationKind, NotificationReference};
use memberhub_entity::user::UserSummary;

/// Fluent builder for a [`NewNotification`].
#[derive(Debug, Clone)]
pub struct NotificationDraftBuilder {
    draft: NewNotification,
}

impl NotificationDraftBuilder {
    /// Starts a draft of `kind` for `recipient`.
    pub fn new(kind: NotificationKind, recipient: UserId) -> Self {
        Self {
            draft: NewNotification {
                recipient_id: recipient,
                sender_id: None,
                kind,
                title: String::new(),
                message: String::new(),
                reference: None,
            },
        }
    }

    /// Sets the acting member.
    pub fn sender(mut self, sender: UserId) -> Self {
        self.draft.sender_id = Some(sender);
        self
    }

    /// Sets the title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.draft.title = title.into();
        self
    }

    /// Sets the body text.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.draft.message = message.into();
        self
    }

    /// Links the notification to the thing it is about.
    pub fn reference(mut self, reference: NotificationReference) -> Self {
        self.draft.reference = Some(reference);
        self
    }

    /// Finishes the draft.
    pub fn build(self) -> NewNotification {
        self.draft
    }
}

/// Formats notification drafts for common portal events.
pub struct NotificationFormatter;

impl NotificationFormatter {
    /// A direct or group message arrived.
    pub fn direct_message(
        sender: &UserSummary,
        recipient: UserId,
        conversation_id: ConversationId,
        message: &Message,
    ) -> NewNotification {
        NotificationDraftBuilder::new(NotificationKind::Message, recipient)
            .sender(sender.user_id)
            .title(format!("New message from {}", sender.display_name))
            .message(preview(&message.content))
            .reference(NotificationReference::Conversation(conversation_id))
            .build()
    }

    /// Someone replied to a forum thread the recipient follows.
    pub fn forum_reply(
        actor: &UserSummary,
        recipient: UserId,
        thread_title: &str,
        reply_id: Uuid,
    ) -> NewNotification {
        NotificationDraftBuilder::new(NotificationKind::ForumReply, recipient)
            .sender(actor.user_id)
            .title("New reply")
            .message(format!("{} replied to '{thread_title}'", actor.display_name))
            .reference(NotificationReference::ForumReply(reply_id))
            .build()
    }

    /// The recipient was mentioned in a forum thread.
    pub fn forum_mention(
        actor: &UserSummary,
        recipient: UserId,
        thread_title: &str,
        thread_id: Uuid,
    ) -> NewNotification {
        NotificationDraftBuilder::new(NotificationKind::ForumMention, recipient)
            .sender(actor.user_id)
            .title("You were mentioned")
            .message(format!(
                "{} mentioned you in '{thread_title}'",
                actor.display_name
            ))
            .reference(NotificationReference::ForumThread(thread_id))
            .build()
    }

    /// Someone liked the recipient's post, brag or listing.
    pub fn like(
        actor: &UserSummary,
        recipient: UserId,
        what: &str,
        reference: NotificationReference,
    ) -> NewNotification {
        NotificationDraftBuilder::new(NotificationKind::Like, recipient)
            .sender(actor.user_id)
            .title("New like")
            .message(format!("{} liked your {what}", actor.display_name))
            .reference(reference)
            .build()
    }

    /// A member the recipient follows posted a brag.
    pub fn brag(
        actor: &UserSummary,
        recipient: UserId,
        headline: &str,
        brag_id: Uuid,
    ) -> NewNotification {
        NotificationDraftBuilder::new(NotificationKind::Brag, recipient)
            .sender(actor.user_id)
            .title(format!("{} posted a brag", actor.display_name))
            .message(preview(headline))
            .reference(NotificationReference::Brag(brag_id))
            .build()
    }

    /// Someone asked about equipment the recipient listed.
    pub fn equipment_inquiry(
        actor: &UserSummary,
        recipient: UserId,
        equipment_name: &str,
        equipment_id: Uuid,
    ) -> NewNotification {
        NotificationDraftBuilder::new(NotificationKind::EquipmentInquiry, recipient)
            .sender(actor.user_id)
            .title("Equipment inquiry")
            .message(format!(
                "{} asked about '{equipment_name}'",
                actor.display_name
            ))
            .reference(NotificationReference::Equipment(equipment_id))
            .build()
    }

    /// A library item the recipient follows was updated.
    pub fn library_update(recipient: UserId, item_title: &str, item_id: Uuid) -> NewNotification {
        NotificationDraftBuilder::new(NotificationKind::LibraryUpdate, recipient)
            .title("Library updated")
            .message(format!("'{item_title}' has a new version"))
            .reference(NotificationReference::LibraryItem(item_id))
            .build()
    }

    /// Operator notice without a sender.
    pub fn system(recipient: UserId, title: &str, message: &str) -> NewNotification {
        NotificationDraftBuilder::new(NotificationKind::System, recipient)
            .title(title)
            .message(message)
            .build()
    }
}
