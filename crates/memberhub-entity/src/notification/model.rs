//! Notification entity model.

use chrono::{DateTime, Utc};
use memberhub_core::types::{NotificationId, UserId};
use serde::{Deserialize, Serialize};

use super::kind::NotificationKind;
use super::reference::NotificationReference;

/// A notification persisted for one recipient.
///
/// The read flag and timestamp are private: the only way to set them is
/// [`Notification::mark_read`], so `is_read` always implies `read_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Unique notification identifier.
    pub id: NotificationId,
    /// The member who receives it.
    pub recipient_id: UserId,
    /// The member whose action produced it, if any.
    pub sender_id: Option<UserId>,
    /// Triggering action.
    pub kind: NotificationKind,
    /// Short title.
    pub title: String,
    /// Body text.
    pub message: String,
    /// What the notification points at.
    pub reference: Option<NotificationReference>,
    is_read: bool,
    read_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Rebuild a stored record. Read state is derived from `read_at`.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: NotificationId,
        recipient_id: UserId,
        sender_id: Option<UserId>,
        kind: NotificationKind,
        title: String,
        message: String,
        reference: Option<NotificationReference>,
        read_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            recipient_id,
            sender_id,
            kind,
            title,
            message,
            reference,
            is_read: read_at.is_some(),
            read_at,
            created_at,
        }
    }

    /// Whether the recipient has read it.
    pub fn is_read(&self) -> bool {
        self.is_read
    }

    /// When it was read.
    pub fn read_at(&self) -> Option<DateTime<Utc>> {
        self.read_at
    }

    /// Mark as read at `at`. Returns `false` if it was already read.
    pub fn mark_read(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_read {
            return false;
        }
        self.is_read = true;
        self.read_at = Some(at);
        true
    }

    /// Whether the retention horizons have passed for this record.
    pub fn is_expired(&self, read_before: DateTime<Utc>, unread_before: DateTime<Utc>) -> bool {
        if self.is_read {
            self.created_at < read_before
        } else {
            self.created_at < unread_before
        }
    }
}

/// A notification draft, before it has an id or timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNotification {
    /// Recipient.
    pub recipient_id: UserId,
    /// Acting member, if any.
    pub sender_id: Option<UserId>,
    /// Triggering action.
    pub kind: NotificationKind,
    /// Short title.
    pub title: String,
    /// Body text.
    pub message: String,
    /// What the notification points at.
    pub reference: Option<NotificationReference>,
}

impl NewNotification {
    /// Materialize the draft as an unread record created at `now`.
    pub fn into_notification(self, now: DateTime<Utc>) -> Notification {
        Notification::restore(
            NotificationId::new(),
            self.recipient_id,
            self.sender_id,
            self.kind,
            self.title,
            self.message,
            self.reference,
            None,
            now,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> NewNotification {
        NewNotification {
            recipient_id: UserId::new(),
            sender_id: None,
            kind: NotificationKind::System,
            title: "Maintenance".into(),
            message: "Tonight at 22:00".into(),
            reference: None,
        }
    }

    #[test]
    fn test_mark_read_sets_timestamp_once() {
        let now = Utc::now();
        let mut n = draft().into_notification(now);
        assert!(!n.is_read());
        assert!(n.read_at().is_none());
        assert!(n.mark_read(now));
        assert_eq!(n.read_at(), Some(now));
        assert!(!n.mark_read(now + chrono::Duration::seconds(5)));
        assert_eq!(n.read_at(), Some(now));
    }

    #[test]
    fn test_expiry_uses_horizon_by_read_state() {
        let now = Utc::now();
        let mut n = draft().into_notification(now - chrono::Duration::days(100));
        let read_before = now - chrono::Duration::days(90);
        let unread_before = now - chrono::Duration::days(730);
        assert!(!n.is_expired(read_before, unread_before));
        n.mark_read(now);
        assert!(n.is_expired(read_before, unread_before));
    }

    #[test]
    fn test_serialized_fields() {
        let n = draft().into_notification(Utc::now());
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["is_read"], false);
        assert_eq!(json["kind"], "system");
        assert!(json["read_at"].is_null());
    }
}
