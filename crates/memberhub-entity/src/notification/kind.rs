//! Notification kind enumeration.

use serde::{Deserialize, Serialize};

/// The portal action that produced a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// New chat message.
    Message,
    /// Reply to one of the member's forum threads.
    ForumReply,
    /// The member was mentioned in a forum post.
    ForumMention,
    /// Someone liked the member's content.
    Like,
    /// A brag (achievement post) involving the member.
    Brag,
    /// Inquiry about equipment the member listed.
    EquipmentInquiry,
    /// New or changed item in the member library.
    LibraryUpdate,
    /// Administrative or system notice.
    System,
}

impl NotificationKind {
    /// Return the kind as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::ForumReply => "forum_reply",
            Self::ForumMention => "forum_mention",
            Self::Like => "like",
            Self::Brag => "brag",
            Self::EquipmentInquiry => "equipment_inquiry",
            Self::LibraryUpdate => "library_update",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = memberhub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message" => Ok(Self::Message),
            "forum_reply" => Ok(Self::ForumReply),
            "forum_mention" => Ok(Self::ForumMention),
            "like" => Ok(Self::Like),
            "brag" => Ok(Self::Brag),
            "equipment_inquiry" => Ok(Self::EquipmentInquiry),
            "library_update" => Ok(Self::LibraryUpdate),
            "system" => Ok(Self::System),
            _ => Err(memberhub_core::AppError::validation(format!(
                "Invalid notification kind: '{s}'"
            ))),
        }
    }
}
