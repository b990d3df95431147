//! Display information for a member, owned by the portal's user directory.

use memberhub_core::types::UserId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Sender display fields attached to pushed notifications and messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserSummary {
    /// The member.
    pub user_id: UserId,
    /// Name shown in the UI.
    pub display_name: String,
    /// Avatar image URL, if the member uploaded one.
    pub avatar_url: Option<String>,
}

impl UserSummary {
    /// Placeholder used when the directory has no record for a user.
    pub fn unknown(user_id: UserId) -> Self {
        Self {
            user_id,
            display_name: "Unknown member".to_string(),
            avatar_url: None,
        }
    }
}
