//! In-memory [`UserDirectory`].

use async_trait::async_trait;
use dashmap::DashMap;

use memberhub_core::result::AppResult;
use memberhub_core::types::UserId;
use memberhub_entity::user::UserSummary;

use crate::traits::UserDirectory;

/// Member directory held in a concurrent map, seeded by the host.
#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    users: DashMap<UserId, UserSummary>,
}

impl MemoryUserDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a member's display fields.
    pub fn upsert(&self, summary: UserSummary) {
        self.users.insert(summary.user_id, summary);
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn summary(&self, user: UserId) -> AppResult<Option<UserSummary>> {
        Ok(self.users.get(&user).map(|r| r.value().clone()))
    }
}
