//! PostgreSQL [`UserDirectory`] over the `user_profiles` table.

use async_trait::async_trait;
use sqlx::PgPool;

use memberhub_core::result::AppResult;
use memberhub_core::types::UserId;
use memberhub_entity::user::UserSummary;

use super::error::map_sqlx;
use crate::traits::UserDirectory;

/// Member directory backed by `user_profiles`.
#[derive(Debug, Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    /// Create a directory over `pool`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn summary(&self, user: UserId) -> AppResult<Option<UserSummary>> {
        sqlx::query_as::<_, UserSummary>(
            "SELECT user_id, display_name, avatar_url FROM user_profiles WHERE user_id = $1",
        )
        .bind(user)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx("Failed to load user profile"))
    }
}
