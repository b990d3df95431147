//! Backend selection.

use std::sync::Arc;

use tracing::info;

use memberhub_core::config::{DatabaseConfig, StoreBackend};
use memberhub_core::result::AppResult;

use crate::connection::DatabasePool;
use crate::memory::{MemoryConversationStore, MemoryNotificationStore, MemoryUserDirectory};
use crate::migration::run_migrations;
use crate::postgres::{PgConversationStore, PgNotificationStore, PgUserDirectory};
use crate::traits::{ConversationStore, NotificationStore, UserDirectory};

/// One backend's store implementations, shared by `Arc`.
#[derive(Clone)]
pub struct Stores {
    /// Conversation ledger persistence.
    pub conversations: Arc<dyn ConversationStore>,
    /// Notification persistence.
    pub notifications: Arc<dyn NotificationStore>,
    /// Member display fields.
    pub directory: Arc<dyn UserDirectory>,
    /// The PostgreSQL pool, when that backend is active.
    pub pool: Option<DatabasePool>,
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores")
            .field("postgres", &self.pool.is_some())
            .finish()
    }
}

impl Stores {
    /// Fresh in-memory stores with an empty directory.
    pub fn memory() -> Self {
        Self::memory_with_directory(Arc::new(MemoryUserDirectory::new()))
    }

    /// In-memory stores over a caller-seeded directory.
    pub fn memory_with_directory(directory: Arc<MemoryUserDirectory>) -> Self {
        Self {
            conversations: Arc::new(MemoryConversationStore::new()),
            notifications: Arc::new(MemoryNotificationStore::new()),
            directory,
            pool: None,
        }
    }

    /// Build the backend named by `config.backend`.
    pub async fn from_config(config: &DatabaseConfig) -> AppResult<Self> {
        match config.backend {
            StoreBackend::Memory => {
                info!("Using in-memory stores; data will not survive a restart");
                Ok(Self::memory())
            }
            StoreBackend::Postgres => {
                let db = DatabasePool::connect(config).await?;
                if config.run_migrations {
                    run_migrations(db.pool()).await?;
                }
                let pool = db.pool().clone();
                Ok(Self {
                    conversations: Arc::new(PgConversationStore::new(pool.clone())),
                    notifications: Arc::new(PgNotificationStore::new(pool.clone())),
                    directory: Arc::new(PgUserDirectory::new(pool)),
                    pool: Some(db),
                })
            }
        }
    }

    /// Close the pool, if any.
    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
