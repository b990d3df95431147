//! PostgreSQL store backend.
//!
//! Queries are built at runtime with `sqlx::query` and mapped by hand, so
//! the workspace compiles without a live database.

pub mod conversation;
pub mod directory;
pub mod error;
pub mod notification;

pub use conversation::PgConversationStore;
pub use directory::PgUserDirectory;
pub use notification::PgNotificationStore;
