//! In-memory store backend.
//!
//! Each conversation lives in one [`dashmap::DashMap`] entry together with
//! its messages, so the append step runs entirely under that entry's shard
//! lock. Data does not survive a restart.

pub mod conversation;
pub mod directory;
pub mod notification;

pub use conversation::MemoryConversationStore;
pub use directory::MemoryUserDirectory;
pub use notification::MemoryNotificationStore;
