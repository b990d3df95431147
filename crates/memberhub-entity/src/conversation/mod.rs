//! Conversation domain entities.

pub mod direct_key;
pub mod message;
pub mod model;

pub use direct_key::DirectKey;
pub use message::{MAX_CONTENT_CHARS, Message, ReadReceipt};
pub use model::{Conversation, MAX_PREVIEW_CHARS};
