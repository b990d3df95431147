//! Glue between the conversation ledger and real-time delivery.

pub mod chat;

pub use chat::{MessagePush, MessagingBridge, SentMessage};
