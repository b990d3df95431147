//! # memberhub-database
//!
//! Durable-store contracts for the conversation ledger, notifications and
//! the member directory, with two backends: process-local [`memory`] maps
//! and [`postgres`] through sqlx. [`Stores`] bundles one backend's
//! implementations behind trait objects.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod postgres;
pub mod stores;
pub mod traits;

pub use connection::DatabasePool;
pub use stores::Stores;
pub use traits::{ConversationStore, NotificationStore, UserDirectory};
