//! # memberhub-realtime
//!
//! Real-time engine for the MemberHub portal. Provides:
//!
//! - Presence tracking (online/idle/offline) with lazy and eager idle
//!   reconciliation sharing one pure transition function
//! - WebSocket connection gateway with JWT authentication and typed rooms
//! - Best-effort event emission to `user:`, `presence:` and
//!   `conversation:` rooms
//! - Two-phase notification fan-out: durable write, then push
//! - The messaging bridge tying the conversation ledger to pushes and
//!   notifications

pub mod bridge;
pub mod connection;
pub mod message;
pub mod notification;
pub mod presence;
pub mod room;
pub mod server;

pub use bridge::chat::MessagingBridge;
pub use connection::authenticator::{CredentialVerifier, JwtVerifier};
pub use connection::gateway::ConnectionGateway;
pub use notification::dispatcher::NotificationDispatcher;
pub use notification::formatter::NotificationFormatter;
pub use presence::registry::PresenceRegistry;
pub use presence::sweeper::IdleSweeper;
pub use room::types::RoomName;
pub use server::RealtimeEngine;
