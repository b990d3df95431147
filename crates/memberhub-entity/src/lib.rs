//! # memberhub-entity
//!
//! Domain records for the MemberHub real-time core. Conversations carry
//! their own unread vector, messages are append-only, and notifications
//! can only become read through [`notification::Notification::mark_read`].
//! Presence values live here so the gateway, API and worker agree on them.

pub mod conversation;
pub mod notification;
pub mod presence;
pub mod user;
