//! # memberhub-service
//!
//! Persistence-side services for MemberHub. The [`ConversationLedger`]
//! owns conversations, messages and unread vectors; the
//! [`NotificationService`] owns notification records and their retention.
//! Neither pushes anything to clients: the realtime crate calls these
//! first and emits afterwards.
//!
//! Services follow constructor injection: stores, clock and timeouts are
//! provided at construction time via `Arc` references.

pub mod context;
pub mod conversation;
pub mod notification;
pub mod timeout;

pub use context::RequestContext;
pub use conversation::ConversationLedger;
pub use notification::{
    NotificationService, ReferenceFetcher, ReferenceResolver, ResolvedReference, RetentionPolicy,
};
pub use timeout::StoreGuard;
