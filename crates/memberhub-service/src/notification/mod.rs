//! Notification persistence, retention and reference resolution.

pub mod reference;
pub mod retention;
pub mod service;

pub use reference::{PathTemplateFetcher, ReferenceFetcher, ReferenceResolver, ResolvedReference};
pub use retention::RetentionPolicy;
pub use service::NotificationService;
