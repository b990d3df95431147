//! Notification domain entities.

pub mod kind;
pub mod model;
pub mod reference;

pub use kind::NotificationKind;
pub use model::{NewNotification, Notification};
pub use reference::{NotificationReference, ReferenceKind};
