//! Notification fan-out: durable write first, then push.

pub mod dispatcher;
pub mod formatter;

pub use dispatcher::{NotificationDispatcher, NotificationPayload};
pub use formatter::{NotificationDraftBuilder, NotificationFormatter};
