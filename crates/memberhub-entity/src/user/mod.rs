//! User-facing projections of portal members.

pub mod summary;

pub use summary::UserSummary;
