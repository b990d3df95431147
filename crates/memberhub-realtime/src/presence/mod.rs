//! Presence tracking: heartbeats, connection sets, idle reconciliation.

pub mod idle;
pub mod registry;
pub mod sweeper;

pub use idle::reconcile;
pub use registry::PresenceRegistry;
pub use sweeper::{IdleSweeper, SweepReport};
