//! Presence snapshot and transition value objects.

use chrono::{DateTime, Utc};
use memberhub_core::types::UserId;
use serde::{Deserialize, Serialize};

use super::PresenceStatus;

/// The presence of one member as seen by a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceSnapshot {
    /// Member.
    pub user_id: UserId,
    /// Reconciled status.
    pub status: PresenceStatus,
    /// Last heartbeat or activity ping; `None` for never-seen members.
    pub last_activity: Option<DateTime<Utc>>,
}

impl PresenceSnapshot {
    /// Snapshot for a member the registry has never seen.
    pub fn unseen(user_id: UserId) -> Self {
        Self {
            user_id,
            status: PresenceStatus::Offline,
            last_activity: None,
        }
    }
}

/// A visible status transition, broadcast as `presence:update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceChange {
    /// Member whose status changed.
    pub user_id: UserId,
    /// Status before the transition.
    pub previous: PresenceStatus,
    /// Status after the transition.
    pub status: PresenceStatus,
    /// When the transition was applied.
    pub at: DateTime<Utc>,
}
