//! The idle transition rule shared by lazy queries and the eager sweep.

use chrono::{DateTime, Duration, Utc};

use memberhub_entity::presence::PresenceStatus;

/// Returns the status a user should have at `now`.
///
/// Only `Online` decays: it becomes `Idle` once `last_activity` is older
/// than `idle_timeout`. `Idle` and `Offline` are left as they are; only a
/// heartbeat or a disconnect moves them.
pub fn reconcile(
    status: PresenceStatus,
    last_activity: DateTime<Utc>,
    now: DateTime<Utc>,
    idle_timeout: Duration,
) -> PresenceStatus {
    match status {
        PresenceStatus::Online if now - last_activity > idle_timeout => PresenceStatus::Idle,
        other => other,
    }
}

/// Applies the second horizon for members with no live connection.
///
/// A polling-only member never disconnects, so after `detached_timeout`
/// without activity an `online` or `idle` status becomes `Offline`.
pub fn reconcile_detached(
    status: PresenceStatus,
    last_activity: DateTime<Utc>,
    now: DateTime<Utc>,
    idle_timeout: Duration,
    detached_timeout: Duration,
) -> PresenceStatus {
    match reconcile(status, last_activity, now, idle_timeout) {
        PresenceStatus::Online | PresenceStatus::Idle if now - last_activity > detached_timeout => {
            PresenceStatus::Offline
        }
        other => other,
    }
}
