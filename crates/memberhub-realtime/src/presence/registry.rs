//! In-memory presence registry.
//!
//! One entry per member, keyed in a sharded [`DashMap`]. Every
//! read-modify-write of a member's entry runs under that entry's shard
//! lock, so transitions for one member are linearizable while different
//! members never contend. Callers broadcast the returned
//! [`PresenceChange`]s; the registry itself never performs I/O.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::debug;

use memberhub_core::traits::Clock;
use memberhub_core::types::{ConnectionId, UserId};
use memberhub_entity::presence::{PresenceChange, PresenceSnapshot, PresenceStatus};

use super::idle::{reconcile, reconcile_detached};

/// Stored state for one member.
#[derive(Debug, Clone)]
struct PresenceEntry {
    status: PresenceStatus,
    last_activity: DateTime<Utc>,
    connections: HashSet<ConnectionId>,
}

impl PresenceEntry {
    fn snapshot(&self, user_id: UserId) -> PresenceSnapshot {
        PresenceSnapshot {
            user_id,
            status: self.status,
            last_activity: Some(self.last_activity),
        }
    }
}

/// Tracks online/idle/offline status for every member seen since startup.
pub struct PresenceRegistry {
    entries: DashMap<UserId, PresenceEntry>,
    clock: Arc<dyn Clock>,
    idle_timeout: Duration,
    detached_timeout: Option<Duration>,
}

impl std::fmt::Debug for PresenceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceRegistry")
            .field("tracked", &self.entries.len())
            .field("idle_timeout", &self.idle_timeout)
            .field("detached_timeout", &self.detached_timeout)
            .finish()
    }
}

impl PresenceRegistry {
    /// Creates an empty registry.
    pub fn new(clock: Arc<dyn Clock>, idle_timeout: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            idle_timeout,
            detached_timeout: None,
        }
    }

    /// Sends members without any live connection `offline` once their last
    /// activity is older than `timeout`.
    pub fn with_detached_timeout(mut self, timeout: Duration) -> Self {
        self.detached_timeout = Some(timeout);
        self
    }

    /// The configured idle timeout.
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Records a heartbeat: the member becomes `online` as of now.
    ///
    /// When `connection` is given it joins the member's connection set.
    /// Returns the transition if the visible status changed.
    pub fn heartbeat(&self, user: UserId, connection: Option<ConnectionId>) -> Option<PresenceChange> {
        let now = self.clock.now();
        let mut entry = self.entries.entry(user).or_insert_with(|| PresenceEntry {
            status: PresenceStatus::Offline,
            last_activity: now,
            connections: HashSet::new(),
        });

        let previous = self.visible_status(&entry, now);
        entry.status = PresenceStatus::Online;
        entry.last_activity = now;
        if let Some(conn) = connection {
            entry.connections.insert(conn);
        }

        (previous != PresenceStatus::Online).then_some(PresenceChange {
            user_id: user,
            previous,
            status: PresenceStatus::Online,
            at: now,
        })
    }

    /// Activity ping from an authenticated connection.
    pub fn touch(&self, user: UserId) -> Option<PresenceChange> {
        self.heartbeat(user, None)
    }

    /// Removes one connection. The member goes `offline` only when no
    /// connection remains; `last_activity` is kept.
    pub fn disconnect(&self, user: UserId, connection: ConnectionId) -> Option<PresenceChange> {
        let now = self.clock.now();
        let mut entry = self.entries.get_mut(&user)?;
        if !entry.connections.remove(&connection) || !entry.connections.is_empty() {
            return None;
        }
        Self::go_offline(user, &mut entry, now, self.idle_timeout)
    }

    /// Forces the member `offline` and forgets all of their connections.
    pub fn disconnect_user(&self, user: UserId) -> Option<PresenceChange> {
        let now = self.clock.now();
        let mut entry = self.entries.get_mut(&user)?;
        entry.connections.clear();
        Self::go_offline(user, &mut entry, now, self.idle_timeout)
    }

    fn go_offline(
        user: UserId,
        entry: &mut PresenceEntry,
        now: DateTime<Utc>,
        idle_timeout: Duration,
    ) -> Option<PresenceChange> {
        let previous = reconcile(entry.status, entry.last_activity, now, idle_timeout);
        entry.status = PresenceStatus::Offline;
        (previous != PresenceStatus::Offline).then_some(PresenceChange {
            user_id: user,
            previous,
            status: PresenceStatus::Offline,
            at: now,
        })
    }

    /// Current presence of `user`. A stale `online` entry is returned and
    /// stored as `idle`; never-seen members are `offline`.
    pub fn query(&self, user: UserId) -> PresenceSnapshot {
        self.query_reconciled(user).0
    }

    /// Like [`query`](Self::query), also reporting whether this call
    /// performed the idle transition.
    pub fn query_reconciled(&self, user: UserId) -> (PresenceSnapshot, Option<PresenceChange>) {
        let now = self.clock.now();
        match self.entries.get_mut(&user) {
            Some(mut entry) => {
                let change = self.apply_idle(user, &mut entry, now);
                (entry.snapshot(user), change)
            }
            None => (PresenceSnapshot::unseen(user), None),
        }
    }

    /// Status of several members at once.
    pub fn bulk_query(&self, users: &[UserId]) -> HashMap<UserId, PresenceStatus> {
        self.bulk_query_reconciled(users).0
    }

    /// Bulk query that also returns the transitions it performed.
    pub fn bulk_query_reconciled(
        &self,
        users: &[UserId],
    ) -> (HashMap<UserId, PresenceStatus>, Vec<PresenceChange>) {
        let mut statuses = HashMap::with_capacity(users.len());
        let mut changes = Vec::new();
        for &user in users {
            let (snapshot, change) = self.query_reconciled(user);
            statuses.insert(user, snapshot.status);
            changes.extend(change);
        }
        (statuses, changes)
    }

    /// Flips every stale `online` entry to `idle`, and stale entries
    /// without connections to `offline` when a detached timeout is set.
    ///
    /// `on_transition` runs once per transition after all entry locks
    /// have been released, so it may call back into the registry.
    pub fn sweep_idle<F>(&self, mut on_transition: F) -> usize
    where
        F: FnMut(PresenceChange),
    {
        let now = self.clock.now();
        let mut changes = Vec::new();
        for mut entry in self.entries.iter_mut() {
            let user = *entry.key();
            if let Some(change) = self.apply_idle(user, entry.value_mut(), now) {
                changes.push(change);
            }
        }

        let count = changes.len();
        for change in changes {
            on_transition(change);
        }
        if count > 0 {
            debug!(transitions = count, "Idle sweep applied");
        }
        count
    }

    /// Drops `offline` entries with no connections whose last activity is
    /// older than `older_than`. Queries for them fall back to the
    /// never-seen default, which is also `offline`.
    pub fn prune_offline(&self, older_than: Duration) -> usize {
        let cutoff = self.clock.now() - older_than;
        let before = self.entries.len();
        self.entries.retain(|_, entry| {
            !(entry.status == PresenceStatus::Offline
                && entry.connections.is_empty()
                && entry.last_activity < cutoff)
        });
        before.saturating_sub(self.entries.len())
    }

    /// Connections currently recorded for `user`.
    pub fn connection_count(&self, user: UserId) -> usize {
        self.entries
            .get(&user)
            .map(|entry| entry.connections.len())
            .unwrap_or(0)
    }

    /// Number of members with an entry.
    pub fn tracked_count(&self) -> usize {
        self.entries.len()
    }

    fn visible_status(&self, entry: &PresenceEntry, now: DateTime<Utc>) -> PresenceStatus {
        match self.detached_timeout {
            Some(detached) if entry.connections.is_empty() => reconcile_detached(
                entry.status,
                entry.last_activity,
                now,
                self.idle_timeout,
                detached,
            ),
            _ => reconcile(entry.status, entry.last_activity, now, self.idle_timeout),
        }
    }

    fn apply_idle(
        &self,
        user: UserId,
        entry: &mut PresenceEntry,
        now: DateTime<Utc>,
    ) -> Option<PresenceChange> {
        let next = self.visible_status(entry, now);
        if next == entry.status {
            return None;
        }
        let previous = entry.status;
        entry.status = next;
        Some(PresenceChange {
            user_id: user,
            previous,
            status: next,
            at: now,
        })
    }
}
