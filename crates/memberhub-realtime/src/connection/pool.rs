//! Connection pool — tracks all active connections, indexed by member once bound.

use std::sync::Arc;

use dashmap::DashMap;

use memberhub_core::types::{ConnectionId, UserId};

use super::handle::ConnectionHandle;

/// Thread-safe pool of all active WebSocket connections.
#[derive(Debug, Default)]
pub struct ConnectionPool {
    /// Member → bound connections, oldest first.
    by_user: DashMap<UserId, Vec<Arc<ConnectionHandle>>>,
    /// Connection ID → connection handle, bound or not.
    by_id: DashMap<ConnectionId, Arc<ConnectionHandle>>,
}

impl ConnectionPool {
    /// Creates a new empty connection pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to the pool.
    pub fn add(&self, handle: Arc<ConnectionHandle>) {
        self.by_id.insert(handle.id, handle);
    }

    /// Indexes a bound connection under `user`, keeping at most `cap`
    /// connections for that member. Returns the evicted (oldest) handles.
    pub fn attach_user(
        &self,
        user: UserId,
        handle: Arc<ConnectionHandle>,
        cap: usize,
    ) -> Vec<Arc<ConnectionHandle>> {
        let mut connections = self.by_user.entry(user).or_default();
        if connections.iter().any(|c| c.id == handle.id) {
            return Vec::new();
        }
        connections.push(handle);
        let excess = connections.len().saturating_sub(cap.max(1));
        let evicted: Vec<_> = connections.drain(..excess).collect();
        drop(connections);

        for old in &evicted {
            self.by_id.remove(&old.id);
        }
        evicted
    }

    /// Removes a connection from the pool.
    pub fn remove(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        let (_, handle) = self.by_id.remove(conn_id)?;
        if let Some(user) = handle.user_id() {
            if let Some(mut connections) = self.by_user.get_mut(&user) {
                connections.retain(|c| c.id != *conn_id);
            }
            self.by_user.remove_if(&user, |_, connections| connections.is_empty());
        }
        Some(handle)
    }

    /// Gets all connections for a member.
    pub fn user_connections(&self, user: &UserId) -> Vec<Arc<ConnectionHandle>> {
        self.by_user
            .get(user)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Gets a specific connection by ID.
    pub fn get(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.by_id.get(conn_id).map(|entry| entry.value().clone())
    }

    /// Returns total number of active connections.
    pub fn connection_count(&self) -> usize {
        self.by_id.len()
    }

    /// Returns number of unique connected members.
    pub fn user_count(&self) -> usize {
        self.by_user.len()
    }

    /// Returns all connection handles.
    pub fn all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.by_id
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}
