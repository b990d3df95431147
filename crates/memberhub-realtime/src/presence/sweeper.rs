//! Eager idle sweep, run on a schedule by the worker.

use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use tracing::debug;

use super::registry::PresenceRegistry;
use crate::connection::gateway::ConnectionGateway;

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Entries whose status decayed: online to idle, or detached to offline.
    pub idled: usize,
    /// Offline entries dropped from memory.
    pub pruned: usize,
}

/// Flips stale entries to idle and broadcasts each transition.
#[derive(Debug, Clone)]
pub struct IdleSweeper {
    presence: Arc<PresenceRegistry>,
    gateway: Arc<ConnectionGateway>,
    offline_retention: Duration,
}

impl IdleSweeper {
    /// Creates a sweeper over `presence` that announces through `gateway`.
    pub fn new(
        presence: Arc<PresenceRegistry>,
        gateway: Arc<ConnectionGateway>,
        offline_retention: Duration,
    ) -> Self {
        Self {
            presence,
            gateway,
            offline_retention,
        }
    }

    /// One pass: sweep, broadcast, prune. Never fails; broadcast errors
    /// are logged by the gateway.
    pub fn run_once(&self) -> SweepReport {
        let mut changes = Vec::new();
        let idled = self.presence.sweep_idle(|change| changes.push(change));
        for change in changes {
            self.gateway.broadcast_presence(change);
        }

        let pruned = self.presence.prune_offline(self.offline_retention);
        if pruned > 0 {
            debug!(pruned, "Pruned offline presence entries");
        }
        SweepReport { idled, pruned }
    }
}
