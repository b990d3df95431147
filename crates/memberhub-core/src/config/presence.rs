//! Presence tracking configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Presence registry and idle sweeper settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// Seconds without activity after which an online user becomes idle.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
    /// Seconds between eager idle sweeps.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
    /// Seconds an offline entry is retained before it is pruned from memory.
    #[serde(default = "default_offline_retention")]
    pub offline_retention_seconds: u64,
    /// Seconds without activity after which a member with no live socket
    /// (a polling-only client) goes offline.
    #[serde(default = "default_detached_timeout")]
    pub detached_timeout_seconds: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            idle_timeout_seconds: default_idle_timeout(),
            sweep_interval_seconds: default_sweep_interval(),
            offline_retention_seconds: default_offline_retention(),
            detached_timeout_seconds: default_detached_timeout(),
        }
    }
}

impl PresenceConfig {
    /// Idle timeout as a chrono duration.
    pub fn idle_timeout(&self) -> Duration {
        Duration::seconds(self.idle_timeout_seconds as i64)
    }

    /// Offline retention as a chrono duration.
    pub fn offline_retention(&self) -> Duration {
        Duration::seconds(self.offline_retention_seconds as i64)
    }

    /// Detached offline timeout as a chrono duration.
    pub fn detached_timeout(&self) -> Duration {
        Duration::seconds(self.detached_timeout_seconds as i64)
    }

    /// Six-field cron expression firing every `sweep_interval_seconds`.
    ///
    /// Intervals of a minute or more fire on the minute.
    pub fn sweep_cron(&self) -> String {
        if self.sweep_interval_seconds < 60 {
            format!("*/{} * * * * *", self.sweep_interval_seconds)
        } else {
            let minutes = (self.sweep_interval_seconds / 60).clamp(1, 59);
            format!("0 */{minutes} * * * *")
        }
    }
}

fn default_idle_timeout() -> u64 {
    180
}

fn default_sweep_interval() -> u64 {
    10
}

fn default_offline_retention() -> u64 {
    600
}

fn default_detached_timeout() -> u64 {
    600
}
