//! Notification retention configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Notification storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Days a read notification is kept.
    #[serde(default = "default_read_retention")]
    pub read_retention_days: u32,
    /// Days an unread notification is kept. Must not be shorter than the read horizon.
    #[serde(default = "default_unread_retention")]
    pub unread_retention_days: u32,
    /// Cron expression for the retention purge.
    #[serde(default = "default_purge_cron")]
    pub purge_cron: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            read_retention_days: default_read_retention(),
            unread_retention_days: default_unread_retention(),
            purge_cron: default_purge_cron(),
        }
    }
}

impl NotificationConfig {
    /// Read horizon as a chrono duration.
    pub fn read_retention(&self) -> Duration {
        Duration::days(i64::from(self.read_retention_days))
    }

    /// Unread horizon as a chrono duration.
    pub fn unread_retention(&self) -> Duration {
        Duration::days(i64::from(self.unread_retention_days))
    }
}

fn default_read_retention() -> u32 {
    90
}

fn default_unread_retention() -> u32 {
    730
}

fn default_purge_cron() -> String {
    "0 30 3 * * *".to_string()
}
