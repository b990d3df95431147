//! Scheduled task implementations.

pub mod notification;
pub mod presence;

use async_trait::async_trait;
use serde_json::Value;

use memberhub_core::result::AppResult;

pub use notification::NotificationPurgeTask;
pub use presence::PresenceSweepTask;

/// A unit of periodic work.
#[async_trait]
pub trait ScheduledTask: Send + Sync + 'static {
    /// Stable task name used in logs.
    fn name(&self) -> &'static str;

    /// Six-field cron expression (seconds first).
    fn schedule(&self) -> &str;

    /// Runs one pass. The returned value is logged as the task summary.
    async fn run(&self) -> AppResult<Value>;
}
