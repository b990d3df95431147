//! Presence idle sweep — flips stale online members to idle.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use memberhub_core::result::AppResult;
use memberhub_realtime::IdleSweeper;

use super::ScheduledTask;

/// Runs [`IdleSweeper::run_once`] on a schedule.
#[derive(Debug, Clone)]
pub struct PresenceSweepTask {
    sweeper: Arc<IdleSweeper>,
    schedule: String,
}

impl PresenceSweepTask {
    /// Create a sweep task firing on `schedule`
    pub fn new(sweeper: Arc<IdleSweeper>, schedule: impl Into<String>) -> Self {
        Self {
            sweeper,
            schedule: schedule.into(),
        }
    }
}

#[async_trait]
impl ScheduledTask for PresenceSweepTask {
    fn name(&self) -> &'static str {
        "presence_idle_sweep"
    }

    fn schedule(&self) -> &str {
        &self.schedule
    }

    async fn run(&self) -> AppResult<Value> {
        let report = self.sweeper.run_once();
        Ok(serde_json::to_value(report)?)
    }
}
