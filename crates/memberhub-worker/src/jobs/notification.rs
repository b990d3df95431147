//! Notification retention purge.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use memberhub_core::result::AppResult;
use memberhub_service::NotificationService;

use super::ScheduledTask;

/// Deletes notifications past their read or unread retention horizon.
#[derive(Debug, Clone)]
pub struct NotificationPurgeTask {
    service: Arc<NotificationService>,
    schedule: String,
}

impl NotificationPurgeTask {
    /// Create a purge task firing on `schedule`
    pub fn new(service: Arc<NotificationService>, schedule: impl Into<String>) -> Self {
        Self {
            service,
            schedule: schedule.into(),
        }
    }
}

#[async_trait]
impl ScheduledTask for NotificationPurgeTask {
    fn name(&self) -> &'static str {
        "notification_retention_purge"
    }

    fn schedule(&self) -> &str {
        &self.schedule
    }

    async fn run(&self) -> AppResult<Value> {
        let removed = self.service.purge_expired_now().await?;
        Ok(json!({ "removed": removed }))
    }
}
