//! Cron scheduler for periodic tasks.

use std::sync::Arc;
use std::time::Instant;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use memberhub_core::AppError;
use memberhub_core::config::AppConfig;
use memberhub_realtime::RealtimeEngine;

use crate::jobs::{NotificationPurgeTask, PresenceSweepTask, ScheduledTask};

/// Cron-based scheduler for periodic background tasks
pub struct CronScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Names of registered tasks, in registration order
    registered: Vec<&'static str>,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler")
            .field("registered", &self.registered)
            .finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler
    pub async fn new() -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self {
            scheduler,
            registered: Vec::new(),
        })
    }

    /// Register the idle sweep and the retention purge
    pub async fn register_default_tasks(
        &mut self,
        engine: &RealtimeEngine,
        config: &AppConfig,
    ) -> Result<(), AppError> {
        self.register(Arc::new(PresenceSweepTask::new(
            engine.sweeper.clone(),
            config.presence.sweep_cron(),
        )))
        .await?;
        self.register(Arc::new(NotificationPurgeTask::new(
            engine.notifications.clone(),
            config.notifications.purge_cron.clone(),
        )))
        .await?;

        tracing::info!(tasks = ?self.registered, "All scheduled tasks registered");
        Ok(())
    }

    /// Register one task on its own schedule
    pub async fn register(&mut self, task: Arc<dyn ScheduledTask>) -> Result<(), AppError> {
        let name = task.name();
        let schedule = task.schedule().to_string();
        let job_task = Arc::clone(&task);
        let job = CronJob::new_async(schedule.as_str(), move |_uuid, _lock| {
            let task = Arc::clone(&job_task);
            Box::pin(async move {
                run_task(task.as_ref()).await;
            })
        })
        .map_err(|e| AppError::configuration(format!("Invalid schedule for {name}: {}", e)))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add {name} schedule: {}", e)))?;

        self.registered.push(name);
        tracing::info!(task = name, schedule = %schedule, "Registered scheduled task");
        Ok(())
    }

    /// Names of registered tasks
    pub fn registered(&self) -> &[&'static str] {
        &self.registered
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {}", e)))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&self) -> Result<(), AppError> {
        let mut scheduler = self.scheduler.clone();
        scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {}", e)))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }
}

/// Runs one pass of `task`, logging the outcome. Failures never escape, so
/// a bad pass cannot stop the schedule. Returns whether the pass succeeded.
pub async fn run_task(task: &dyn ScheduledTask) -> bool {
    let started = Instant::now();
    match task.run().await {
        Ok(summary) => {
            tracing::debug!(
                task = task.name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                summary = %summary,
                "Scheduled task completed"
            );
            true
        }
        Err(e) => {
            tracing::error!(
                task = task.name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                error = %e,
                "Scheduled task failed"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Duration;
    use memberhub_core::result::AppResult;
    use memberhub_core::traits::ManualClock;
    use memberhub_core::types::UserId;
    use memberhub_database::Stores;
    use memberhub_entity::notification::{NewNotification, NotificationKind};
    use memberhub_realtime::JwtVerifier;
    use serde_json::Value;

    use super::*;

    struct Broken;

    #[async_trait]
    impl ScheduledTask for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn schedule(&self) -> &str {
            "not a cron expression"
        }

        async fn run(&self) -> AppResult<Value> {
            Err(AppError::transient_store("store timed out"))
        }
    }

    fn engine(clock: Arc<ManualClock>) -> RealtimeEngine {
        RealtimeEngine::new(
            &AppConfig::default(),
            &Stores::memory(),
            clock,
            Arc::new(JwtVerifier::new("worker-secret", 0)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_failed_pass_is_contained() {
        assert!(!run_task(&Broken).await);
    }

    #[tokio::test]
    async fn test_invalid_schedule_is_rejected() {
        let mut scheduler = CronScheduler::new().await.unwrap();
        let err = scheduler.register(Arc::new(Broken)).await.unwrap_err();
        assert_eq!(err.kind, memberhub_core::ErrorKind::Configuration);
        assert!(scheduler.registered().is_empty());
    }

    #[tokio::test]
    async fn test_default_tasks_register() {
        let engine = engine(Arc::new(ManualClock::starting_now()));
        let mut scheduler = CronScheduler::new().await.unwrap();
        scheduler
            .register_default_tasks(&engine, &AppConfig::default())
            .await
            .unwrap();
        assert_eq!(
            scheduler.registered(),
            ["presence_idle_sweep", "notification_retention_purge"]
        );
    }

    #[tokio::test]
    async fn test_sweep_task_reports_idled_members() {
        let clock = Arc::new(ManualClock::starting_now());
        let engine = engine(clock.clone());
        engine.presence.heartbeat(UserId::new(), None);
        clock.advance(Duration::seconds(181));

        let task = PresenceSweepTask::new(engine.sweeper.clone(), "*/10 * * * * *");
        let summary = task.run().await.unwrap();
        assert_eq!(summary["idled"], 1);
    }

    #[tokio::test]
    async fn test_purge_task_removes_expired_records() {
        let clock = Arc::new(ManualClock::starting_now());
        let engine = engine(clock.clone());
        let recipient = UserId::new();
        let stored = engine
            .notifications
            .create(NewNotification {
                recipient_id: recipient,
                sender_id: None,
                kind: NotificationKind::System,
                title: "Maintenance".into(),
                message: "Tonight".into(),
                reference: None,
            })
            .await
            .unwrap();
        engine.notifications.mark_read(recipient, stored.id).await.unwrap();

        let task = NotificationPurgeTask::new(engine.notifications.clone(), "0 30 3 * * *");
        assert_eq!(task.run().await.unwrap()["removed"], 0);
        clock.advance(Duration::days(91));
        assert!(run_task(&task).await);
        assert_eq!(engine.notifications.list(recipient, Default::default(), false).await.unwrap().total_items, 0);
    }
}
