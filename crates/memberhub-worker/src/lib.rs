//! Scheduled background tasks for MemberHub.
//!
//! This crate provides:
//! - A cron scheduler that runs [`ScheduledTask`]s and logs their outcome
//! - The eager presence idle sweep
//! - The notification retention purge

pub mod jobs;
pub mod scheduler;

pub use jobs::ScheduledTask;
pub use scheduler::CronScheduler;
