//! Notification retention horizons.

use chrono::{DateTime, Duration, Utc};

use memberhub_core::AppError;
use memberhub_core::config::NotificationConfig;

/// How long read and unread notifications are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    read: Duration,
    unread: Duration,
}

impl RetentionPolicy {
    /// Build a policy. The unread horizon may not be shorter than the read one.
    pub fn new(read: Duration, unread: Duration) -> Result<Self, AppError> {
        if read <= Duration::zero() {
            return Err(AppError::configuration("Read retention must be positive"));
        }
        if unread < read {
            return Err(AppError::configuration(
                "Unread retention must not be shorter than read retention",
            ));
        }
        Ok(Self { read, unread })
    }

    /// Build the policy from the `notifications` configuration section.
    pub fn from_config(config: &NotificationConfig) -> Result<Self, AppError> {
        Self::new(config.read_retention(), config.unread_retention())
    }

    /// Cut-off timestamps `(read_before, unread_before)` relative to `now`.
    pub fn horizons(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (now - self.read, now - self.unread)
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            read: Duration::days(90),
            unread: Duration::days(730),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_short_unread_horizon() {
        assert!(RetentionPolicy::new(Duration::days(90), Duration::days(30)).is_err());
        assert!(RetentionPolicy::new(Duration::days(90), Duration::days(90)).is_ok());
    }

    #[test]
    fn test_default_matches_config_defaults() {
        let from_config = RetentionPolicy::from_config(&NotificationConfig::default()).unwrap();
        assert_eq!(from_config, RetentionPolicy::default());
    }
}
