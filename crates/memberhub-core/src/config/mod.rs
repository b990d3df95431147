//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! `config/default.toml`, an environment overlay, and `MEMBERHUB__*`
//! environment variables. Every section carries serde defaults so the
//! server starts without any file present.

pub mod app;
pub mod auth;
pub mod database;
pub mod logging;
pub mod notification;
pub mod presence;
pub mod realtime;
pub mod worker;

use serde::{Deserialize, Serialize};

pub use self::app::{CorsConfig, ServerConfig};
pub use self::auth::AuthConfig;
pub use self::database::{DatabaseConfig, StoreBackend};
pub use self::logging::LoggingConfig;
pub use self::notification::NotificationConfig;
pub use self::presence::PresenceConfig;
pub use self::realtime::RealtimeConfig;
pub use self::worker::WorkerConfig;

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Durable store settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Credential verification settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Real-time WebSocket settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Presence tracking settings.
    #[serde(default)]
    pub presence: PresenceConfig,
    /// Notification retention settings.
    #[serde(default)]
    pub notifications: NotificationConfig,
    /// Background scheduler settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files and the environment.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `MEMBERHUB__`, then validates
    /// the result.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("MEMBERHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject inconsistent values that would otherwise fail at runtime.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.presence.idle_timeout_seconds == 0 {
            return Err(AppError::configuration(
                "presence.idle_timeout_seconds must be greater than zero",
            ));
        }
        if self.presence.detached_timeout_seconds < self.presence.idle_timeout_seconds {
            return Err(AppError::configuration(
                "presence.detached_timeout_seconds must not be shorter than presence.idle_timeout_seconds",
            ));
        }
        if self.presence.sweep_interval_seconds == 0 {
            return Err(AppError::configuration(
                "presence.sweep_interval_seconds must be greater than zero",
            ));
        }
        if self.database.store_timeout_ms == 0 {
            return Err(AppError::configuration(
                "database.store_timeout_ms must be greater than zero",
            ));
        }
        if self.notifications.read_retention_days == 0 {
            return Err(AppError::configuration(
                "notifications.read_retention_days must be greater than zero",
            ));
        }
        if self.notifications.unread_retention_days < self.notifications.read_retention_days {
            return Err(AppError::configuration(format!(
                "notifications.unread_retention_days ({}) is shorter than read_retention_days ({})",
                self.notifications.unread_retention_days, self.notifications.read_retention_days
            )));
        }
        if self.realtime.max_connections_per_user == 0 || self.realtime.channel_buffer_size == 0 {
            return Err(AppError::configuration(
                "realtime connection limits must be greater than zero",
            ));
        }
        Ok(())
    }
}
