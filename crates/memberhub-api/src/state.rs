//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use memberhub_core::config::AppConfig;
use memberhub_database::Stores;
use memberhub_realtime::{CredentialVerifier, RealtimeEngine};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Store backend (for health checks)
    pub stores: Stores,
    /// Real-time engine: presence, gateway, ledger, notifications
    pub engine: Arc<RealtimeEngine>,
    /// Bearer credential verifier shared with the gateway
    pub verifier: Arc<dyn CredentialVerifier>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("stores", &self.stores)
            .field("engine", &self.engine)
            .finish()
    }
}
