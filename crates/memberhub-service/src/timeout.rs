//! Bounded store calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use memberhub_core::AppError;
use memberhub_core::result::AppResult;

/// Applies the configured store timeout to every durable-store call.
///
/// An elapsed timeout becomes `ErrorKind::TransientStore`; the caller's
/// action fails and the client is expected to retry.
#[derive(Debug, Clone, Copy)]
pub struct StoreGuard {
    timeout: Duration,
}

impl StoreGuard {
    /// Create a guard with the given per-call budget.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// The per-call budget.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `fut`, failing with a transient error if it exceeds the budget.
    pub async fn call<T, F>(&self, operation: &'static str, fut: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    operation,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Store call timed out"
                );
                Err(AppError::transient_store(format!(
                    "{operation} timed out after {}ms",
                    self.timeout.as_millis()
                )))
            }
        }
    }
}

impl Default for StoreGuard {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}
