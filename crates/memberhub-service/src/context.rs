//! Request context carrying the authenticated member.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use memberhub_core::types::UserId;

/// Context for the current authenticated request or socket event.
///
/// Built by the API's auth extractor or the gateway after a connection
/// authenticates, and passed into service methods so every operation knows
/// who is acting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RequestContext {
    /// The authenticated member.
    pub user_id: UserId,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a context for `user_id` stamped with the current time.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            request_time: Utc::now(),
        }
    }
}
