//! Outbound frame envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use memberhub_core::result::AppResult;

/// Every server-to-client frame:
/// `{"event", "room", "data", "timestamp"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Event name, see [`super::types::events`].
    pub event: String,
    /// Room the event was emitted to; absent for direct replies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    /// Event payload.
    pub data: serde_json::Value,
    /// Server time of emission.
    pub timestamp: DateTime<Utc>,
}

impl Envelope {
    /// Wraps a serializable payload.
    pub fn new(
        event: &str,
        room: Option<String>,
        data: &impl Serialize,
        timestamp: DateTime<Utc>,
    ) -> AppResult<Self> {
        Ok(Self {
            event: event.to_string(),
            room,
            data: serde_json::to_value(data)?,
            timestamp,
        })
    }

    /// Serializes to a text frame.
    pub fn to_frame(&self) -> AppResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
