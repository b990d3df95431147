//! Real-time WebSocket gateway configuration.

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Maximum WebSocket connections per user; the oldest is closed beyond it.
    #[serde(default = "default_max_connections_per_user")]
    pub max_connections_per_user: usize,
    /// Outbound buffer per connection. Events are dropped when it is full.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Interval at which the server pings idle sockets, in seconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,
    /// Seconds an unauthenticated connection may stay open.
    #[serde(default = "default_auth_timeout")]
    pub auth_timeout_seconds: u64,
    /// Maximum room subscriptions per connection.
    #[serde(default = "default_max_subscriptions")]
    pub max_subscriptions_per_connection: usize,
    /// Maximum inbound frame size in bytes.
    #[serde(default = "default_max_frame")]
    pub max_frame_bytes: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            max_connections_per_user: default_max_connections_per_user(),
            channel_buffer_size: default_channel_buffer(),
            ping_interval_seconds: default_ping_interval(),
            auth_timeout_seconds: default_auth_timeout(),
            max_subscriptions_per_connection: default_max_subscriptions(),
            max_frame_bytes: default_max_frame(),
        }
    }
}

fn default_max_connections_per_user() -> usize {
    5
}

fn default_channel_buffer() -> usize {
    256
}

fn default_ping_interval() -> u64 {
    30
}

fn default_auth_timeout() -> u64 {
    10
}

fn default_max_subscriptions() -> usize {
    50
}

fn default_max_frame() -> usize {
    65_536
}
