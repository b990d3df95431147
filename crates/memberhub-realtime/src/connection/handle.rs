//! Individual WebSocket connection handle.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use memberhub_core::AppError;
use memberhub_core::types::{ConnectionId, UserId};

/// A handle to a single WebSocket connection.
///
/// Holds the sender for pushing text frames to the client's forwarder
/// task. The member is bound once, on successful authentication.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// When the connection was established
    pub connected_at: DateTime<Utc>,
    user: OnceLock<UserId>,
    sender: mpsc::Sender<String>,
    alive: AtomicBool,
    closed: CancellationToken,
}

impl ConnectionHandle {
    /// Create a new, unauthenticated connection handle
    pub fn new(sender: mpsc::Sender<String>, connected_at: DateTime<Utc>) -> Self {
        Self {
            id: ConnectionId::new(),
            connected_at,
            user: OnceLock::new(),
            sender,
            alive: AtomicBool::new(true),
            closed: CancellationToken::new(),
        }
    }

    /// The bound member, if authenticated
    pub fn user_id(&self) -> Option<UserId> {
        self.user.get().copied()
    }

    /// Binds the connection to `user`. Binding the same member twice is
    /// accepted; a different member is an authentication error.
    pub fn bind(&self, user: UserId) -> Result<(), AppError> {
        let bound = *self.user.get_or_init(|| user);
        if bound == user {
            Ok(())
        } else {
            Err(AppError::authentication(
                "Connection is already bound to another member",
            ))
        }
    }

    /// Queue a text frame for this connection. Never blocks; a full buffer
    /// drops the frame.
    pub fn send(&self, frame: String) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(conn_id = %self.id, "Connection send buffer full, dropping event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                false
            }
        }
    }

    /// Check if connection is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark connection as dead
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Ask the transport to close the socket.
    pub fn close(&self) {
        self.mark_dead();
        self.closed.cancel();
    }

    /// Resolves once [`close`](Self::close) has been called.
    pub async fn closed(&self) {
        self.closed.cancelled().await;
    }
}
