//! Who may join which room.

use std::sync::Arc;

use async_trait::async_trait;

use memberhub_core::AppError;
use memberhub_core::result::AppResult;
use memberhub_core::types::UserId;
use memberhub_service::ConversationLedger;

use super::types::RoomName;

/// Room admission check for client-initiated subscriptions.
#[async_trait]
pub trait RoomAccess: Send + Sync + 'static {
    /// Errors with `Authorization` when `user` may not join `room`.
    async fn check(&self, user: UserId, room: &RoomName) -> AppResult<()>;
}

/// A member may only join their own `user:` room; everything else is open.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenRoomAccess;

#[async_trait]
impl RoomAccess for OpenRoomAccess {
    async fn check(&self, user: UserId, room: &RoomName) -> AppResult<()> {
        own_user_room(user, room)
    }
}

/// Like [`OpenRoomAccess`], but `conversation:` rooms require
/// participation, checked against the ledger.
#[derive(Debug, Clone)]
pub struct ConversationRoomAccess {
    ledger: Arc<ConversationLedger>,
}

impl ConversationRoomAccess {
    /// Creates an access check backed by `ledger`.
    pub fn new(ledger: Arc<ConversationLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl RoomAccess for ConversationRoomAccess {
    async fn check(&self, user: UserId, room: &RoomName) -> AppResult<()> {
        own_user_room(user, room)?;
        if let RoomName::Conversation(id) = room {
            self.ledger.get(*id, user).await.map_err(|e| {
                if e.is_not_found() {
                    AppError::authorization("Not a participant of this conversation")
                } else {
                    e
                }
            })?;
        }
        Ok(())
    }
}

fn own_user_room(user: UserId, room: &RoomName) -> AppResult<()> {
    match room {
        RoomName::User(owner) if *owner != user => Err(AppError::authorization(
            "Cannot join another member's private room",
        )),
        _ => Ok(()),
    }
}
