//! Connection gateway — lifecycle, authentication, rooms and emission.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use memberhub_core::AppError;
use memberhub_core::config::RealtimeConfig;
use memberhub_core::result::AppResult;
use memberhub_core::traits::Clock;
use memberhub_core::types::{ConnectionId, UserId};
use memberhub_entity::presence::PresenceChange;

use crate::message::envelope::Envelope;
use crate::message::types::{
    AuthenticatedPayload, ErrorPayload, InboundEvent, PresenceUpdatePayload, RoomPayload, codes,
    events,
};
use crate::message::validator::validate_inbound;
use crate::presence::registry::PresenceRegistry;
use crate::room::access::RoomAccess;
use crate::room::registry::RoomRegistry;
use crate::room::types::RoomName;

use super::authenticator::CredentialVerifier;
use super::handle::ConnectionHandle;
use super::pool::ConnectionPool;

/// What the transport should do after an inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundOutcome {
    /// Keep the socket open.
    Continue,
    /// Close the socket; authentication was rejected.
    Close,
}

/// Owns every live connection and the rooms they are in.
///
/// Delivery is best effort: events for rooms with no live member are
/// dropped and nothing is queued for later.
pub struct ConnectionGateway {
    pool: ConnectionPool,
    rooms: RoomRegistry,
    presence: Arc<PresenceRegistry>,
    verifier: Arc<dyn CredentialVerifier>,
    access: Arc<dyn RoomAccess>,
    clock: Arc<dyn Clock>,
    config: RealtimeConfig,
}

impl std::fmt::Debug for ConnectionGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionGateway")
            .field("connections", &self.pool.connection_count())
            .field("rooms", &self.rooms.room_count())
            .field("config", &self.config)
            .finish()
    }
}

impl ConnectionGateway {
    /// Creates a gateway.
    pub fn new(
        config: RealtimeConfig,
        presence: Arc<PresenceRegistry>,
        verifier: Arc<dyn CredentialVerifier>,
        access: Arc<dyn RoomAccess>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pool: ConnectionPool::new(),
            rooms: RoomRegistry::new(),
            presence,
            verifier,
            access,
            clock,
            config,
        }
    }

    /// The gateway's settings.
    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    /// Registers a new, unauthenticated connection.
    ///
    /// Returns the handle and the receiver the transport forwards to the
    /// socket.
    pub fn connect(&self) -> (Arc<ConnectionHandle>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size);
        let handle = Arc::new(ConnectionHandle::new(tx, self.clock.now()));
        self.pool.add(handle.clone());
        debug!(conn_id = %handle.id, "WebSocket connection opened");
        (handle, rx)
    }

    /// Looks up a live connection.
    pub fn connection(&self, conn: ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.pool.get(&conn)
    }

    /// Verifies `token` and binds the connection to its member.
    ///
    /// On success the connection joins its `user:` room, presence records
    /// a heartbeat, and an `authenticated` event is sent. When the member
    /// is over the per-user cap the oldest connection is closed.
    pub async fn authenticate(&self, conn: ConnectionId, token: &str) -> AppResult<UserId> {
        let handle = self
            .pool
            .get(&conn)
            .ok_or_else(|| AppError::not_found(format!("Connection {conn} not found")))?;

        let user = self.verifier.verify(token).await?;
        handle.bind(user)?;

        let evicted = self
            .pool
            .attach_user(user, handle.clone(), self.config.max_connections_per_user);
        for old in evicted {
            warn!(
                conn_id = %old.id,
                user_id = %user,
                max = self.config.max_connections_per_user,
                "User at max connections, closing oldest"
            );
            self.release(&old);
            old.close();
        }

        self.rooms.join(RoomName::User(user), conn);
        if let Some(change) = self.presence.heartbeat(user, Some(conn)) {
            self.broadcast_presence(change);
        }

        self.reply(
            &handle,
            events::AUTHENTICATED,
            &AuthenticatedPayload {
                user_id: user,
                connection_id: conn,
            },
        );
        info!(conn_id = %conn, user_id = %user, "WebSocket connection authenticated");
        Ok(user)
    }

    /// Adds an authenticated connection to `room`.
    pub async fn join_room(&self, conn: ConnectionId, room: RoomName) -> AppResult<()> {
        let handle = self
            .pool
            .get(&conn)
            .ok_or_else(|| AppError::not_found(format!("Connection {conn} not found")))?;
        let user = handle
            .user_id()
            .ok_or_else(|| AppError::authentication("Connection is not authenticated"))?;

        self.access.check(user, &room).await?;

        if !self.rooms.is_member(&room, conn)
            && self.rooms.joined_count(conn) >= self.config.max_subscriptions_per_connection
        {
            return Err(AppError::validation(format!(
                "Maximum subscriptions ({}) reached",
                self.config.max_subscriptions_per_connection
            )));
        }

        if self.rooms.join(room, conn) {
            debug!(conn_id = %conn, user_id = %user, room = %room, "Joined room");
        }
        Ok(())
    }

    /// Removes a connection from `room`. Returns whether it was a member.
    pub fn leave_room(&self, conn: ConnectionId, room: &RoomName) -> bool {
        let left = self.rooms.leave(room, conn);
        if left {
            debug!(conn_id = %conn, room = %room, "Left room");
        }
        left
    }

    /// Sends `event` to every live connection in `room`.
    ///
    /// Returns the number of connections the frame was queued for. An
    /// empty room yields `Ok(0)`; only serialization can fail.
    pub fn emit<T>(&self, room: &RoomName, event: &str, payload: &T) -> AppResult<usize>
    where
        T: Serialize + ?Sized,
    {
        let members = self.rooms.members(room);
        if members.is_empty() {
            debug!(room = %room, event, "No live members, event dropped");
            return Ok(0);
        }

        let frame = Envelope::new(event, Some(room.to_string()), &payload, self.clock.now())?
            .to_frame()?;
        let delivered = members
            .iter()
            .filter_map(|id| self.pool.get(id))
            .filter(|handle| handle.send(frame.clone()))
            .count();
        debug!(room = %room, event, delivered, "Event emitted");
        Ok(delivered)
    }

    /// Emits `presence:update` for a transition. Failures are logged.
    pub fn broadcast_presence(&self, change: PresenceChange) {
        let room = RoomName::Presence(change.user_id);
        if let Err(e) = self.emit(
            &room,
            events::PRESENCE_UPDATE,
            &PresenceUpdatePayload::from(change),
        ) {
            error!(user_id = %change.user_id, error = %e, "Failed to broadcast presence change");
        }
    }

    /// Cleans up after the socket closed: rooms, pool, presence.
    pub fn on_disconnect(&self, conn: ConnectionId) {
        let Some(handle) = self.pool.remove(&conn) else {
            return;
        };
        handle.mark_dead();
        self.release(&handle);
        info!(
            conn_id = %conn,
            user_id = ?handle.user_id(),
            "WebSocket connection closed"
        );
    }

    /// Leaves all rooms and drops the connection from presence.
    fn release(&self, handle: &ConnectionHandle) {
        self.pool.remove(&handle.id);
        self.rooms.leave_all(handle.id);
        let Some(user) = handle.user_id() else {
            return;
        };
        if let Some(change) = self.presence.disconnect(user, handle.id) {
            self.broadcast_presence(change);
        }
    }

    /// Processes one text frame from a client.
    ///
    /// Malformed frames and unknown events produce an `error` event. Every
    /// valid event from an authenticated connection counts as activity.
    pub async fn handle_inbound(&self, conn: ConnectionId, raw: &str) -> InboundOutcome {
        let Some(handle) = self.pool.get(&conn) else {
            warn!(conn_id = %conn, "Frame from unknown connection");
            return InboundOutcome::Close;
        };

        if let Err(e) = validate_inbound(raw, self.config.max_frame_bytes) {
            self.reply_error(&handle, codes::INVALID_FRAME, &e.message);
            return InboundOutcome::Continue;
        }

        let event: InboundEvent = match serde_json::from_str(raw) {
            Ok(event) => event,
            Err(e) => {
                self.reply_error(&handle, codes::INVALID_EVENT, &format!("Failed to parse event: {e}"));
                return InboundOutcome::Continue;
            }
        };

        if let InboundEvent::Authenticate { token } = &event {
            return match self.authenticate(conn, token).await {
                Ok(_) => InboundOutcome::Continue,
                Err(e) => {
                    warn!(conn_id = %conn, error = %e, "WebSocket authentication failed");
                    self.reply_error(&handle, codes::AUTHENTICATION_FAILED, &e.message);
                    InboundOutcome::Close
                }
            };
        }

        let Some(user) = handle.user_id() else {
            self.reply_error(&handle, codes::UNAUTHENTICATED, "Authenticate first");
            return InboundOutcome::Continue;
        };

        // The connection joined the presence set at authenticate; it may
        // have been evicted since, so activity never re-registers it.
        if let Some(change) = self.presence.touch(user) {
            self.broadcast_presence(change);
        }

        match event {
            InboundEvent::Heartbeat => {
                self.reply(&handle, events::HEARTBEAT_ACK, &serde_json::json!({}));
            }
            InboundEvent::Subscribe { room } => {
                let joined = match RoomName::parse(&room) {
                    Ok(name) => self.join_room(conn, name).await,
                    Err(e) => Err(e),
                };
                match joined {
                    Ok(()) => {
                        self.reply(&handle, events::SUBSCRIBED, &RoomPayload { room });
                    }
                    Err(e) => {
                        debug!(conn_id = %conn, room = %room, error = %e, "Subscribe rejected");
                        self.reply_error(&handle, codes::SUBSCRIBE_FAILED, &e.message);
                    }
                }
            }
            InboundEvent::Unsubscribe { room } => match RoomName::parse(&room) {
                Ok(name) => {
                    self.leave_room(conn, &name);
                    self.reply(&handle, events::UNSUBSCRIBED, &RoomPayload { room });
                }
                Err(e) => self.reply_error(&handle, codes::INVALID_EVENT, &e.message),
            },
            InboundEvent::Authenticate { .. } => {}
        }
        InboundOutcome::Continue
    }

    /// Closes every connection, used on shutdown.
    pub fn close_all(&self) {
        let connections = self.pool.all_connections();
        info!(count = connections.len(), "Closing all WebSocket connections");
        for handle in connections {
            handle.close();
        }
    }

    /// Total live connections.
    pub fn connection_count(&self) -> usize {
        self.pool.connection_count()
    }

    /// Members with at least one authenticated connection.
    pub fn user_count(&self) -> usize {
        self.pool.user_count()
    }

    fn reply<T: Serialize>(&self, handle: &ConnectionHandle, event: &str, payload: &T) -> bool {
        match Envelope::new(event, None, payload, self.clock.now()).and_then(|e| e.to_frame()) {
            Ok(frame) => handle.send(frame),
            Err(e) => {
                error!(conn_id = %handle.id, event, error = %e, "Failed to encode reply");
                false
            }
        }
    }

    fn reply_error(&self, handle: &ConnectionHandle, code: &str, message: &str) {
        self.reply(
            handle,
            events::ERROR,
            &ErrorPayload {
                code: code.to_string(),
                message: message.to_string(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use memberhub_core::ErrorKind;
    use memberhub_core::traits::ManualClock;
    use memberhub_entity::presence::PresenceStatus;

    use super::*;
    use crate::connection::authenticator::JwtVerifier;
    use crate::room::access::OpenRoomAccess;

    struct Fixture {
        gateway: ConnectionGateway,
        presence: Arc<PresenceRegistry>,
        jwt: JwtVerifier,
    }

    fn fixture(max_connections_per_user: usize) -> Fixture {
        let clock = Arc::new(ManualClock::starting_now());
        let presence = Arc::new(PresenceRegistry::new(clock.clone(), Duration::seconds(180)));
        let jwt = JwtVerifier::new("gateway-secret", 0);
        let config = RealtimeConfig {
            max_connections_per_user,
            ..RealtimeConfig::default()
        };
        let gateway = ConnectionGateway::new(
            config,
            presence.clone(),
            Arc::new(jwt.clone()),
            Arc::new(OpenRoomAccess),
            clock,
        );
        Fixture {
            gateway,
            presence,
            jwt,
        }
    }

    fn token(jwt: &JwtVerifier, user: UserId) -> String {
        jwt.issue(user, Duration::minutes(10)).unwrap()
    }

    fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<serde_json::Value> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(serde_json::from_str(&frame).unwrap());
        }
        frames
    }

    #[tokio::test]
    async fn test_authenticate_binds_and_marks_online() {
        let f = fixture(5);
        let user = UserId::new();
        let (handle, mut rx) = f.gateway.connect();

        let bound = f.gateway.authenticate(handle.id, &token(&f.jwt, user)).await.unwrap();
        assert_eq!(bound, user);
        assert_eq!(f.presence.query(user).status, PresenceStatus::Online);

        let frames = drain(&mut rx);
        assert_eq!(frames[0]["event"], "authenticated");
        assert_eq!(frames[0]["data"]["user_id"], user.to_string());

        let delivered = f
            .gateway
            .emit(&RoomName::User(user), events::NOTIFICATION, &serde_json::json!({"n": 1}))
            .unwrap();
        assert_eq!(delivered, 1);
    }

    #[tokio::test]
    async fn test_rebinding_to_other_user_fails() {
        let f = fixture(5);
        let (handle, _rx) = f.gateway.connect();
        f.gateway
            .authenticate(handle.id, &token(&f.jwt, UserId::new()))
            .await
            .unwrap();
        let err = f
            .gateway
            .authenticate(handle.id, &token(&f.jwt, UserId::new()))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
    }

    #[tokio::test]
    async fn test_emit_to_empty_room_is_dropped() {
        let f = fixture(5);
        let delivered = f
            .gateway
            .emit(&RoomName::User(UserId::new()), events::NOTIFICATION, &1)
            .unwrap();
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_cap_closes_oldest_connection() {
        let f = fixture(2);
        let user = UserId::new();
        let mut handles = Vec::new();
        for _ in 0..3 {
            let (handle, rx) = f.gateway.connect();
            f.gateway.authenticate(handle.id, &token(&f.jwt, user)).await.unwrap();
            handles.push((handle, rx));
        }

        assert!(!handles[0].0.is_alive());
        assert!(handles[1].0.is_alive());
        assert_eq!(f.presence.connection_count(user), 2);
        assert_eq!(f.presence.query(user).status, PresenceStatus::Online);
        let delivered = f
            .gateway
            .emit(&RoomName::User(user), events::NOTIFICATION, &1)
            .unwrap();
        assert_eq!(delivered, 2);
    }

    #[tokio::test]
    async fn test_disconnect_goes_offline_and_notifies_watchers() {
        let f = fixture(5);
        let (watched, watcher) = (UserId::new(), UserId::new());

        let (watcher_conn, mut watcher_rx) = f.gateway.connect();
        f.gateway
            .authenticate(watcher_conn.id, &token(&f.jwt, watcher))
            .await
            .unwrap();
        f.gateway
            .join_room(watcher_conn.id, RoomName::Presence(watched))
            .await
            .unwrap();

        let (conn, _rx) = f.gateway.connect();
        f.gateway.authenticate(conn.id, &token(&f.jwt, watched)).await.unwrap();
        f.gateway.on_disconnect(conn.id);
        f.gateway.on_disconnect(conn.id);

        assert_eq!(f.presence.query(watched).status, PresenceStatus::Offline);
        let updates: Vec<_> = drain(&mut watcher_rx)
            .into_iter()
            .filter(|frame| frame["event"] == "presence:update")
            .map(|frame| frame["data"]["status"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(updates, vec!["online", "offline"]);
    }

    #[tokio::test]
    async fn test_heartbeat_after_presence_release_leaves_no_ghost_connection() {
        let f = fixture(5);
        let user = UserId::new();
        let (handle, mut rx) = f.gateway.connect();
        f.gateway.authenticate(handle.id, &token(&f.jwt, user)).await.unwrap();
        drain(&mut rx);

        // An eviction on another task released presence after the pool lookup.
        f.presence.disconnect(user, handle.id);
        let outcome = f
            .gateway
            .handle_inbound(handle.id, r#"{"event":"heartbeat"}"#)
            .await;
        assert_eq!(outcome, InboundOutcome::Continue);
        assert_eq!(f.presence.connection_count(user), 0);
        assert_eq!(drain(&mut rx)[0]["event"], "heartbeat_ack");

        f.gateway.on_disconnect(handle.id);
        assert_eq!(f.presence.connection_count(user), 0);
    }

    #[tokio::test]
    async fn test_inbound_requires_authentication() {
        let f = fixture(5);
        let (handle, mut rx) = f.gateway.connect();
        let outcome = f
            .gateway
            .handle_inbound(handle.id, r#"{"event":"heartbeat"}"#)
            .await;
        assert_eq!(outcome, InboundOutcome::Continue);
        let frames = drain(&mut rx);
        assert_eq!(frames[0]["event"], "error");
        assert_eq!(frames[0]["data"]["code"], codes::UNAUTHENTICATED);
    }

    #[tokio::test]
    async fn test_inbound_bad_token_closes() {
        let f = fixture(5);
        let (handle, _rx) = f.gateway.connect();
        let outcome = f
            .gateway
            .handle_inbound(handle.id, r#"{"event":"authenticate","token":"bogus"}"#)
            .await;
        assert_eq!(outcome, InboundOutcome::Close);
        assert!(handle.user_id().is_none());
    }

    #[tokio::test]
    async fn test_inbound_subscribe_flow() {
        let f = fixture(5);
        let user = UserId::new();
        let (handle, mut rx) = f.gateway.connect();
        let auth = format!(r#"{{"event":"authenticate","token":"{}"}}"#, token(&f.jwt, user));
        assert_eq!(f.gateway.handle_inbound(handle.id, &auth).await, InboundOutcome::Continue);

        let other = UserId::new();
        let frames = [
            format!(r#"{{"event":"subscribe","room":"presence:{other}"}}"#),
            format!(r#"{{"event":"subscribe","room":"user:{other}"}}"#),
            r#"{"event":"subscribe","room":"lobby"}"#.to_string(),
            r#"{"event":"dance"}"#.to_string(),
            "  ".to_string(),
            r#"{"event":"heartbeat"}"#.to_string(),
        ];
        for frame in &frames {
            f.gateway.handle_inbound(handle.id, frame).await;
        }

        let events: Vec<String> = drain(&mut rx)
            .into_iter()
            .skip(1)
            .map(|frame| frame["event"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            events,
            vec!["subscribed", "error", "error", "error", "error", "heartbeat_ack"]
        );
    }

    #[tokio::test]
    async fn test_subscription_cap() {
        let f = fixture(5);
        let user = UserId::new();
        let (handle, _rx) = f.gateway.connect();
        f.gateway.authenticate(handle.id, &token(&f.jwt, user)).await.unwrap();

        // The private room already counts as one subscription.
        let cap = f.gateway.config().max_subscriptions_per_connection;
        for _ in 1..cap {
            f.gateway
                .join_room(handle.id, RoomName::Presence(UserId::new()))
                .await
                .unwrap();
        }
        let err = f
            .gateway
            .join_room(handle.id, RoomName::Presence(UserId::new()))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_close_all_signals_every_connection() {
        let f = fixture(5);
        let (a, _rx_a) = f.gateway.connect();
        let (b, _rx_b) = f.gateway.connect();
        f.gateway.close_all();
        a.closed().await;
        b.closed().await;
        assert!(!a.is_alive() && !b.is_alive());
    }
}
