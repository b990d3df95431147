//! WebSocket upgrade handler.
//!
//! The socket is split into an outbound forwarder, which drains the
//! connection's bounded queue and sends keep-alive pings, and an inbound
//! loop that hands text frames to the gateway. Either side ending closes
//! the connection and releases it from rooms and presence.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use memberhub_realtime::connection::{ConnectionHandle, InboundOutcome};

use crate::error::ApiError;
use crate::state::AppState;

/// Grace period for flushing queued frames after the connection closes.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Query parameters of `GET /ws`.
#[derive(Debug, Default, serde::Deserialize)]
pub struct WsQuery {
    /// Bearer token; when absent the client sends an `authenticate` event.
    pub token: Option<String>,
}

/// GET /ws?token={jwt} — WebSocket upgrade
pub async fn ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
) -> Result<Response, ApiError> {
    // Reject bad tokens before upgrading.
    let token = match query.token.filter(|t| !t.is_empty()) {
        Some(token) => {
            state.verifier.verify(&token).await?;
            Some(token)
        }
        None => None,
    };

    let max_frame = state.config.realtime.max_frame_bytes;
    Ok(ws
        .max_message_size(max_frame.saturating_mul(2))
        .on_upgrade(move |socket| handle_ws_connection(state, token, socket)))
}

/// Handles an established WebSocket connection.
async fn handle_ws_connection(state: AppState, token: Option<String>, socket: WebSocket) {
    let gateway = state.engine.gateway.clone();
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (handle, outbound_rx) = gateway.connect();
    let conn_id = handle.id;

    debug!(conn_id = %conn_id, "WebSocket connection opened");

    let ping_interval = Duration::from_secs(state.config.realtime.ping_interval_seconds.max(1));
    let outbound_handle = handle.clone();
    let outbound_task = tokio::spawn(async move {
        forward_outbound(&mut ws_tx, outbound_rx, &outbound_handle, ping_interval).await;
    });

    if let Some(token) = token {
        if let Err(e) = gateway.authenticate(conn_id, &token).await {
            warn!(conn_id = %conn_id, error = %e, "WebSocket authentication failed");
            handle.close();
        }
    }

    let auth_deadline = tokio::time::sleep(Duration::from_secs(
        state.config.realtime.auth_timeout_seconds,
    ));
    tokio::pin!(auth_deadline);

    loop {
        tokio::select! {
            _ = handle.closed() => break,
            _ = &mut auth_deadline, if handle.user_id().is_none() => {
                info!(conn_id = %conn_id, "WebSocket authentication timed out");
                break;
            }
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if gateway.handle_inbound(conn_id, text.as_str()).await == InboundOutcome::Close {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(Message::Binary(_))) => {
                    debug!(conn_id = %conn_id, "Ignoring binary frame");
                }
                // Pings are answered by axum; pongs need no handling.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
            },
        }
    }

    // Cleanup
    gateway.on_disconnect(conn_id);
    handle.close();
    if tokio::time::timeout(FLUSH_TIMEOUT, outbound_task).await.is_err() {
        debug!(conn_id = %conn_id, "Outbound flush timed out");
    }
}

/// Drains the outbound queue into the socket until the connection closes.
async fn forward_outbound(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<String>,
    handle: &Arc<ConnectionHandle>,
    ping_interval: Duration,
) {
    let mut ping = tokio::time::interval(ping_interval);
    ping.tick().await;

    loop {
        tokio::select! {
            frame = outbound_rx.recv() => {
                let Some(frame) = frame else { break };
                if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                    handle.mark_dead();
                    return;
                }
            }
            _ = ping.tick() => {
                if ws_tx.send(Message::Ping(axum::body::Bytes::new())).await.is_err() {
                    handle.mark_dead();
                    return;
                }
            }
            _ = handle.closed() => break,
        }
    }

    // Flush frames queued before the close, such as a final error event.
    while let Ok(frame) = outbound_rx.try_recv() {
        if ws_tx.send(Message::Text(frame.into())).await.is_err() {
            return;
        }
    }
    let _ = ws_tx.send(Message::Close(None)).await;
}
