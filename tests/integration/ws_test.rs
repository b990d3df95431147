//! Integration tests for the WebSocket gateway protocol.

use axum::http::StatusCode;
use serde_json::json;

use memberhub_core::config::AppConfig;
use memberhub_realtime::connection::InboundOutcome;

use crate::helpers::{TestApp, drain_frames, next_frame};

#[tokio::test]
async fn test_plain_get_is_not_upgraded() {
    let app = TestApp::new();

    let response = app.request("GET", "/ws", None, None).await;

    assert!(
        response.status == StatusCode::UNAUTHORIZED
            || response.status == StatusCode::BAD_REQUEST
            || response.status == StatusCode::UPGRADE_REQUIRED,
        "Expected 401, 400, or 426, got {}",
        response.status
    );
}

#[tokio::test]
async fn test_authenticate_event_flow() {
    let app = TestApp::new();
    let member = app.add_member("Member");
    let gateway = &app.state.engine.gateway;
    let (conn, mut rx) = gateway.connect();

    let outcome = gateway
        .handle_inbound(conn.id, &json!({ "event": "heartbeat" }).to_string())
        .await;
    assert_eq!(outcome, InboundOutcome::Continue);
    let frame = next_frame(&mut rx).unwrap();
    assert_eq!(frame["event"], "error");
    assert_eq!(frame["data"]["code"], "UNAUTHENTICATED");

    let token = app.token(member);
    let outcome = gateway
        .handle_inbound(
            conn.id,
            &json!({ "event": "authenticate", "token": token }).to_string(),
        )
        .await;
    assert_eq!(outcome, InboundOutcome::Continue);
    let frame = next_frame(&mut rx).unwrap();
    assert_eq!(frame["event"], "authenticated");
    assert_eq!(frame["data"]["user_id"], member.to_string());
    assert!(frame["timestamp"].is_string());

    gateway
        .handle_inbound(conn.id, &json!({ "event": "heartbeat" }).to_string())
        .await;
    assert_eq!(next_frame(&mut rx).unwrap()["event"], "heartbeat_ack");
}

#[tokio::test]
async fn test_bad_credentials_close_the_connection() {
    let app = TestApp::new();
    let gateway = &app.state.engine.gateway;
    let (conn, mut rx) = gateway.connect();

    let outcome = gateway
        .handle_inbound(
            conn.id,
            &json!({ "event": "authenticate", "token": "forged" }).to_string(),
        )
        .await;
    assert_eq!(outcome, InboundOutcome::Close);
    let frame = next_frame(&mut rx).unwrap();
    assert_eq!(frame["data"]["code"], "AUTHENTICATION_FAILED");
    assert_eq!(gateway.user_count(), 0);
}

#[tokio::test]
async fn test_malformed_frames_keep_the_connection() {
    let app = TestApp::new();
    let member = app.add_member("Member");
    let (conn, mut rx) = app.connect(member).await;
    let gateway = &app.state.engine.gateway;

    for raw in ["not json", r#"{"event":"dance"}"#, r#"{"room":"user:x"}"#] {
        let outcome = gateway.handle_inbound(conn.id, raw).await;
        assert_eq!(outcome, InboundOutcome::Continue);
        let frame = next_frame(&mut rx).unwrap();
        assert_eq!(frame["event"], "error");
    }
    assert!(conn.is_alive());
}

#[tokio::test]
async fn test_subscriptions_respect_room_access() {
    let app = TestApp::new();
    let (a, b, eve) = (
        app.add_member("Alice"),
        app.add_member("Bob"),
        app.add_member("Eve"),
    );
    let sent = app
        .state
        .engine
        .bridge
        .send_direct(a, b, "hello")
        .await
        .unwrap();
    let room = format!("conversation:{}", sent.conversation.id);

    let (eve_conn, mut eve_rx) = app.connect(eve).await;
    let gateway = &app.state.engine.gateway;

    gateway
        .handle_inbound(
            eve_conn.id,
            &json!({ "event": "subscribe", "room": room }).to_string(),
        )
        .await;
    let frame = next_frame(&mut eve_rx).unwrap();
    assert_eq!(frame["data"]["code"], "SUBSCRIBE_FAILED");

    gateway
        .handle_inbound(
            eve_conn.id,
            &json!({ "event": "subscribe", "room": format!("user:{a}") }).to_string(),
        )
        .await;
    assert_eq!(next_frame(&mut eve_rx).unwrap()["data"]["code"], "SUBSCRIBE_FAILED");

    let presence_room = format!("presence:{a}");
    gateway
        .handle_inbound(
            eve_conn.id,
            &json!({ "event": "subscribe", "room": presence_room }).to_string(),
        )
        .await;
    let frame = next_frame(&mut eve_rx).unwrap();
    assert_eq!(frame["event"], "subscribed");
    assert_eq!(frame["data"]["room"], presence_room);

    let (b_conn, mut b_rx) = app.connect(b).await;
    gateway
        .handle_inbound(
            b_conn.id,
            &json!({ "event": "subscribe", "room": room }).to_string(),
        )
        .await;
    assert_eq!(next_frame(&mut b_rx).unwrap()["event"], "subscribed");

    gateway
        .handle_inbound(
            b_conn.id,
            &json!({ "event": "unsubscribe", "room": room }).to_string(),
        )
        .await;
    assert_eq!(next_frame(&mut b_rx).unwrap()["event"], "unsubscribed");
}

#[tokio::test]
async fn test_connection_cap_evicts_oldest() {
    let mut config = AppConfig::default();
    config.realtime.max_connections_per_user = 2;
    let app = TestApp::with_config(config);
    let member = app.add_member("Member");

    let (oldest, _rx1) = app.connect(member).await;
    let (_middle, _rx2) = app.connect(member).await;
    let (_newest, mut rx3) = app.connect(member).await;

    oldest.closed().await;
    assert!(!oldest.is_alive());
    assert_eq!(app.state.engine.gateway.connection_count(), 2);

    // The member stayed online throughout.
    assert!(drain_frames(&mut rx3).is_empty());
    assert_eq!(
        app.state.engine.presence_of(member).status,
        memberhub_entity::presence::PresenceStatus::Online
    );
}

#[tokio::test]
async fn test_shutdown_closes_every_connection() {
    let app = TestApp::new();
    let (a, b) = (app.add_member("Alice"), app.add_member("Bob"));
    let (conn_a, _rx_a) = app.connect(a).await;
    let (conn_b, _rx_b) = app.connect(b).await;

    app.state.engine.shutdown();

    conn_a.closed().await;
    conn_b.closed().await;
}
