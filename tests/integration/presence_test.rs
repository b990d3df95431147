//! Integration tests for presence over HTTP and the gateway.

use axum::http::StatusCode;
use chrono::Duration;

use memberhub_entity::presence::PresenceStatus;

use crate::helpers::{TestApp, frames_named};

#[tokio::test]
async fn test_never_seen_member_is_offline() {
    let app = TestApp::new();
    let viewer = app.add_member("Viewer");
    let stranger = app.add_member("Stranger");

    let response = app
        .request_as(viewer, "GET", &format!("/api/presence/{stranger}"), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["status"], "offline");
    assert!(response.data()["last_activity"].is_null());
}

#[tokio::test]
async fn test_online_then_idle_by_lazy_query() {
    let app = TestApp::new();
    let viewer = app.add_member("Viewer");
    let member = app.add_member("Member");
    let (_conn, _rx) = app.connect(member).await;

    let path = format!("/api/presence?user_ids={member}");
    let response = app.request_as(viewer, "GET", &path, None).await;
    assert_eq!(response.data()[member.to_string()], "online");

    app.clock.advance(Duration::seconds(181));
    let response = app.request_as(viewer, "GET", &path, None).await;
    assert_eq!(response.data()[member.to_string()], "idle");
}

#[tokio::test]
async fn test_sweep_and_query_converge() {
    let app = TestApp::new();
    let viewer = app.add_member("Viewer");
    let (swept, queried) = (app.add_member("Swept"), app.add_member("Queried"));
    app.state.engine.presence.heartbeat(swept, None);
    app.state.engine.presence.heartbeat(queried, None);

    app.clock.advance(Duration::seconds(200));
    let report = app.state.engine.sweeper.run_once();
    assert_eq!(report.idled, 2);

    let path = format!("/api/presence?user_ids={swept},{queried}");
    let response = app.request_as(viewer, "GET", &path, None).await;
    assert_eq!(response.data()[swept.to_string()], "idle");
    assert_eq!(response.data()[queried.to_string()], "idle");
}

#[tokio::test]
async fn test_polling_member_goes_offline_after_detached_timeout() {
    let app = TestApp::new();
    let viewer = app.add_member("Viewer");
    let poller = app.add_member("Poller");
    app.request_as(poller, "POST", "/api/presence/heartbeat", None)
        .await;

    let path = format!("/api/presence/{poller}");
    app.clock.advance(Duration::seconds(300));
    let response = app.request_as(viewer, "GET", &path, None).await;
    assert_eq!(response.data()["status"], "idle");

    app.clock.advance(Duration::seconds(301));
    let report = app.state.engine.sweeper.run_once();
    assert_eq!(report.idled, 1);
    assert_eq!(report.pruned, 1);
    let response = app.request_as(viewer, "GET", &path, None).await;
    assert_eq!(response.data()["status"], "offline");
}

#[tokio::test]
async fn test_heartbeat_endpoint_resets_idle() {
    let app = TestApp::new();
    let member = app.add_member("Member");
    let watcher = app.add_member("Watcher");

    let response = app
        .request_as(member, "POST", "/api/presence/heartbeat", None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["status"], "online");

    let (watcher_conn, mut watcher_rx) = app.connect(watcher).await;
    app.state
        .engine
        .gateway
        .join_room(
            watcher_conn.id,
            memberhub_realtime::RoomName::Presence(member),
        )
        .await
        .unwrap();

    app.clock.advance(Duration::seconds(181));
    assert_eq!(
        app.state.engine.presence_of(member).status,
        PresenceStatus::Idle
    );

    let response = app
        .request_as(member, "POST", "/api/presence/heartbeat", None)
        .await;
    assert_eq!(response.data()["status"], "online");

    let updates = frames_named(&mut watcher_rx, "presence:update");
    let statuses: Vec<&str> = updates
        .iter()
        .map(|f| f["data"]["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["idle", "online"]);
}

#[tokio::test]
async fn test_last_connection_closing_goes_offline() {
    let app = TestApp::new();
    let member = app.add_member("Member");
    let (first, _rx1) = app.connect(member).await;
    let (second, _rx2) = app.connect(member).await;

    app.state.engine.gateway.on_disconnect(first.id);
    assert_eq!(
        app.state.engine.presence_of(member).status,
        PresenceStatus::Online
    );

    app.state.engine.gateway.on_disconnect(second.id);
    assert_eq!(
        app.state.engine.presence_of(member).status,
        PresenceStatus::Offline
    );
}

#[tokio::test]
async fn test_bad_presence_query_is_rejected() {
    let app = TestApp::new();
    let viewer = app.add_member("Viewer");

    let response = app
        .request_as(viewer, "GET", "/api/presence?user_ids=abc", None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "VALIDATION_ERROR");

    let response = app.request("GET", "/api/presence?user_ids=", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}
