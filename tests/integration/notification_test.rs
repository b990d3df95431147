//! Integration tests for notification listing, counts and read state.

use axum::http::StatusCode;
use uuid::Uuid;

use memberhub_realtime::NotificationFormatter;

use crate::helpers::{TestApp, frames_named};

#[tokio::test]
async fn test_unread_count_matches_records_and_read_all_is_idempotent() {
    let app = TestApp::new();
    let member = app.add_member("Member");
    let dispatcher = &app.state.engine.dispatcher;

    for i in 0..3 {
        dispatcher
            .notify(NotificationFormatter::system(member, "Notice", &format!("#{i}")))
            .await
            .unwrap();
    }

    let count = app
        .request_as(member, "GET", "/api/notifications/unread-count", None)
        .await;
    assert_eq!(count.status, StatusCode::OK);
    assert_eq!(count.data()["count"], 3);

    let listed = app
        .request_as(member, "GET", "/api/notifications?unread_only=true", None)
        .await;
    assert_eq!(listed.data()["total_items"], 3);

    let first = app
        .request_as(member, "PUT", "/api/notifications/read-all", None)
        .await;
    assert_eq!(first.data()["marked"], 3);
    let second = app
        .request_as(member, "PUT", "/api/notifications/read-all", None)
        .await;
    assert_eq!(second.data()["marked"], 0);

    let count = app
        .request_as(member, "GET", "/api/notifications/unread-count", None)
        .await;
    assert_eq!(count.data()["count"], 0);
}

#[tokio::test]
async fn test_mark_read_pushes_unread_count() {
    let app = TestApp::new();
    let member = app.add_member("Member");
    let (_conn, mut rx) = app.connect(member).await;

    let notification = app
        .state
        .engine
        .dispatcher
        .notify(NotificationFormatter::library_update(
            member,
            "Torque specs",
            Uuid::new_v4(),
        ))
        .await
        .unwrap();

    let pushed = frames_named(&mut rx, "notification");
    assert_eq!(pushed.len(), 1);
    assert_eq!(pushed[0]["data"]["id"], notification.id.to_string());
    assert_eq!(pushed[0]["data"]["kind"], "library_update");
    assert!(pushed[0]["data"]["link"]["url"].is_string());

    let response = app
        .request_as(
            member,
            "PUT",
            &format!("/api/notifications/{}/read", notification.id),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["changed"], true);

    let counts = frames_named(&mut rx, "notification:unread_count");
    assert_eq!(counts.len(), 1);
    assert_eq!(counts[0]["data"]["count"], 0);

    // Second mark is a no-op and pushes nothing.
    let response = app
        .request_as(
            member,
            "PUT",
            &format!("/api/notifications/{}/read", notification.id),
            None,
        )
        .await;
    assert_eq!(response.data()["changed"], false);
    assert!(frames_named(&mut rx, "notification:unread_count").is_empty());
}

#[tokio::test]
async fn test_foreign_notification_cannot_be_marked() {
    let app = TestApp::new();
    let owner = app.add_member("Owner");
    let other = app.add_member("Other");

    let notification = app
        .state
        .engine
        .dispatcher
        .notify(NotificationFormatter::system(owner, "Notice", "For the owner"))
        .await
        .unwrap();

    let response = app
        .request_as(
            other,
            "PUT",
            &format!("/api/notifications/{}/read", notification.id),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["changed"], false);

    let count = app
        .request_as(owner, "GET", "/api/notifications/unread-count", None)
        .await;
    assert_eq!(count.data()["count"], 1);
}

#[tokio::test]
async fn test_list_orders_unread_first() {
    let app = TestApp::new();
    let member = app.add_member("Member");
    let service = &app.state.engine.notifications;

    let older = app
        .state
        .engine
        .dispatcher
        .notify(NotificationFormatter::system(member, "Old", "unread"))
        .await
        .unwrap();
    app.clock.advance(chrono::Duration::minutes(1));
    let newer = app
        .state
        .engine
        .dispatcher
        .notify(NotificationFormatter::system(member, "New", "read"))
        .await
        .unwrap();
    service.mark_read(member, newer.id).await.unwrap();

    let listed = app.request_as(member, "GET", "/api/notifications", None).await;
    let items = listed.data()["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], older.id.to_string());
    assert_eq!(items[0]["is_read"], false);
    assert_eq!(items[1]["is_read"], true);
}

#[tokio::test]
async fn test_requests_without_token_are_unauthorized() {
    let app = TestApp::new();

    let response = app.request("GET", "/api/notifications", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "UNAUTHORIZED");

    let response = app
        .request("GET", "/api/notifications", None, Some("not-a-jwt"))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}
