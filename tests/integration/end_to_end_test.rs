//! The full "A sends Hi to B" flow across ledger, pushes and notifications.

use axum::http::StatusCode;
use serde_json::json;

use crate::helpers::{TestApp, drain_frames};

#[tokio::test]
async fn test_a_sends_hi_to_b() {
    let app = TestApp::new();
    let a = app.add_member("Alice");
    let b = app.add_member("Bob");
    let (_b_conn, mut b_rx) = app.connect(b).await;

    // A writes to B for the first time.
    let sent = app
        .request_as(
            a,
            "POST",
            &format!("/api/conversations/direct/{b}/messages"),
            Some(json!({ "content": "Hi" })),
        )
        .await;
    assert_eq!(sent.status, StatusCode::CREATED);
    assert_eq!(sent.data()["notified"], 1);
    assert_eq!(sent.data()["message"]["content"], "Hi");
    let conversation_id = sent.data()["conversation"]["id"].as_str().unwrap().to_string();

    let conversation = app
        .state
        .engine
        .ledger
        .get(conversation_id.parse().unwrap(), a)
        .await
        .unwrap();
    assert!(!conversation.is_group);
    assert_eq!(conversation.unread_for(a), 0);
    assert_eq!(conversation.unread_for(b), 1);
    assert_eq!(conversation.last_message_preview.as_deref(), Some("Hi"));

    // B's open tab sees the message, then the notification.
    let frames = drain_frames(&mut b_rx);
    let events: Vec<&str> = frames.iter().map(|f| f["event"].as_str().unwrap()).collect();
    assert_eq!(events, vec!["message:new", "notification"]);
    assert_eq!(frames[0]["room"], format!("user:{b}"));
    assert_eq!(frames[0]["data"]["unread_count"], 1);
    assert_eq!(frames[1]["data"]["kind"], "message");
    assert_eq!(frames[1]["data"]["sender"]["display_name"], "Alice");
    let notification_id = frames[1]["data"]["id"].as_str().unwrap().to_string();

    let count = app
        .request_as(b, "GET", "/api/notifications/unread-count", None)
        .await;
    assert_eq!(count.data()["count"], 1);

    // B opens the thread.
    let read = app
        .request_as(
            b,
            "POST",
            &format!("/api/conversations/{conversation_id}/read"),
            None,
        )
        .await;
    assert_eq!(read.data()["updated"], true);
    let frames = drain_frames(&mut b_rx);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["event"], "conversation:read");
    assert_eq!(frames[0]["data"]["unread_count"], 0);

    let view = app
        .request_as(b, "GET", &format!("/api/conversations/{conversation_id}"), None)
        .await;
    assert_eq!(view.data()["unread_count"], 0);

    let messages = app
        .request_as(
            b,
            "GET",
            &format!("/api/conversations/{conversation_id}/messages"),
            None,
        )
        .await;
    assert_eq!(messages.data()["items"][0]["read_by"][0]["user_id"], b.to_string());

    // B dismisses the notification.
    app.request_as(
        b,
        "PUT",
        &format!("/api/notifications/{notification_id}/read"),
        None,
    )
    .await;
    let count = app
        .request_as(b, "GET", "/api/notifications/unread-count", None)
        .await;
    assert_eq!(count.data()["count"], 0);

    let frames = drain_frames(&mut b_rx);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["event"], "notification:unread_count");
    assert_eq!(frames[0]["data"]["count"], 0);
}
