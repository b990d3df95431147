//! Integration tests for conversations and messaging over HTTP.

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;

use crate::helpers::{TestApp, frames_named};

#[tokio::test]
async fn test_concurrent_first_sends_share_one_conversation() {
    let app = Arc::new(TestApp::new());
    let a = app.add_member("Alice");
    let b = app.add_member("Bob");

    let mut tasks = Vec::new();
    for i in 0..8 {
        let app = app.clone();
        tasks.push(tokio::spawn(async move {
            let (from, to) = if i % 2 == 0 { (a, b) } else { (b, a) };
            app.request_as(
                from,
                "POST",
                &format!("/api/conversations/direct/{to}/messages"),
                Some(json!({ "content": format!("hello {i}") })),
            )
            .await
        }));
    }

    let mut ids = Vec::new();
    for task in tasks {
        let response = task.await.unwrap();
        assert_eq!(response.status, StatusCode::CREATED);
        ids.push(response.data()["conversation"]["id"].as_str().unwrap().to_string());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 1);

    let listed = app.request_as(a, "GET", "/api/conversations", None).await;
    assert_eq!(listed.data()["total_items"], 1);
}

#[tokio::test]
async fn test_unread_vector_tracks_appends_and_reads() {
    let app = TestApp::new();
    let a = app.add_member("Alice");
    let b = app.add_member("Bob");

    let first = app
        .request_as(
            a,
            "POST",
            &format!("/api/conversations/direct/{b}/messages"),
            Some(json!({ "content": "one" })),
        )
        .await;
    let conversation_id = first.data()["conversation"]["id"].as_str().unwrap().to_string();

    for content in ["two", "three"] {
        let response = app
            .request_as(
                a,
                "POST",
                &format!("/api/conversations/{conversation_id}/messages"),
                Some(json!({ "content": content })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
    }

    let path = format!("/api/conversations/{conversation_id}");
    assert_eq!(
        app.request_as(b, "GET", &path, None).await.data()["unread_count"],
        3
    );
    assert_eq!(
        app.request_as(a, "GET", &path, None).await.data()["unread_count"],
        0
    );

    let read = app
        .request_as(b, "POST", &format!("{path}/read"), None)
        .await;
    assert_eq!(read.data()["updated"], true);
    assert_eq!(
        app.request_as(b, "GET", &path, None).await.data()["unread_count"],
        0
    );

    app.request_as(
        a,
        "POST",
        &format!("{path}/messages"),
        Some(json!({ "content": "four" })),
    )
    .await;
    assert_eq!(
        app.request_as(b, "GET", &path, None).await.data()["unread_count"],
        1
    );

    let messages = app
        .request_as(b, "GET", &format!("{path}/messages?per_page=2"), None)
        .await;
    assert_eq!(messages.data()["total_items"], 4);
    assert_eq!(messages.data()["items"][0]["content"], "four");
    assert_eq!(messages.data()["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_outsiders_cannot_read_or_post() {
    let app = TestApp::new();
    let (a, b, eve) = (
        app.add_member("Alice"),
        app.add_member("Bob"),
        app.add_member("Eve"),
    );

    let sent = app
        .request_as(
            a,
            "POST",
            &format!("/api/conversations/direct/{b}/messages"),
            Some(json!({ "content": "private" })),
        )
        .await;
    let conversation_id = sent.data()["conversation"]["id"].as_str().unwrap().to_string();

    let response = app
        .request_as(eve, "GET", &format!("/api/conversations/{conversation_id}"), None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app
        .request_as(
            eve,
            "POST",
            &format!("/api/conversations/{conversation_id}/messages"),
            Some(json!({ "content": "hi" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    // Marking a foreign conversation read is an idempotent no-op.
    let response = app
        .request_as(eve, "POST", &format!("/api/conversations/{conversation_id}/read"), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["updated"], false);
}

#[tokio::test]
async fn test_invalid_messages_are_rejected() {
    let app = TestApp::new();
    let a = app.add_member("Alice");
    let b = app.add_member("Bob");
    let path = format!("/api/conversations/direct/{b}/messages");

    let empty = app
        .request_as(a, "POST", &path, Some(json!({ "content": "" })))
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);

    let long = app
        .request_as(a, "POST", &path, Some(json!({ "content": "x".repeat(5001) })))
        .await;
    assert_eq!(long.status, StatusCode::BAD_REQUEST);

    let to_self = app
        .request_as(
            a,
            "POST",
            &format!("/api/conversations/direct/{a}/messages"),
            Some(json!({ "content": "me" })),
        )
        .await;
    assert_eq!(to_self.status, StatusCode::BAD_REQUEST);

    let listed = app.request_as(a, "GET", "/api/conversations", None).await;
    assert_eq!(listed.data()["total_items"], 0);
}

#[tokio::test]
async fn test_group_send_pushes_to_every_other_member() {
    let app = TestApp::new();
    let (a, b, c) = (
        app.add_member("Alice"),
        app.add_member("Bob"),
        app.add_member("Carol"),
    );
    let (_b_conn, mut b_rx) = app.connect(b).await;
    let (_c_conn, mut c_rx) = app.connect(c).await;
    let (_a_conn, mut a_rx) = app.connect(a).await;

    let created = app
        .request_as(
            a,
            "POST",
            "/api/conversations",
            Some(json!({ "participant_ids": [b, c] })),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.data()["is_group"], true);
    let conversation_id = created.data()["id"].as_str().unwrap().to_string();

    app.request_as(
        a,
        "POST",
        &format!("/api/conversations/{conversation_id}/messages"),
        Some(json!({ "content": "team meeting at 5" })),
    )
    .await;

    for (member, rx) in [(b, &mut b_rx), (c, &mut c_rx)] {
        let pushes = frames_named(rx, "message:new");
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0]["room"], format!("user:{member}"));
        assert_eq!(pushes[0]["data"]["unread_count"], 1);
        assert_eq!(pushes[0]["data"]["sender"]["display_name"], "Alice");
        assert_eq!(pushes[0]["data"]["message"]["content"], "team meeting at 5");
    }
    assert!(frames_named(&mut a_rx, "message:new").is_empty());
}
