//! Route definitions for the MemberHub HTTP API.
//!
//! All REST routes are organized by domain and mounted under `/api`; the
//! WebSocket gateway lives at `/ws`. Every `/api` route except health
//! requires a bearer token through the `AuthUser` extractor.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Request bodies are small JSON documents.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Build the complete Axum router with all routes and middleware.
///
/// Receives the fully-constructed `AppState` and threads it through
/// every route via `.with_state(state)`.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(notification_routes())
        .merge(presence_routes())
        .merge(conversation_routes())
        .merge(health_routes());

    let ws_routes = Router::new().route("/ws", get(handlers::ws::ws_handler));

    let cors = middleware::cors::build_cors_layer(&state.config.server.cors);

    Router::new()
        .nest("/api", api_routes)
        .merge(ws_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Notification list, counts and read state
fn notification_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications",
            get(handlers::notification::list_notifications),
        )
        .route(
            "/notifications/unread-count",
            get(handlers::notification::unread_count),
        )
        .route(
            "/notifications/read-all",
            put(handlers::notification::mark_all_read),
        )
        .route(
            "/notifications/{id}/read",
            put(handlers::notification::mark_read),
        )
}

/// Presence queries and polling heartbeat
fn presence_routes() -> Router<AppState> {
    Router::new()
        .route("/presence", get(handlers::presence::bulk_presence))
        .route("/presence/heartbeat", post(handlers::presence::heartbeat))
        .route("/presence/{user_id}", get(handlers::presence::get_presence))
}

/// Conversations and messages
fn conversation_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/conversations",
            get(handlers::conversation::list_conversations)
                .post(handlers::conversation::create_group),
        )
        .route(
            "/conversations/direct/{user_id}/messages",
            post(handlers::conversation::send_direct),
        )
        .route(
            "/conversations/{id}",
            get(handlers::conversation::get_conversation),
        )
        .route(
            "/conversations/{id}/messages",
            get(handlers::conversation::list_messages)
                .post(handlers::conversation::send_message),
        )
        .route(
            "/conversations/{id}/read",
            post(handlers::conversation::mark_read),
        )
}

/// Health check (no auth)
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
