//! Shared test helpers for integration tests.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Duration;
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;

use memberhub_api::{AppState, build_app, build_state};
use memberhub_core::config::AppConfig;
use memberhub_core::traits::ManualClock;
use memberhub_core::types::UserId;
use memberhub_database::Stores;
use memberhub_database::memory::MemoryUserDirectory;
use memberhub_entity::user::UserSummary;
use memberhub_realtime::JwtVerifier;
use memberhub_realtime::connection::ConnectionHandle;

/// Shared signing secret for test tokens.
const TEST_SECRET: &str = "integration-test-secret";

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Shared state, for driving the engine directly
    pub state: AppState,
    /// Manually advanced clock behind presence and timestamps
    pub clock: Arc<ManualClock>,
    /// Member directory seeded by `add_member`
    pub directory: Arc<MemoryUserDirectory>,
    jwt: JwtVerifier,
}

impl TestApp {
    /// Create a new test application with default configuration
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Create a new test application with `config`
    pub fn with_config(config: AppConfig) -> Self {
        let directory = Arc::new(MemoryUserDirectory::new());
        let stores = Stores::memory_with_directory(directory.clone());
        let clock = Arc::new(ManualClock::starting_now());
        let jwt = JwtVerifier::new(TEST_SECRET, 0);

        let state = build_state(config, stores, clock.clone(), Arc::new(jwt.clone()))
            .expect("Failed to build state");
        let router = build_app(state.clone());

        Self {
            router,
            state,
            clock,
            directory,
            jwt,
        }
    }

    /// Register a member in the directory and return their id
    pub fn add_member(&self, display_name: &str) -> UserId {
        let user_id = UserId::new();
        self.directory.upsert(UserSummary {
            user_id,
            display_name: display_name.to_string(),
            avatar_url: None,
        });
        user_id
    }

    /// Issue a bearer token for `user`
    pub fn token(&self, user: UserId) -> String {
        self.jwt
            .issue(user, Duration::hours(1))
            .expect("Failed to issue token")
    }

    /// Open an authenticated gateway connection for `user`.
    ///
    /// The `authenticated` reply is consumed.
    pub async fn connect(&self, user: UserId) -> (Arc<ConnectionHandle>, mpsc::Receiver<String>) {
        let gateway = &self.state.engine.gateway;
        let (handle, mut rx) = gateway.connect();
        gateway
            .authenticate(handle.id, &self.token(user))
            .await
            .expect("Failed to authenticate connection");
        let first = next_frame(&mut rx).expect("No authenticated frame");
        assert_eq!(first["event"], "authenticated");
        (handle, rx)
    }

    /// Make an HTTP request to the test app
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }

    /// Authenticated request as `user`
    pub async fn request_as(
        &self,
        user: UserId,
        method: &str,
        path: &str,
        body: Option<Value>,
    ) -> TestResponse {
        let token = self.token(user);
        self.request(method, path, body, Some(&token)).await
    }
}

/// Next queued frame, parsed
pub fn next_frame(rx: &mut mpsc::Receiver<String>) -> Option<Value> {
    rx.try_recv()
        .ok()
        .map(|raw| serde_json::from_str(&raw).expect("Frame is not JSON"))
}

/// All queued frames, parsed
pub fn drain_frames(rx: &mut mpsc::Receiver<String>) -> Vec<Value> {
    std::iter::from_fn(|| next_frame(rx)).collect()
}

/// Queued frames carrying `event`
pub fn frames_named(rx: &mut mpsc::Receiver<String>, event: &str) -> Vec<Value> {
    drain_frames(rx)
        .into_iter()
        .filter(|f| f["event"] == event)
        .collect()
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}

impl TestResponse {
    /// The `data` member of a success envelope
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }
}
