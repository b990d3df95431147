//! Health check handler.

use axum::Json;
use axum::extract::State;
use tracing::warn;

use crate::dto::response::{ApiResponse, HealthResponse};
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let store = match &state.stores.pool {
        None => "memory".to_string(),
        Some(pool) => match pool.health_check().await {
            Ok(true) => "connected".to_string(),
            Ok(false) => "unavailable".to_string(),
            Err(e) => {
                warn!(error = %e, "Store health check failed");
                "unavailable".to_string()
            }
        },
    };
    let status = if store == "unavailable" { "degraded" } else { "ok" };

    Json(ApiResponse::ok(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        store,
        ws_connections: state.engine.gateway.connection_count(),
        connected_members: state.engine.gateway.user_count(),
    }))
}
