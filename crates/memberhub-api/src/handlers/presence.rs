//! Presence handlers.

use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, Query, State};

use memberhub_core::types::UserId;
use memberhub_entity::presence::{PresenceSnapshot, PresenceStatus};

use crate::dto::request::PresenceQuery;
use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// GET /api/presence?user_ids=a,b,c
///
/// Unknown members are reported offline.
pub async fn bulk_presence(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<PresenceQuery>,
) -> Result<Json<ApiResponse<HashMap<UserId, PresenceStatus>>>, ApiError> {
    let ids = query.parse_ids()?;
    Ok(Json(ApiResponse::ok(state.engine.presence_bulk(&ids))))
}

/// GET /api/presence/{user_id}
pub async fn get_presence(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(user_id): Path<UserId>,
) -> Json<ApiResponse<PresenceSnapshot>> {
    Json(ApiResponse::ok(state.engine.presence_of(user_id)))
}

/// POST /api/presence/heartbeat
///
/// Keeps polling clients without a socket online.
pub async fn heartbeat(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Json<ApiResponse<PresenceSnapshot>> {
    if let Some(change) = state.engine.presence.touch(auth.user_id) {
        state.engine.gateway.broadcast_presence(change);
    }
    Json(ApiResponse::ok(state.engine.presence.query(auth.user_id)))
}
