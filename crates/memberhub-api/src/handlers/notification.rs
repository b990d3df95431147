//! Notification handlers.

use axum::Json;
use axum::extract::{Path, Query, State};

use memberhub_core::types::{NotificationId, PageResponse};
use memberhub_entity::notification::Notification;

use crate::dto::request::NotificationListQuery;
use crate::dto::response::{ApiResponse, CountResponse, MarkAllReadResponse, MarkReadResponse};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// GET /api/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<NotificationListQuery>,
) -> Result<Json<ApiResponse<PageResponse<Notification>>>, ApiError> {
    let page = state
        .engine
        .notifications
        .list(auth.user_id, query.page_request(), query.unread_only)
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// GET /api/notifications/unread-count
pub async fn unread_count(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<CountResponse>>, ApiError> {
    let count = state.engine.notifications.unread_count(auth.user_id).await?;
    Ok(Json(ApiResponse::ok(CountResponse { count })))
}

/// PUT /api/notifications/{id}/read
///
/// Unknown or foreign ids succeed with `changed: false`.
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<NotificationId>,
) -> Result<Json<ApiResponse<MarkReadResponse>>, ApiError> {
    let changed = state.engine.dispatcher.mark_read(auth.user_id, id).await?;
    Ok(Json(ApiResponse::ok(MarkReadResponse { changed })))
}

/// PUT /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<MarkAllReadResponse>>, ApiError> {
    let marked = state.engine.dispatcher.mark_all_read(auth.user_id).await?;
    Ok(Json(ApiResponse::ok(MarkAllReadResponse { marked })))
}
