//! Conversation and messaging handlers.
//!
//! Sends go through the messaging bridge so the append, the pushes and the
//! recipient notifications happen in one flow.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;

use memberhub_core::types::{ConversationId, PageResponse, UserId};
use memberhub_entity::conversation::Message;
use memberhub_realtime::bridge::SentMessage;

use crate::dto::request::{CreateGroupRequest, SendMessageRequest, validate};
use crate::dto::response::{
    ApiResponse, ConversationReadResponse, ConversationResponse, SentMessageResponse,
};
use crate::error::ApiError;
use crate::extractors::{AuthUser, PaginationParams};
use crate::state::AppState;

fn sent_response(sent: SentMessage, viewer: UserId) -> SentMessageResponse {
    SentMessageResponse {
        notified: sent.notifications.len(),
        conversation: ConversationResponse::for_viewer(sent.conversation, viewer),
        message: sent.message,
    }
}

/// GET /api/conversations
pub async fn list_conversations(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PageResponse<ConversationResponse>>>, ApiError> {
    let viewer = auth.user_id;
    let page = state
        .engine
        .ledger
        .list_for_user(viewer, params.into_page_request())
        .await?
        .map(|c| ConversationResponse::for_viewer(c, viewer));
    Ok(Json(ApiResponse::ok(page)))
}

/// POST /api/conversations
pub async fn create_group(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ConversationResponse>>), ApiError> {
    validate(&req)?;
    let conversation = state
        .engine
        .ledger
        .create_group(auth.user_id, req.participant_ids)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(ConversationResponse::for_viewer(
            conversation,
            auth.user_id,
        ))),
    ))
}

/// GET /api/conversations/{id}
pub async fn get_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<ConversationId>,
) -> Result<Json<ApiResponse<ConversationResponse>>, ApiError> {
    let conversation = state.engine.ledger.get(id, auth.user_id).await?;
    Ok(Json(ApiResponse::ok(ConversationResponse::for_viewer(
        conversation,
        auth.user_id,
    ))))
}

/// GET /api/conversations/{id}/messages
pub async fn list_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<ConversationId>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PageResponse<Message>>>, ApiError> {
    let page = state
        .engine
        .ledger
        .list_messages(id, auth.user_id, params.into_page_request())
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// POST /api/conversations/direct/{user_id}/messages
pub async fn send_direct(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(recipient): Path<UserId>,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SentMessageResponse>>), ApiError> {
    validate(&req)?;
    let sent = state
        .engine
        .bridge
        .send_direct(auth.user_id, recipient, &req.content)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(sent_response(sent, auth.user_id))),
    ))
}

/// POST /api/conversations/{id}/messages
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<ConversationId>,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SentMessageResponse>>), ApiError> {
    validate(&req)?;
    let sent = state
        .engine
        .bridge
        .send_to_conversation(id, auth.user_id, &req.content)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(sent_response(sent, auth.user_id))),
    ))
}

/// POST /api/conversations/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<ConversationId>,
) -> Result<Json<ApiResponse<ConversationReadResponse>>, ApiError> {
    let updated = state
        .engine
        .bridge
        .mark_conversation_read(id, auth.user_id)
        .await?
        .is_some();
    Ok(Json(ApiResponse::ok(ConversationReadResponse {
        conversation_id: id,
        updated,
    })))
}
