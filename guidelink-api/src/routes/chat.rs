use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use guidelink_shared::clients::db::checkout;
use guidelink_shared::errors::AppResult;
use guidelink_shared::types::auth::AuthUser;
use guidelink_shared::types::ApiResponse;

use crate::models::ChatMessage;
use crate::services::chat_service::{self, ChatHistory, MessageBody};
use crate::AppState;

// --- GET /api/chat/:matching_id/messages ---

pub async fn list_messages(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(matching_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ChatHistory>>> {
    let mut conn = checkout(&state.db)?;
    let history = chat_service::list_messages(&mut conn, &user, matching_id)?;
    Ok(Json(ApiResponse::ok(history)))
}

// --- POST /api/chat/:matching_id/messages ---

#[derive(Debug, Deserialize)]
pub struct SendMessageBody {
    pub message: String,
}

pub async fn send_message(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(matching_id): Path<Uuid>,
    Json(body): Json<SendMessageBody>,
) -> AppResult<Json<ApiResponse<ChatMessage>>> {
    let body = MessageBody::parse(&body.message)?;

    let mut conn = checkout(&state.db)?;
    let message = chat_service::send_message(&mut conn, &user, matching_id, &body)?;
    Ok(Json(ApiResponse::ok(message)))
}

// --- GET /api/chat/unread-count ---

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub count: i64,
}

pub async fn unread_count(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<UnreadCount>>> {
    let mut conn = checkout(&state.db)?;
    let count = chat_service::unread_count(&mut conn, user.id)?;
    Ok(Json(ApiResponse::ok(UnreadCount { count })))
}
