use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use guidelink_shared::clients::db::checkout;
use guidelink_shared::errors::AppResult;
use guidelink_shared::types::auth::AuthUser;
use guidelink_shared::types::ApiResponse;

use crate::models::AnnouncementRead;
use crate::services::announcement_service::{self, AnnouncementView};
use crate::AppState;

/// GET /api/announcements
pub async fn list_announcements(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<AnnouncementView>>>> {
    let mut conn = checkout(&state.db)?;
    let items = announcement_service::list_for_user(&mut conn, user.id, user.role)?;
    Ok(Json(ApiResponse::ok(items)))
}

/// GET /api/announcements/unread
pub async fn list_unread(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<AnnouncementView>>>> {
    let mut conn = checkout(&state.db)?;
    let items = announcement_service::list_unread(&mut conn, user.id, user.role)?;
    Ok(Json(ApiResponse::ok(items)))
}

/// POST /api/announcements/:id/read
pub async fn mark_read(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<AnnouncementRead>>> {
    let mut conn = checkout(&state.db)?;
    let read = announcement_service::mark_read(&mut conn, user.id, user.role, id)?;
    Ok(Json(ApiResponse::ok(read)))
}
