use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use guidelink_shared::clients::db::checkout;
use guidelink_shared::errors::AppResult;
use guidelink_shared::types::auth::AuthUser;
use guidelink_shared::types::pagination::{Paginated, PaginationParams};
use guidelink_shared::types::ApiResponse;

use crate::models::Notification;
use crate::services::notification_service;
use crate::AppState;

pub async fn list_notifications(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<Notification>>>> {
    let mut conn = checkout(&state.db)?;
    let page = notification_service::list(&mut conn, user.id, &params)?;
    Ok(Json(ApiResponse::ok(page)))
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub count: i64,
}

pub async fn unread_count(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<UnreadCount>>> {
    let mut conn = checkout(&state.db)?;
    let count = notification_service::count_unread(&mut conn, user.id)?;
    Ok(Json(ApiResponse::ok(UnreadCount { count })))
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub updated: usize,
}

pub async fn mark_all_read(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<MarkedRead>>> {
    let mut conn = checkout(&state.db)?;
    let updated = notification_service::mark_all_read(&mut conn, user.id)?;
    Ok(Json(ApiResponse::ok(MarkedRead { updated })))
}

pub async fn mark_read(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Notification>>> {
    let mut conn = checkout(&state.db)?;
    let notification = notification_service::mark_read(&mut conn, id, user.id)?;
    Ok(Json(ApiResponse::ok(notification)))
}
