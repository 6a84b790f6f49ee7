use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use guidelink_shared::clients::db::checkout;
use guidelink_shared::errors::AppResult;
use guidelink_shared::middleware::GuideUser;
use guidelink_shared::types::auth::AuthUser;
use guidelink_shared::types::ApiResponse;

use crate::models::Matching;
use crate::services::matching_service::{self, MatchingDetail, MatchingSummary};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct MatchingListQuery {
    #[serde(default)]
    pub active: bool,
}

/// GET /api/matchings
pub async fn list_my_matchings(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<MatchingListQuery>,
) -> AppResult<Json<ApiResponse<Vec<MatchingSummary>>>> {
    let mut conn = checkout(&state.db)?;
    let matchings = matching_service::list_for_participant(&mut conn, &user, query.active)?;
    Ok(Json(ApiResponse::ok(matchings)))
}

/// GET /api/matchings/:id
pub async fn get_matching(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MatchingDetail>>> {
    let mut conn = checkout(&state.db)?;
    let matching = matching_service::get_matching(&mut conn, &user, id)?;
    Ok(Json(ApiResponse::ok(matching)))
}

/// POST /api/matchings/:id/start
pub async fn start_matching(
    GuideUser(guide): GuideUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Matching>>> {
    let mut conn = checkout(&state.db)?;
    let matching = matching_service::start_matching(&mut conn, &guide, id)?;
    Ok(Json(ApiResponse::ok(matching)))
}
