use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use guidelink_shared::clients::db::checkout;
use guidelink_shared::errors::AppResult;
use guidelink_shared::types::auth::AuthUser;
use guidelink_shared::types::ApiResponse;

use crate::services::dashboard_service::{self, Dashboard};
use crate::AppState;

/// GET /api/dashboard
///
/// The payload shape follows the caller's role; see [`Dashboard`].
pub async fn dashboard(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Dashboard>>> {
    let mut conn = checkout(&state.db)?;
    let dashboard = dashboard_service::for_actor(&mut conn, &user, super::today())?;
    Ok(Json(ApiResponse::ok(dashboard)))
}
