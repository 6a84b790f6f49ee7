use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use guidelink_shared::clients::db::checkout;
use guidelink_shared::errors::AppResult;
use guidelink_shared::middleware::{GuideUser, RequesterUser};
use guidelink_shared::types::auth::AuthUser;
use guidelink_shared::types::ApiResponse;

use crate::domain::status::RequestType;
use crate::models::{GuideApplication, Request};
use crate::services::request_service::{self, Applicant, OpenRequest, RequestInput, RequestView, Selection};
use crate::AppState;

// --- POST /api/requests ---

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRequestBody {
    pub request_type: RequestType,
    pub request_date: NaiveDate,
    pub request_time: NaiveTime,
    #[validate(length(min = 1, max = 500, message = "address must be 1-500 characters"))]
    pub address: String,
    #[validate(length(max = 500))]
    pub destination: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

pub async fn create_request(
    RequesterUser(user): RequesterUser,
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateRequestBody>,
) -> AppResult<Json<ApiResponse<Request>>> {
    body.validate()?;

    let input = RequestInput {
        request_type: body.request_type,
        request_date: body.request_date,
        request_time: body.request_time,
        address: body.address,
        destination: body.destination,
        notes: body.notes,
    };
    request_service::validate_input(&input, super::today())?;

    let mut conn = checkout(&state.db)?;
    let request = request_service::create_request(&mut conn, user.id, input)?;
    Ok(Json(ApiResponse::ok(request)))
}

// --- GET /api/requests ---

pub async fn list_my_requests(
    RequesterUser(user): RequesterUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<RequestView>>>> {
    let mut conn = checkout(&state.db)?;
    let requests = request_service::list_my_requests(&mut conn, &user)?;
    Ok(Json(ApiResponse::ok(requests)))
}

// --- GET /api/requests/open ---

pub async fn list_open_requests(
    GuideUser(guide): GuideUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<OpenRequest>>>> {
    let mut conn = checkout(&state.db)?;
    let requests = request_service::list_open_requests(&mut conn, guide.id)?;
    Ok(Json(ApiResponse::ok(requests)))
}

// --- GET /api/requests/:id ---

pub async fn get_request(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<RequestView>>> {
    let mut conn = checkout(&state.db)?;
    let request = request_service::get_request(&mut conn, &user, id)?;
    Ok(Json(ApiResponse::ok(request)))
}

// --- POST /api/requests/:id/cancel ---

pub async fn cancel_request(
    RequesterUser(user): RequesterUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Request>>> {
    let mut conn = checkout(&state.db)?;
    let request = request_service::cancel_request(&mut conn, &user, id)?;
    Ok(Json(ApiResponse::ok_with_message(request, "request cancelled")))
}

// --- POST /api/requests/:id/apply ---

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ApplyBody {
    #[validate(length(max = 1000))]
    pub message: Option<String>,
}

pub async fn apply(
    GuideUser(guide): GuideUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    body: Option<Json<ApplyBody>>,
) -> AppResult<Json<ApiResponse<GuideApplication>>> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    body.validate()?;

    let mut conn = checkout(&state.db)?;
    let application = request_service::apply(&mut conn, guide.id, id, body.message)?;
    Ok(Json(ApiResponse::ok(application)))
}

// --- GET /api/requests/:id/applicants ---

pub async fn list_applicants(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<Applicant>>>> {
    let mut conn = checkout(&state.db)?;
    let applicants = request_service::list_applicants(&mut conn, &user, id)?;
    Ok(Json(ApiResponse::ok(applicants)))
}

// --- POST /api/requests/:id/select-guide ---

#[derive(Debug, Deserialize)]
pub struct SelectGuideBody {
    pub guide_id: Uuid,
}

pub async fn select_guide(
    RequesterUser(user): RequesterUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<SelectGuideBody>,
) -> AppResult<Json<ApiResponse<Selection>>> {
    let mut conn = checkout(&state.db)?;
    let selection =
        request_service::select_guide(&mut conn, &user, id, body.guide_id, state.config.auto_matching)?;
    Ok(Json(ApiResponse::ok(selection)))
}
