//! Back-office endpoints. Every handler requires the admin role.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use guidelink_shared::clients::db::checkout;
use guidelink_shared::errors::{AppError, AppResult, ErrorCode};
use guidelink_shared::middleware::AdminUser;
use guidelink_shared::types::pagination::{Paginated, PaginationParams};
use guidelink_shared::types::ApiResponse;

use crate::domain::status::{Audience, ReportStatus};
use crate::models::{Announcement, GuideApplication, Matching, Report, User};
use crate::services::announcement_service::{self, AnnouncementInput, AuthoredAnnouncement};
use crate::services::report_service::{self, ReportWithNames};
use crate::services::user_service::{self, UserFilter};
use crate::services::request_service;
use crate::AppState;

// --- Users ---

pub async fn list_users(
    AdminUser(_admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Query(filter): Query<UserFilter>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<User>>>> {
    let mut conn = checkout(&state.db)?;
    let users = user_service::list_users(&mut conn, &filter, &params)?;
    Ok(Json(ApiResponse::ok(users)))
}

pub async fn approve_user(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<User>>> {
    let mut conn = checkout(&state.db)?;
    let user = user_service::approve_user(&mut conn, admin.id, id)?;
    Ok(Json(ApiResponse::ok_with_message(user, "account approved")))
}

// --- Reports ---

#[derive(Debug, Default, Deserialize)]
pub struct ReportFilter {
    pub status: Option<ReportStatus>,
}

pub async fn list_reports(
    AdminUser(_admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ReportFilter>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<ReportWithNames>>>> {
    let mut conn = checkout(&state.db)?;
    let reports = report_service::list_for_admin(&mut conn, filter.status, &params)?;
    Ok(Json(ApiResponse::ok(reports)))
}

pub async fn approve_report(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Report>>> {
    let mut conn = checkout(&state.db)?;
    let report = report_service::approve_report(&mut conn, admin.id, id)?;
    Ok(Json(ApiResponse::ok_with_message(report, "report approved")))
}

#[derive(Debug, Deserialize)]
pub struct RevisionBody {
    #[serde(default)]
    pub notes: String,
}

pub async fn request_revision(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<RevisionBody>,
) -> AppResult<Json<ApiResponse<Report>>> {
    let notes = body.notes.trim();
    if notes.is_empty() {
        return Err(AppError::new(
            ErrorCode::RevisionNotesRequired,
            "revision notes must describe what to fix",
        ));
    }

    let mut conn = checkout(&state.db)?;
    let report = report_service::request_revision(&mut conn, admin.id, id, notes)?;
    Ok(Json(ApiResponse::ok_with_message(report, "revision requested")))
}

// --- Guide selections awaiting approval ---

pub async fn approve_selection(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Matching>>> {
    let mut conn = checkout(&state.db)?;
    let matching = request_service::approve_selection(&mut conn, admin.id, id)?;
    Ok(Json(ApiResponse::ok_with_message(matching, "matching created")))
}

pub async fn reject_selection(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<GuideApplication>>> {
    let mut conn = checkout(&state.db)?;
    let application = request_service::reject_selection(&mut conn, admin.id, id)?;
    Ok(Json(ApiResponse::ok(application)))
}

// --- Announcements ---

#[derive(Debug, Deserialize, Validate)]
pub struct AnnouncementBody {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
    #[serde(default = "default_audience")]
    pub target_audience: Audience,
}

fn default_audience() -> Audience {
    Audience::All
}

impl AnnouncementBody {
    fn into_input(self) -> AppResult<AnnouncementInput> {
        self.validate()?;
        let input = AnnouncementInput {
            title: self.title,
            content: self.content,
            target_audience: self.target_audience,
        };
        announcement_service::validate_input(&input)?;
        Ok(input)
    }
}

pub async fn list_announcements(
    AdminUser(_admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<AuthoredAnnouncement>>>> {
    let mut conn = checkout(&state.db)?;
    let page = announcement_service::list_all(&mut conn, &params)?;
    Ok(Json(ApiResponse::ok(page)))
}

pub async fn create_announcement(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Json(body): Json<AnnouncementBody>,
) -> AppResult<Json<ApiResponse<Announcement>>> {
    let input = body.into_input()?;

    let mut conn = checkout(&state.db)?;
    let announcement = announcement_service::create(&mut conn, admin.id, input)?;
    Ok(Json(ApiResponse::ok(announcement)))
}

pub async fn update_announcement(
    AdminUser(_admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<AnnouncementBody>,
) -> AppResult<Json<ApiResponse<Announcement>>> {
    let input = body.into_input()?;

    let mut conn = checkout(&state.db)?;
    let announcement = announcement_service::update(&mut conn, id, input)?;
    Ok(Json(ApiResponse::ok(announcement)))
}

pub async fn delete_announcement(
    AdminUser(_admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    let mut conn = checkout(&state.db)?;
    announcement_service::delete(&mut conn, id)?;
    Ok(Json(ApiResponse::message("announcement deleted")))
}
