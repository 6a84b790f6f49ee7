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

use crate::domain::report_workflow::check_span;
use crate::domain::usage::UsageStats;
use crate::models::{Report, ReportChanges};
use crate::services::report_service::{self, UsageSubject};
use crate::AppState;

/// Editable report fields; absent keys leave the stored value alone.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ReportFields {
    pub actual_date: Option<NaiveDate>,
    pub actual_start_time: Option<NaiveTime>,
    pub actual_end_time: Option<NaiveTime>,
    #[validate(length(max = 5000))]
    pub service_content: Option<String>,
    #[validate(length(max = 5000))]
    pub report_content: Option<String>,
}

impl ReportFields {
    fn into_changes(self) -> ReportChanges {
        ReportChanges {
            actual_date: self.actual_date,
            actual_start_time: self.actual_start_time,
            actual_end_time: self.actual_end_time,
            service_content: self.service_content,
            report_content: self.report_content,
        }
    }
}

// --- POST /api/reports ---

#[derive(Debug, Deserialize)]
pub struct CreateReportBody {
    pub matching_id: Uuid,
    #[serde(flatten)]
    pub fields: ReportFields,
}

pub async fn create_report(
    GuideUser(guide): GuideUser,
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateReportBody>,
) -> AppResult<Json<ApiResponse<Report>>> {
    body.fields.validate()?;
    check_span(body.fields.actual_start_time, body.fields.actual_end_time)?;

    let mut conn = checkout(&state.db)?;
    let report =
        report_service::create_report(&mut conn, &guide, body.matching_id, body.fields.into_changes())?;
    Ok(Json(ApiResponse::ok(report)))
}

// --- GET /api/reports ---

pub async fn list_my_reports(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<Report>>>> {
    let mut conn = checkout(&state.db)?;
    let reports = report_service::list_my_reports(&mut conn, &user)?;
    Ok(Json(ApiResponse::ok(reports)))
}

// --- GET /api/reports/:id ---

pub async fn get_report(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Report>>> {
    let mut conn = checkout(&state.db)?;
    let report = report_service::get_report(&mut conn, &user, id)?;
    Ok(Json(ApiResponse::ok(report)))
}

// --- PUT /api/reports/:id ---

pub async fn update_report(
    GuideUser(guide): GuideUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(fields): Json<ReportFields>,
) -> AppResult<Json<ApiResponse<Report>>> {
    fields.validate()?;
    check_span(fields.actual_start_time, fields.actual_end_time)?;

    let mut conn = checkout(&state.db)?;
    let report = report_service::update_report(&mut conn, &guide, id, fields.into_changes())?;
    Ok(Json(ApiResponse::ok(report)))
}

// --- POST /api/reports/:id/submit ---

pub async fn submit_report(
    GuideUser(guide): GuideUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Report>>> {
    let mut conn = checkout(&state.db)?;
    let report = report_service::submit_report(&mut conn, &guide, id)?;
    Ok(Json(ApiResponse::ok_with_message(report, "report submitted for review")))
}

// --- GET /api/reports/usage-stats, /api/reports/guide-stats ---

pub async fn usage_stats(
    RequesterUser(user): RequesterUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<UsageStats>>> {
    let mut conn = checkout(&state.db)?;
    let stats = report_service::usage_stats(&mut conn, UsageSubject::User(user.id), super::today())?;
    Ok(Json(ApiResponse::ok(stats)))
}

pub async fn guide_stats(
    GuideUser(guide): GuideUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<UsageStats>>> {
    let mut conn = checkout(&state.db)?;
    let stats = report_service::usage_stats(&mut conn, UsageSubject::Guide(guide.id), super::today())?;
    Ok(Json(ApiResponse::ok(stats)))
}
