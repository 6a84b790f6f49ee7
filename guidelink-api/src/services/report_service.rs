use chrono::{NaiveDate, NaiveTime, Utc};
use diesel::prelude::*;
use diesel::pg::Pg;
use diesel::PgConnection;
use serde::Serialize;
use uuid::Uuid;

use guidelink_shared::errors::{AppError, AppResult, ErrorCode};
use guidelink_shared::types::auth::{AuthUser, UserRole};
use guidelink_shared::types::pagination::{Paginated, PaginationParams};

use crate::domain::report_workflow::{check_span, require_activity_time};
use crate::domain::status::{MatchingStatus, ReportStatus, RequestStatus, RequestType};
use crate::domain::usage::{self, UsageRecord, UsageStats};
use crate::domain::{access, ReportAction};
use crate::models::{NewReport, Report, ReportChanges};
use crate::schema::{matchings, reports, requests};
use crate::services::notification_service::{self, NotificationKind};
use crate::services::{matching_service, user_service};

#[derive(Debug, Serialize)]
pub struct ReportWithNames {
    #[serde(flatten)]
    pub report: Report,
    pub user_name: String,
    pub guide_name: String,
}

fn find_report(conn: &mut PgConnection, report_id: Uuid) -> AppResult<Report> {
    reports::table
        .find(report_id)
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::ReportNotFound, "report not found"))
}

fn lock_report(conn: &mut PgConnection, report_id: Uuid) -> AppResult<Report> {
    reports::table
        .find(report_id)
        .for_update()
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::ReportNotFound, "report not found"))
}

fn ensure_author(report: &Report, actor: &AuthUser) -> AppResult<()> {
    if report.guide_id != actor.id {
        return Err(AppError::new(
            ErrorCode::NotMatchingParticipant,
            "only the matched guide can change this report",
        ));
    }
    Ok(())
}

/// Reports follow their matching: once it is cancelled the report can no
/// longer move, and approval must not revive the matching or the request.
fn ensure_matching_active(conn: &mut PgConnection, matching_id: Uuid) -> AppResult<()> {
    let matching = matching_service::lock_matching(conn, matching_id)?;
    let status = matching.status()?;
    if !status.is_active() {
        return Err(AppError::new(
            ErrorCode::InvalidMatchingTransition,
            format!("matching is {status}; its report can no longer change"),
        ));
    }
    Ok(())
}

pub fn report_id_for_matching(conn: &mut PgConnection, matching_id: Uuid) -> AppResult<Option<Uuid>> {
    Ok(reports::table
        .filter(reports::matching_id.eq(matching_id))
        .select(reports::id)
        .first(conn)
        .optional()?)
}

/// The guide opens a draft for an active matching.
pub fn create_report(
    conn: &mut PgConnection,
    actor: &AuthUser,
    matching_id: Uuid,
    draft: ReportChanges,
) -> AppResult<Report> {
    check_span(draft.actual_start_time, draft.actual_end_time)?;

    conn.transaction(|conn| {
        let matching = matching_service::lock_matching(conn, matching_id)?;
        if matching.guide_id != actor.id {
            return Err(AppError::new(
                ErrorCode::NotMatchingParticipant,
                "only the matched guide can write the report",
            ));
        }
        if !matching.status()?.is_active() {
            return Err(AppError::new(
                ErrorCode::InvalidMatchingTransition,
                "reports can only be written for an active matching",
            ));
        }
        if report_id_for_matching(conn, matching_id)?.is_some() {
            return Err(AppError::new(ErrorCode::ReportAlreadyExists, "a report already exists for this matching"));
        }

        let report: Report = diesel::insert_into(reports::table)
            .values(&NewReport {
                matching_id,
                user_id: matching.user_id,
                guide_id: matching.guide_id,
                request_id: matching.request_id,
                actual_date: draft.actual_date,
                actual_start_time: draft.actual_start_time,
                actual_end_time: draft.actual_end_time,
                service_content: draft.service_content,
                report_content: draft.report_content,
            })
            .get_result(conn)?;

        tracing::info!(report_id = %report.id, matching_id = %matching_id, "report drafted");
        Ok(report)
    })
}

/// Own reports: guides see everything they wrote, users see reports once
/// submitted.
pub fn list_my_reports(conn: &mut PgConnection, actor: &AuthUser) -> AppResult<Vec<Report>> {
    let mut query = reports::table.order(reports::updated_at.desc()).into_boxed::<Pg>();
    query = match actor.role {
        UserRole::Guide => query.filter(reports::guide_id.eq(actor.id)),
        UserRole::User => query
            .filter(reports::user_id.eq(actor.id))
            .filter(reports::status.ne(ReportStatus::Draft.as_str())),
        UserRole::Admin => query,
    };
    Ok(query.load(conn)?)
}

pub fn get_report(conn: &mut PgConnection, actor: &AuthUser, report_id: Uuid) -> AppResult<Report> {
    let report = find_report(conn, report_id)?;
    if !actor.is_admin() {
        let matching = matching_service::find_matching(conn, report.matching_id)?;
        access::ensure_participant(&matching, actor)?;
    }
    Ok(report)
}

pub fn update_report(
    conn: &mut PgConnection,
    actor: &AuthUser,
    report_id: Uuid,
    changes: ReportChanges,
) -> AppResult<Report> {
    conn.transaction(|conn| {
        let report = lock_report(conn, report_id)?;
        ensure_author(&report, actor)?;
        report.status()?.apply(ReportAction::Edit)?;
        ensure_matching_active(conn, report.matching_id)?;

        check_span(
            changes.actual_start_time.or(report.actual_start_time),
            changes.actual_end_time.or(report.actual_end_time),
        )?;

        let report: Report = diesel::update(reports::table.find(report_id))
            .set((&changes, reports::updated_at.eq(Utc::now())))
            .get_result(conn)?;
        Ok(report)
    })
}

pub fn submit_report(conn: &mut PgConnection, actor: &AuthUser, report_id: Uuid) -> AppResult<Report> {
    conn.transaction(|conn| {
        let report = lock_report(conn, report_id)?;
        ensure_author(&report, actor)?;
        let next = report.status()?.apply(ReportAction::Submit)?;
        require_activity_time(report.actual_date, report.actual_start_time, report.actual_end_time)?;
        ensure_matching_active(conn, report.matching_id)?;

        let now = Utc::now();
        let report: Report = diesel::update(reports::table.find(report_id))
            .set((
                reports::status.eq(next.as_str()),
                reports::submitted_at.eq(Some(now)),
                reports::updated_at.eq(now),
            ))
            .get_result(conn)?;

        for admin_id in user_service::admin_ids(conn)? {
            notification_service::notify_about(
                conn,
                admin_id,
                NotificationKind::ReportSubmitted,
                "A guide submitted an activity report.",
                "report_id",
                report.id,
            )?;
        }

        tracing::info!(report_id = %report.id, guide_id = %actor.id, "report submitted");
        Ok(report)
    })
}

/// Approval is final: it completes the matching and the request, stamps
/// `report_completed_at` and thereby closes the chat.
pub fn approve_report(conn: &mut PgConnection, admin_id: Uuid, report_id: Uuid) -> AppResult<Report> {
    conn.transaction(|conn| {
        let report = lock_report(conn, report_id)?;
        let next = report.status()?.apply(ReportAction::Approve)?;
        ensure_matching_active(conn, report.matching_id)?;

        let now = Utc::now();
        let report: Report = diesel::update(reports::table.find(report_id))
            .set((
                reports::status.eq(next.as_str()),
                reports::approved_at.eq(Some(now)),
                reports::approved_by.eq(Some(admin_id)),
                reports::updated_at.eq(now),
            ))
            .get_result(conn)?;

        diesel::update(matchings::table.find(report.matching_id))
            .set((
                matchings::status.eq(MatchingStatus::Completed.as_str()),
                matchings::report_completed_at.eq(Some(now)),
                matchings::updated_at.eq(now),
            ))
            .execute(conn)?;

        diesel::update(requests::table.find(report.request_id))
            .set((
                requests::status.eq(RequestStatus::Completed.as_str()),
                requests::updated_at.eq(now),
            ))
            .execute(conn)?;

        for recipient in [report.guide_id, report.user_id] {
            notification_service::notify_about(
                conn,
                recipient,
                NotificationKind::ReportApproved,
                "The activity report was approved.",
                "report_id",
                report.id,
            )?;
        }

        tracing::info!(report_id = %report.id, matching_id = %report.matching_id, approved_by = %admin_id, "report approved");
        Ok(report)
    })
}

pub fn request_revision(conn: &mut PgConnection, admin_id: Uuid, report_id: Uuid, notes: &str) -> AppResult<Report> {
    conn.transaction(|conn| {
        let report = lock_report(conn, report_id)?;
        let next = report.status()?.apply(ReportAction::RequestRevision(notes))?;
        ensure_matching_active(conn, report.matching_id)?;

        let report: Report = diesel::update(reports::table.find(report_id))
            .set((
                reports::status.eq(next.as_str()),
                reports::revision_notes.eq(Some(notes.trim())),
                reports::updated_at.eq(Utc::now()),
            ))
            .get_result(conn)?;

        notification_service::notify_about(
            conn,
            report.guide_id,
            NotificationKind::RevisionRequested,
            format!("Revision requested: {}", notes.trim()),
            "report_id",
            report.id,
        )?;

        tracing::info!(report_id = %report.id, requested_by = %admin_id, "report revision requested");
        Ok(report)
    })
}

/// Admin listing; `approved` matches the legacy status spelling too.
pub fn list_for_admin(
    conn: &mut PgConnection,
    status: Option<ReportStatus>,
    params: &PaginationParams,
) -> AppResult<Paginated<ReportWithNames>> {
    let build = || {
        let query = reports::table.into_boxed::<Pg>();
        match status {
            Some(ReportStatus::AdminApproved) => {
                query.filter(reports::status.eq_any(ReportStatus::APPROVED_VALUES))
            }
            Some(other) => query.filter(reports::status.eq(other.as_str())),
            None => query,
        }
    };

    let total: i64 = build().count().get_result(conn)?;
    let rows: Vec<Report> = build()
        .order((reports::submitted_at.desc().nulls_last(), reports::created_at.desc()))
        .limit(params.limit() as i64)
        .offset(params.offset())
        .load(conn)?;

    let mut ids: Vec<Uuid> = rows.iter().flat_map(|r| [r.user_id, r.guide_id]).collect();
    ids.sort();
    ids.dedup();
    let names = user_service::names_by_id(conn, &ids)?;

    let items = rows
        .into_iter()
        .map(|report| ReportWithNames {
            user_name: names.get(&report.user_id).cloned().unwrap_or_default(),
            guide_name: names.get(&report.guide_id).cloned().unwrap_or_default(),
            report,
        })
        .collect();

    Ok(Paginated::new(items, total as u64, params))
}

pub fn count_by_status(conn: &mut PgConnection) -> AppResult<Vec<(String, i64)>> {
    Ok(reports::table
        .group_by(reports::status)
        .select((reports::status, diesel::dsl::count_star()))
        .load(conn)?)
}

/// Whose usage to total: the requester's or the guide's.
#[derive(Debug, Clone, Copy)]
pub enum UsageSubject {
    User(Uuid),
    Guide(Uuid),
}

pub fn usage_stats(conn: &mut PgConnection, subject: UsageSubject, today: NaiveDate) -> AppResult<UsageStats> {
    let mut query = reports::table
        .inner_join(requests::table)
        .filter(reports::status.eq_any(ReportStatus::APPROVED_VALUES))
        .filter(reports::actual_date.ge(usage::window_start(today)))
        .filter(reports::actual_start_time.is_not_null())
        .filter(reports::actual_end_time.is_not_null())
        .select((
            reports::actual_date,
            reports::actual_start_time,
            reports::actual_end_time,
            requests::request_type,
        ))
        .into_boxed::<Pg>();
    query = match subject {
        UsageSubject::User(id) => query.filter(reports::user_id.eq(id)),
        UsageSubject::Guide(id) => query.filter(reports::guide_id.eq(id)),
    };

    let rows: Vec<(Option<NaiveDate>, Option<NaiveTime>, Option<NaiveTime>, String)> = query.load(conn)?;

    let mut records = Vec::with_capacity(rows.len());
    for (date, start, end, request_type) in rows {
        if let (Some(date), Some(start), Some(end)) = (date, start, end) {
            records.push(UsageRecord {
                date,
                start,
                end,
                request_type: RequestType::from_column(&request_type)?,
            });
        }
    }

    Ok(usage::summarize(&records, today))
}

/// Counts by status for one guide's or one requester's reports.
pub fn counts_for(conn: &mut PgConnection, subject: UsageSubject) -> AppResult<Vec<(ReportStatus, i64)>> {
    let rows: Vec<(String, i64)> = match subject {
        UsageSubject::User(id) => reports::table
            .filter(reports::user_id.eq(id))
            .group_by(reports::status)
            .select((reports::status, diesel::dsl::count_star()))
            .load(conn)?,
        UsageSubject::Guide(id) => reports::table
            .filter(reports::guide_id.eq(id))
            .group_by(reports::status)
            .select((reports::status, diesel::dsl::count_star()))
            .load(conn)?,
    };

    let mut counts: Vec<(ReportStatus, i64)> = Vec::new();
    for (status, count) in rows {
        let status = ReportStatus::from_column(&status)?;
        match counts.iter_mut().find(|(s, _)| *s == status) {
            Some((_, total)) => *total += count,
            None => counts.push((status, count)),
        }
    }
    Ok(counts)
}

/// Reports in `statuses` for a subject, most recently touched first.
pub fn list_in_status(
    conn: &mut PgConnection,
    subject: UsageSubject,
    statuses: &[ReportStatus],
) -> AppResult<Vec<Report>> {
    let values: Vec<&str> = statuses.iter().map(ReportStatus::as_str).collect();
    let query = reports::table
        .filter(reports::status.eq_any(values))
        .order((reports::submitted_at.desc().nulls_last(), reports::updated_at.desc()))
        .into_boxed::<Pg>();
    let query = match subject {
        UsageSubject::User(id) => query.filter(reports::user_id.eq(id)),
        UsageSubject::Guide(id) => query.filter(reports::guide_id.eq(id)),
    };
    Ok(query.load(conn)?)
}
