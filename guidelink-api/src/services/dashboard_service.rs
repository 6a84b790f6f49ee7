//! Read-only projections for the per-role home screens.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::PgConnection;
use serde::Serialize;

use guidelink_shared::errors::AppResult;
use guidelink_shared::types::auth::{AuthUser, UserRole};

use crate::domain::status::{ApplicationStatus, ReportStatus, RequestStatus};
use crate::domain::usage::UsageStats;
use crate::models::{Notification, Report};
use crate::schema::{guide_applications, requests};
use crate::services::announcement_service::{self, AnnouncementView};
use crate::services::matching_service::{self, MatchingSummary};
use crate::services::report_service::{self, UsageSubject};
use crate::services::{notification_service, request_service, user_service};

const RECENT_NOTIFICATIONS: i64 = 5;

#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Dashboard {
    User(UserDashboard),
    Guide(GuideDashboard),
    Admin(AdminDashboard),
}

#[derive(Debug, Serialize)]
pub struct Inbox {
    pub notifications: Vec<Notification>,
    pub unread_announcements: Vec<AnnouncementView>,
}

#[derive(Debug, Serialize)]
pub struct UserStats {
    pub requests: i64,
    pub active_matchings: i64,
    pub completed_matchings: i64,
    pub pending_reports: i64,
}

#[derive(Debug, Serialize)]
pub struct UserDashboard {
    pub stats: UserStats,
    pub active_matchings: Vec<MatchingSummary>,
    pub reports_awaiting_action: Vec<Report>,
    pub usage: UsageStats,
    #[serde(flatten)]
    pub inbox: Inbox,
}

#[derive(Debug, Serialize)]
pub struct GuideStats {
    pub available_requests: i64,
    pub active_matchings: i64,
    pub completed_matchings: i64,
    pub pending_reports: i64,
    pub total_reports: i64,
}

#[derive(Debug, Serialize)]
pub struct GuideDashboard {
    pub stats: GuideStats,
    pub active_matchings: Vec<MatchingSummary>,
    pub revision_requested_reports: Vec<Report>,
    pub usage: UsageStats,
    #[serde(flatten)]
    pub inbox: Inbox,
}

#[derive(Debug, Serialize)]
pub struct AdminDashboard {
    pub users_awaiting_approval: i64,
    pub requests_by_status: BTreeMap<String, i64>,
    pub matchings_by_status: BTreeMap<String, i64>,
    pub reports_by_status: BTreeMap<String, i64>,
    pub selections_awaiting_approval: i64,
    #[serde(flatten)]
    pub inbox: Inbox,
}

pub fn for_actor(conn: &mut PgConnection, actor: &AuthUser, today: NaiveDate) -> AppResult<Dashboard> {
    let dashboard = match actor.role {
        UserRole::User => Dashboard::User(user_dashboard(conn, actor, today)?),
        UserRole::Guide => Dashboard::Guide(guide_dashboard(conn, actor, today)?),
        UserRole::Admin => Dashboard::Admin(admin_dashboard(conn, actor)?),
    };
    Ok(dashboard)
}

fn inbox(conn: &mut PgConnection, actor: &AuthUser) -> AppResult<Inbox> {
    Ok(Inbox {
        notifications: notification_service::latest_unread(conn, actor.id, RECENT_NOTIFICATIONS)?,
        unread_announcements: announcement_service::list_unread(conn, actor.id, actor.role)?,
    })
}

fn count_of(counts: &[(ReportStatus, i64)], wanted: &[ReportStatus]) -> i64 {
    counts
        .iter()
        .filter(|(status, _)| wanted.contains(status))
        .map(|(_, n)| n)
        .sum()
}

fn user_dashboard(conn: &mut PgConnection, actor: &AuthUser, today: NaiveDate) -> AppResult<UserDashboard> {
    let requests: i64 = requests::table
        .filter(requests::user_id.eq(actor.id))
        .count()
        .get_result(conn)?;
    let (active, completed) = matching_service::participant_counts(conn, actor.id)?;

    let subject = UsageSubject::User(actor.id);
    let report_counts = report_service::counts_for(conn, subject)?;

    // Revision requests first, then submissions, newest submission first.
    let mut awaiting = report_service::list_in_status(conn, subject, &[ReportStatus::RevisionRequested])?;
    awaiting.extend(report_service::list_in_status(conn, subject, &[ReportStatus::Submitted])?);

    Ok(UserDashboard {
        stats: UserStats {
            requests,
            active_matchings: active,
            completed_matchings: completed,
            pending_reports: count_of(&report_counts, &[ReportStatus::Submitted]),
        },
        active_matchings: matching_service::list_for_participant(conn, actor, true)?,
        reports_awaiting_action: awaiting,
        usage: report_service::usage_stats(conn, subject, today)?,
        inbox: inbox(conn, actor)?,
    })
}

fn guide_dashboard(conn: &mut PgConnection, actor: &AuthUser, today: NaiveDate) -> AppResult<GuideDashboard> {
    let available: i64 = requests::table
        .filter(requests::status.eq(RequestStatus::Pending.as_str()))
        .count()
        .get_result(conn)?;
    let (active, completed) = matching_service::participant_counts(conn, actor.id)?;

    let subject = UsageSubject::Guide(actor.id);
    let report_counts = report_service::counts_for(conn, subject)?;

    Ok(GuideDashboard {
        stats: GuideStats {
            available_requests: available,
            active_matchings: active,
            completed_matchings: completed,
            pending_reports: count_of(
                &report_counts,
                &[ReportStatus::Draft, ReportStatus::RevisionRequested],
            ),
            total_reports: report_counts.iter().map(|(_, n)| n).sum(),
        },
        active_matchings: matching_service::list_for_participant(conn, actor, true)?,
        revision_requested_reports: report_service::list_in_status(
            conn,
            subject,
            &[ReportStatus::RevisionRequested],
        )?,
        usage: report_service::usage_stats(conn, subject, today)?,
        inbox: inbox(conn, actor)?,
    })
}

/// Folds raw status counts; the legacy `approved` spelling is merged into
/// `admin_approved`.
fn by_status(rows: Vec<(String, i64)>) -> BTreeMap<String, i64> {
    let mut map = BTreeMap::new();
    for (status, count) in rows {
        let key = match status.parse::<ReportStatus>() {
            Ok(ReportStatus::AdminApproved) => ReportStatus::AdminApproved.as_str().to_string(),
            _ => status,
        };
        *map.entry(key).or_insert(0) += count;
    }
    map
}

fn admin_dashboard(conn: &mut PgConnection, actor: &AuthUser) -> AppResult<AdminDashboard> {
    let selections: i64 = guide_applications::table
        .filter(guide_applications::status.eq(ApplicationStatus::Selected.as_str()))
        .count()
        .get_result(conn)?;

    Ok(AdminDashboard {
        users_awaiting_approval: user_service::count_pending_approval(conn)?,
        requests_by_status: by_status(request_service::count_by_status(conn)?),
        matchings_by_status: by_status(matching_service::count_by_status(conn)?),
        reports_by_status: by_status(report_service::count_by_status(conn)?),
        selections_awaiting_approval: selections,
        inbox: inbox(conn, actor)?,
    })
}
