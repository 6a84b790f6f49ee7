use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::prelude::*;
use diesel::PgConnection;
use serde::Serialize;
use uuid::Uuid;

use guidelink_shared::errors::{AppError, AppResult, ErrorCode};
use guidelink_shared::types::auth::{AuthUser, UserRole};

use crate::domain::access;
use crate::domain::status::{MatchingStatus, RequestStatus, RequestType};
use crate::domain::ClosedReason;
use crate::models::{Matching, Request};
use crate::schema::{matchings, requests};
use crate::services::{chat_service, report_service, user_service};

#[derive(Debug, Serialize)]
pub struct MatchingSummary {
    pub id: Uuid,
    pub request_id: Uuid,
    pub status: MatchingStatus,
    pub request_type: RequestType,
    pub request_date: NaiveDate,
    pub request_time: NaiveTime,
    pub masked_address: String,
    pub destination: Option<String>,
    pub partner_id: Uuid,
    pub partner_name: String,
    pub matched_at: DateTime<Utc>,
    pub report_completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct MatchingDetail {
    #[serde(flatten)]
    pub summary: MatchingSummary,
    pub user_id: Uuid,
    pub guide_id: Uuid,
    /// Full address; only participants and admins reach this view.
    pub address: String,
    pub notes: Option<String>,
    pub report_id: Option<Uuid>,
    pub can_send: bool,
    pub chat_closed_reason: Option<ClosedReason>,
}

fn summarize(matching: &Matching, request: &Request, partner_id: Uuid, partner_name: String) -> AppResult<MatchingSummary> {
    Ok(MatchingSummary {
        id: matching.id,
        request_id: matching.request_id,
        status: matching.status()?,
        request_type: request.request_type()?,
        request_date: request.request_date,
        request_time: request.request_time,
        masked_address: request.masked_address.clone(),
        destination: request.destination.clone(),
        partner_id,
        partner_name,
        matched_at: matching.matched_at,
        report_completed_at: matching.report_completed_at,
    })
}

/// The other side of the matching from `viewer`'s point of view.
fn partner_of(matching: &Matching, viewer: Uuid) -> Uuid {
    if matching.user_id == viewer {
        matching.guide_id
    } else {
        matching.user_id
    }
}

pub fn find_matching(conn: &mut PgConnection, matching_id: Uuid) -> AppResult<Matching> {
    matchings::table
        .find(matching_id)
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::MatchingNotFound, "matching not found"))
}

pub fn lock_matching(conn: &mut PgConnection, matching_id: Uuid) -> AppResult<Matching> {
    matchings::table
        .find(matching_id)
        .for_update()
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::MatchingNotFound, "matching not found"))
}

/// Matchings the actor takes part in, newest first. `active_only` keeps
/// `matched` and `in_progress`.
pub fn list_for_participant(
    conn: &mut PgConnection,
    actor: &AuthUser,
    active_only: bool,
) -> AppResult<Vec<MatchingSummary>> {
    let mut query = matchings::table
        .inner_join(requests::table)
        .filter(matchings::user_id.eq(actor.id).or(matchings::guide_id.eq(actor.id)))
        .order(matchings::matched_at.desc())
        .select((matchings::all_columns, requests::all_columns))
        .into_boxed();
    if active_only {
        query = query.filter(matchings::status.eq_any([
            MatchingStatus::Matched.as_str(),
            MatchingStatus::InProgress.as_str(),
        ]));
    }
    let rows: Vec<(Matching, Request)> = query.load(conn)?;

    let partner_ids: Vec<Uuid> = rows.iter().map(|(m, _)| partner_of(m, actor.id)).collect();
    let names = user_service::names_by_id(conn, &partner_ids)?;

    rows.iter()
        .map(|(matching, request)| {
            let partner = partner_of(matching, actor.id);
            let name = names.get(&partner).cloned().unwrap_or_default();
            summarize(matching, request, partner, name)
        })
        .collect()
}

pub fn get_matching(conn: &mut PgConnection, actor: &AuthUser, matching_id: Uuid) -> AppResult<MatchingDetail> {
    let matching = find_matching(conn, matching_id)?;
    access::ensure_participant_or_admin(&matching, actor)?;

    let request: Request = requests::table.find(matching.request_id).first(conn)?;
    let partner = match actor.role {
        UserRole::Admin => matching.guide_id,
        _ => partner_of(&matching, actor.id),
    };
    let names = user_service::names_by_id(conn, &[partner])?;
    let window = chat_service::window_for(conn, &matching)?;
    let report_id = report_service::report_id_for_matching(conn, matching.id)?;

    Ok(MatchingDetail {
        summary: summarize(&matching, &request, partner, names.get(&partner).cloned().unwrap_or_default())?,
        user_id: matching.user_id,
        guide_id: matching.guide_id,
        address: request.address,
        notes: request.notes,
        report_id,
        can_send: window.is_open(),
        chat_closed_reason: window.closed_reason(),
    })
}

/// The guide marks the activity as started.
pub fn start_matching(conn: &mut PgConnection, actor: &AuthUser, matching_id: Uuid) -> AppResult<Matching> {
    conn.transaction(|conn| {
        let matching = lock_matching(conn, matching_id)?;
        if matching.guide_id != actor.id {
            return Err(AppError::new(
                ErrorCode::NotMatchingParticipant,
                "only the matched guide can start the activity",
            ));
        }

        let status = matching.status()?;
        if status != MatchingStatus::Matched {
            return Err(AppError::new(
                ErrorCode::InvalidMatchingTransition,
                format!("cannot start a matching in status {status}"),
            ));
        }

        let now = Utc::now();
        let matching: Matching = diesel::update(matchings::table.find(matching_id))
            .set((
                matchings::status.eq(MatchingStatus::InProgress.as_str()),
                matchings::updated_at.eq(now),
            ))
            .get_result(conn)?;

        diesel::update(requests::table.find(matching.request_id))
            .set((
                requests::status.eq(RequestStatus::InProgress.as_str()),
                requests::updated_at.eq(now),
            ))
            .execute(conn)?;

        tracing::info!(matching_id = %matching_id, guide_id = %actor.id, "activity started");
        Ok(matching)
    })
}

pub fn count_by_status(conn: &mut PgConnection) -> AppResult<Vec<(String, i64)>> {
    Ok(matchings::table
        .group_by(matchings::status)
        .select((matchings::status, diesel::dsl::count_star()))
        .load(conn)?)
}

/// Participant-scoped counts of active and completed matchings.
pub fn participant_counts(conn: &mut PgConnection, actor_id: Uuid) -> AppResult<(i64, i64)> {
    let rows: Vec<(String, i64)> = matchings::table
        .filter(matchings::user_id.eq(actor_id).or(matchings::guide_id.eq(actor_id)))
        .group_by(matchings::status)
        .select((matchings::status, diesel::dsl::count_star()))
        .load(conn)?;

    let mut active = 0;
    let mut completed = 0;
    for (status, count) in rows {
        match MatchingStatus::from_column(&status)? {
            s if s.is_active() => active += count,
            MatchingStatus::Completed => completed += count,
            _ => {}
        }
    }
    Ok((active, completed))
}
