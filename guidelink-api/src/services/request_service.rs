use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::prelude::*;
use diesel::PgConnection;
use serde::Serialize;
use uuid::Uuid;

use guidelink_shared::errors::{AppError, AppResult, ErrorCode};
use guidelink_shared::types::auth::{AuthUser, UserRole};

use crate::domain::access;
use crate::domain::address::mask_address;
use crate::domain::status::{ApplicationStatus, MatchingStatus, RequestStatus, RequestType};
use crate::models::{
    GuideApplication, Matching, NewGuideApplication, NewMatching, NewRequest, Request,
};
use crate::schema::{guide_applications, matchings, requests, users};
use crate::services::notification_service::{self, NotificationKind};
use crate::services::user_service;

// --- Views ---

/// A request as shown to one particular actor; `address` is masked unless the
/// actor may see the full text.
#[derive(Debug, Serialize)]
pub struct RequestView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub request_type: RequestType,
    pub request_date: NaiveDate,
    pub request_time: NaiveTime,
    pub address: String,
    pub destination: Option<String>,
    pub notes: Option<String>,
    pub status: RequestStatus,
    pub matching_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl RequestView {
    pub fn for_actor(request: Request, matching: Option<&Matching>, actor: &AuthUser) -> AppResult<Self> {
        let request_type = request.request_type()?;
        let status = request.status()?;
        let address = if access::can_view_full_address(&request, matching, actor) {
            request.address
        } else {
            request.masked_address
        };
        Ok(Self {
            id: request.id,
            user_id: request.user_id,
            request_type,
            request_date: request.request_date,
            request_time: request.request_time,
            address,
            destination: request.destination,
            notes: request.notes,
            status,
            matching_id: matching.map(|m| m.id),
            created_at: request.created_at,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct OpenRequest {
    pub id: Uuid,
    pub request_type: RequestType,
    pub request_date: NaiveDate,
    pub request_time: NaiveTime,
    pub masked_address: String,
    pub destination: Option<String>,
    pub status: RequestStatus,
    pub already_applied: bool,
}

#[derive(Debug, Serialize)]
pub struct Applicant {
    pub application_id: Uuid,
    pub guide_id: Uuid,
    pub guide_name: String,
    pub status: ApplicationStatus,
    pub message: Option<String>,
    pub applied_at: DateTime<Utc>,
}

/// Result of a requester picking a guide.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Selection {
    Matched { matching: Matching },
    AwaitingApproval { application: GuideApplication },
}

// --- Creation ---

#[derive(Debug)]
pub struct RequestInput {
    pub request_type: RequestType,
    pub request_date: NaiveDate,
    pub request_time: NaiveTime,
    pub address: String,
    pub destination: Option<String>,
    pub notes: Option<String>,
}

/// Checks that need no database; run before a connection is taken.
pub fn validate_input(input: &RequestInput, today: NaiveDate) -> AppResult<()> {
    if input.request_date < today {
        return Err(AppError::new(
            ErrorCode::RequestDateInPast,
            "request date must be today or later",
        ));
    }
    if input.address.trim().is_empty() {
        return Err(AppError::new(ErrorCode::ValidationError, "address is required"));
    }
    Ok(())
}

pub fn create_request(conn: &mut PgConnection, user_id: Uuid, input: RequestInput) -> AppResult<Request> {
    let address = input.address.trim().to_string();
    let new_request = NewRequest {
        user_id,
        request_type: input.request_type.as_str().to_string(),
        request_date: input.request_date,
        request_time: input.request_time,
        masked_address: mask_address(&address),
        address,
        destination: input.destination,
        notes: input.notes,
    };

    let request: Request = diesel::insert_into(requests::table)
        .values(&new_request)
        .get_result(conn)?;

    tracing::info!(
        request_id = %request.id,
        user_id = %user_id,
        request_type = %request.request_type,
        "request created"
    );
    Ok(request)
}

// --- Reads ---

pub fn find_request(conn: &mut PgConnection, request_id: Uuid) -> AppResult<Request> {
    requests::table
        .find(request_id)
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::RequestNotFound, "request not found"))
}

fn lock_request(conn: &mut PgConnection, request_id: Uuid) -> AppResult<Request> {
    requests::table
        .find(request_id)
        .for_update()
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::RequestNotFound, "request not found"))
}

fn matching_for(conn: &mut PgConnection, request_id: Uuid) -> AppResult<Option<Matching>> {
    Ok(matchings::table
        .filter(matchings::request_id.eq(request_id))
        .first(conn)
        .optional()?)
}

pub fn list_my_requests(conn: &mut PgConnection, actor: &AuthUser) -> AppResult<Vec<RequestView>> {
    let rows: Vec<(Request, Option<Matching>)> = requests::table
        .left_join(matchings::table)
        .filter(requests::user_id.eq(actor.id))
        .order(requests::created_at.desc())
        .select((requests::all_columns, matchings::all_columns.nullable()))
        .load(conn)?;

    rows.into_iter()
        .map(|(request, matching)| RequestView::for_actor(request, matching.as_ref(), actor))
        .collect()
}

/// Requests a guide can still apply to, soonest first.
pub fn list_open_requests(conn: &mut PgConnection, guide_id: Uuid) -> AppResult<Vec<OpenRequest>> {
    let open: Vec<&str> = RequestStatus::ALL
        .iter()
        .filter(|s| s.accepts_applications())
        .map(RequestStatus::as_str)
        .collect();

    let rows: Vec<Request> = requests::table
        .filter(requests::status.eq_any(open))
        .order((requests::request_date.asc(), requests::request_time.asc()))
        .load(conn)?;

    let applied: Vec<Uuid> = guide_applications::table
        .filter(guide_applications::guide_id.eq(guide_id))
        .select(guide_applications::request_id)
        .load(conn)?;

    rows.into_iter()
        .map(|r| {
            Ok(OpenRequest {
                id: r.id,
                request_type: r.request_type()?,
                request_date: r.request_date,
                request_time: r.request_time,
                already_applied: applied.contains(&r.id),
                status: r.status()?,
                masked_address: r.masked_address,
                destination: r.destination,
            })
        })
        .collect()
}

/// Owner and admin always; a guide while the request is open, or once they
/// have applied or been matched.
pub fn get_request(conn: &mut PgConnection, actor: &AuthUser, request_id: Uuid) -> AppResult<RequestView> {
    let request = find_request(conn, request_id)?;
    let matching = matching_for(conn, request_id)?;

    let allowed = match actor.role {
        UserRole::Admin => true,
        UserRole::User => request.user_id == actor.id,
        UserRole::Guide => {
            request.status()?.accepts_applications()
                || matching.as_ref().is_some_and(|m| m.guide_id == actor.id)
                || has_applied(conn, request_id, actor.id)?
        }
    };
    if !allowed {
        return Err(AppError::forbidden("you cannot view this request"));
    }

    RequestView::for_actor(request, matching.as_ref(), actor)
}

fn has_applied(conn: &mut PgConnection, request_id: Uuid, guide_id: Uuid) -> AppResult<bool> {
    let count: i64 = guide_applications::table
        .filter(guide_applications::request_id.eq(request_id))
        .filter(guide_applications::guide_id.eq(guide_id))
        .count()
        .get_result(conn)?;
    Ok(count > 0)
}

pub fn list_applicants(conn: &mut PgConnection, actor: &AuthUser, request_id: Uuid) -> AppResult<Vec<Applicant>> {
    let request = find_request(conn, request_id)?;
    if !actor.is_admin() {
        access::ensure_request_owner(&request, actor)?;
    }

    let rows: Vec<(GuideApplication, String)> = guide_applications::table
        .inner_join(users::table)
        .filter(guide_applications::request_id.eq(request_id))
        .order(guide_applications::created_at.asc())
        .select((guide_applications::all_columns, users::name))
        .load(conn)?;

    rows.into_iter()
        .map(|(application, guide_name)| {
            Ok(Applicant {
                application_id: application.id,
                guide_id: application.guide_id,
                guide_name,
                status: application.status()?,
                message: application.message,
                applied_at: application.created_at,
            })
        })
        .collect()
}

// --- Applications ---

pub fn apply(
    conn: &mut PgConnection,
    guide_id: Uuid,
    request_id: Uuid,
    message: Option<String>,
) -> AppResult<GuideApplication> {
    conn.transaction(|conn| {
        let request = lock_request(conn, request_id)?;
        let status = request.status()?;
        if !status.accepts_applications() {
            return Err(AppError::new(
                ErrorCode::RequestNotOpen,
                format!("request is {status} and no longer accepts applications"),
            ));
        }
        if has_applied(conn, request_id, guide_id)? {
            return Err(AppError::new(ErrorCode::AlreadyApplied, "you have already applied to this request"));
        }

        let application: GuideApplication = diesel::insert_into(guide_applications::table)
            .values(&NewGuideApplication { request_id, guide_id, message })
            .get_result(conn)?;

        if status == RequestStatus::Pending {
            set_request_status(conn, request_id, RequestStatus::GuideAccepted)?;
        }

        notification_service::notify_about(
            conn,
            request.user_id,
            NotificationKind::ApplicationReceived,
            format!("A guide applied to your request for {}.", request.request_date),
            "request_id",
            request_id,
        )?;

        tracing::info!(request_id = %request_id, guide_id = %guide_id, "guide applied");
        Ok(application)
    })
}

fn set_request_status(conn: &mut PgConnection, request_id: Uuid, status: RequestStatus) -> AppResult<()> {
    diesel::update(requests::table.find(request_id))
        .set((
            requests::status.eq(status.as_str()),
            requests::updated_at.eq(Utc::now()),
        ))
        .execute(conn)?;
    Ok(())
}

/// The requester picks one applicant. With `auto_matching` the matching is
/// created at once; otherwise the application waits for an admin.
pub fn select_guide(
    conn: &mut PgConnection,
    actor: &AuthUser,
    request_id: Uuid,
    guide_id: Uuid,
    auto_matching: bool,
) -> AppResult<Selection> {
    conn.transaction(|conn| {
        let request = lock_request(conn, request_id)?;
        access::ensure_request_owner(&request, actor)?;
        ensure_unmatched(conn, request_id)?;

        let status = request.status()?;
        if !status.accepts_applications() {
            return Err(AppError::new(ErrorCode::RequestNotOpen, format!("request is {status}")));
        }

        let applications: Vec<GuideApplication> = guide_applications::table
            .filter(guide_applications::request_id.eq(request_id))
            .for_update()
            .load(conn)?;

        if applications.iter().any(|a| a.status == ApplicationStatus::Selected.as_str()) {
            return Err(AppError::new(
                ErrorCode::ApplicationNotPending,
                "a selection for this request is already awaiting approval",
            ));
        }

        let application = applications
            .into_iter()
            .find(|a| a.guide_id == guide_id)
            .ok_or_else(|| AppError::new(ErrorCode::ApplicationNotFound, "this guide has not applied"))?;
        if application.status()? != ApplicationStatus::Pending {
            return Err(AppError::new(ErrorCode::ApplicationNotPending, "application is no longer pending"));
        }

        if auto_matching {
            let matching = create_matching(conn, &request, &application)?;
            return Ok(Selection::Matched { matching });
        }

        let application: GuideApplication = diesel::update(guide_applications::table.find(application.id))
            .set((
                guide_applications::status.eq(ApplicationStatus::Selected.as_str()),
                guide_applications::updated_at.eq(Utc::now()),
            ))
            .get_result(conn)?;

        for admin_id in user_service::admin_ids(conn)? {
            notification_service::notify_about(
                conn,
                admin_id,
                NotificationKind::SelectionPending,
                "A guide selection is waiting for approval.",
                "application_id",
                application.id,
            )?;
        }

        tracing::info!(request_id = %request_id, guide_id = %guide_id, "guide selected, awaiting approval");
        Ok(Selection::AwaitingApproval { application })
    })
}

fn ensure_unmatched(conn: &mut PgConnection, request_id: Uuid) -> AppResult<()> {
    if matching_for(conn, request_id)?.is_some() {
        return Err(AppError::new(ErrorCode::AlreadyMatched, "request already has a matching"));
    }
    Ok(())
}

fn lock_selected_application(conn: &mut PgConnection, application_id: Uuid) -> AppResult<GuideApplication> {
    let application: GuideApplication = guide_applications::table
        .find(application_id)
        .for_update()
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::ApplicationNotFound, "application not found"))?;

    if application.status()? != ApplicationStatus::Selected {
        return Err(AppError::new(
            ErrorCode::ApplicationNotPending,
            "application is not awaiting approval",
        ));
    }
    Ok(application)
}

pub fn approve_selection(conn: &mut PgConnection, admin_id: Uuid, application_id: Uuid) -> AppResult<Matching> {
    conn.transaction(|conn| {
        let application = lock_selected_application(conn, application_id)?;
        let request = lock_request(conn, application.request_id)?;
        let matching = create_matching(conn, &request, &application)?;

        tracing::info!(application_id = %application_id, approved_by = %admin_id, "selection approved");
        Ok(matching)
    })
}

pub fn reject_selection(conn: &mut PgConnection, admin_id: Uuid, application_id: Uuid) -> AppResult<GuideApplication> {
    conn.transaction(|conn| {
        let application = lock_selected_application(conn, application_id)?;

        let application: GuideApplication = diesel::update(guide_applications::table.find(application.id))
            .set((
                guide_applications::status.eq(ApplicationStatus::Declined.as_str()),
                guide_applications::updated_at.eq(Utc::now()),
            ))
            .get_result(conn)?;

        notification_service::notify_about(
            conn,
            application.guide_id,
            NotificationKind::ApplicationDeclined,
            "Your application was not approved.",
            "request_id",
            application.request_id,
        )?;

        tracing::info!(application_id = %application_id, rejected_by = %admin_id, "selection rejected");
        Ok(application)
    })
}

/// Binds the request to the guide. Runs inside the caller's transaction.
fn create_matching(
    conn: &mut PgConnection,
    request: &Request,
    application: &GuideApplication,
) -> AppResult<Matching> {
    ensure_unmatched(conn, request.id)?;

    let matching: Matching = diesel::insert_into(matchings::table)
        .values(&NewMatching {
            request_id: request.id,
            user_id: request.user_id,
            guide_id: application.guide_id,
        })
        .get_result(conn)?;

    let now = Utc::now();
    diesel::update(guide_applications::table.find(application.id))
        .set((
            guide_applications::status.eq(ApplicationStatus::Matched.as_str()),
            guide_applications::updated_at.eq(now),
        ))
        .execute(conn)?;

    let declined: Vec<Uuid> = diesel::update(
        guide_applications::table
            .filter(guide_applications::request_id.eq(request.id))
            .filter(guide_applications::id.ne(application.id))
            .filter(guide_applications::status.eq_any([
                ApplicationStatus::Pending.as_str(),
                ApplicationStatus::Selected.as_str(),
            ])),
    )
    .set((
        guide_applications::status.eq(ApplicationStatus::Declined.as_str()),
        guide_applications::updated_at.eq(now),
    ))
    .returning(guide_applications::guide_id)
    .get_results(conn)?;

    set_request_status(conn, request.id, RequestStatus::Matched)?;

    for participant in [matching.user_id, matching.guide_id] {
        notification_service::notify_about(
            conn,
            participant,
            NotificationKind::MatchingCreated,
            format!("Matching confirmed for {} {}.", request.request_date, request.request_time),
            "matching_id",
            matching.id,
        )?;
    }
    for guide_id in declined {
        notification_service::notify_about(
            conn,
            guide_id,
            NotificationKind::ApplicationDeclined,
            "Another guide was selected for this request.",
            "request_id",
            request.id,
        )?;
    }

    tracing::info!(
        matching_id = %matching.id,
        request_id = %request.id,
        user_id = %matching.user_id,
        guide_id = %matching.guide_id,
        "matching created"
    );
    Ok(matching)
}

// --- Cancellation ---

/// Cancels the request and any matching, which closes its chat.
pub fn cancel_request(conn: &mut PgConnection, actor: &AuthUser, request_id: Uuid) -> AppResult<Request> {
    conn.transaction(|conn| {
        let request = lock_request(conn, request_id)?;
        access::ensure_request_owner(&request, actor)?;

        let status = request.status()?;
        if status.is_closed() {
            return Err(AppError::new(ErrorCode::RequestNotOpen, format!("request is already {status}")));
        }

        let now = Utc::now();
        let request: Request = diesel::update(requests::table.find(request_id))
            .set((
                requests::status.eq(RequestStatus::Cancelled.as_str()),
                requests::updated_at.eq(now),
            ))
            .get_result(conn)?;

        diesel::update(
            guide_applications::table
                .filter(guide_applications::request_id.eq(request_id))
                .filter(guide_applications::status.eq_any([
                    ApplicationStatus::Pending.as_str(),
                    ApplicationStatus::Selected.as_str(),
                ])),
        )
        .set((
            guide_applications::status.eq(ApplicationStatus::Declined.as_str()),
            guide_applications::updated_at.eq(now),
        ))
        .execute(conn)?;

        let cancelled: Option<Matching> = diesel::update(
            matchings::table
                .filter(matchings::request_id.eq(request_id))
                .filter(matchings::status.ne(MatchingStatus::Completed.as_str())),
        )
        .set((
            matchings::status.eq(MatchingStatus::Cancelled.as_str()),
            matchings::updated_at.eq(now),
        ))
        .get_result(conn)
        .optional()?;

        if let Some(matching) = cancelled {
            notification_service::notify_about(
                conn,
                matching.guide_id,
                NotificationKind::RequestCancelled,
                format!("The request for {} was cancelled.", request.request_date),
                "matching_id",
                matching.id,
            )?;
        }

        tracing::info!(request_id = %request_id, "request cancelled");
        Ok(request)
    })
}

pub fn count_by_status(conn: &mut PgConnection) -> AppResult<Vec<(String, i64)>> {
    Ok(requests::table
        .group_by(requests::status)
        .select((requests::status, diesel::dsl::count_star()))
        .load(conn)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(date: NaiveDate, address: &str) -> RequestInput {
        RequestInput {
            request_type: RequestType::Outing,
            request_date: date,
            request_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            address: address.into(),
            destination: Some("City hospital".into()),
            notes: None,
        }
    }

    #[test]
    fn past_dates_and_blank_addresses_are_rejected() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let yesterday = today.pred_opt().unwrap();

        assert!(validate_input(&input(today, "Shibuya 1-2"), today).is_ok());

        let err = validate_input(&input(yesterday, "Shibuya 1-2"), today).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::RequestDateInPast));

        let err = validate_input(&input(today, "   "), today).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::ValidationError));
    }

    #[test]
    fn view_masks_address_for_other_guides() {
        let owner = Uuid::new_v4();
        let request = Request {
            id: Uuid::new_v4(),
            user_id: owner,
            request_type: "home".into(),
            request_date: NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
            request_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            address: "Meguro 3-4-5".into(),
            masked_address: mask_address("Meguro 3-4-5"),
            destination: None,
            notes: None,
            status: "pending".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let guide = AuthUser { id: Uuid::new_v4(), role: UserRole::Guide, token_id: Uuid::new_v4() };
        let view = RequestView::for_actor(request.clone(), None, &guide).unwrap();
        assert_eq!(view.address, "Meguro***");
        assert_eq!(view.request_type, RequestType::Home);

        let me = AuthUser { id: owner, role: UserRole::User, token_id: Uuid::new_v4() };
        let view = RequestView::for_actor(request, None, &me).unwrap();
        assert_eq!(view.address, "Meguro 3-4-5");
    }
}
