//! End-to-end service scenarios against a real PostgreSQL database.
//!
//! Set `GUIDELINK_TEST_DATABASE_URL` to run them; every test works inside a
//! transaction that is never committed.

use std::sync::Once;

use chrono::{Duration, Local, NaiveTime};
use diesel::prelude::*;
use diesel::PgConnection;
use uuid::Uuid;

use guidelink_api::domain::status::{Audience, MatchingStatus, ReportStatus, RequestStatus, RequestType};
use guidelink_api::domain::ClosedReason;
use guidelink_api::models::{Matching, Report, ReportChanges, Request, User};
use guidelink_api::run_migrations;
use guidelink_api::schema::{announcement_reads, matchings};
use guidelink_api::services::announcement_service::{self, AnnouncementInput};
use guidelink_api::services::chat_service::{self, MessageBody};
use guidelink_api::services::request_service::{self, RequestInput, Selection};
use guidelink_api::services::{auth_service, matching_service, report_service, user_service};
use guidelink_shared::errors::ErrorCode;
use guidelink_shared::types::auth::{AuthUser, UserRole};

static MIGRATE: Once = Once::new();

fn connect() -> Option<PgConnection> {
    let url = std::env::var("GUIDELINK_TEST_DATABASE_URL").ok()?;
    MIGRATE.call_once(|| {
        let mut conn = PgConnection::establish(&url).expect("connect for migrations");
        run_migrations(&mut conn).expect("migrations");
    });
    let mut conn = PgConnection::establish(&url).expect("connect");
    conn.begin_test_transaction().expect("test transaction");
    Some(conn)
}

fn actor(user: &User, role: UserRole) -> AuthUser {
    AuthUser { id: user.id, role, token_id: Uuid::now_v7() }
}

fn admin(conn: &mut PgConnection) -> AuthUser {
    let email = format!("admin-{}@example.com", Uuid::now_v7());
    let user = auth_service::seed_admin(conn, &email, "admin-pass-1", "Admin")
        .unwrap()
        .expect("fresh admin");
    actor(&user, UserRole::Admin)
}

fn approved(conn: &mut PgConnection, admin: &AuthUser, role: UserRole, name: &str) -> AuthUser {
    let user = auth_service::register(
        conn,
        auth_service::Registration {
            email: format!("{}-{}@example.com", name.to_lowercase(), Uuid::now_v7()),
            password: "password123".into(),
            role,
            name: name.into(),
            name_kana: None,
            phone: None,
            address: None,
            birth_date: None,
            gender: None,
        },
    )
    .unwrap();
    user_service::approve_user(conn, admin.id, user.id).unwrap();
    actor(&user, role)
}

struct Scene {
    admin: AuthUser,
    user: AuthUser,
    guide: AuthUser,
}

fn scene(conn: &mut PgConnection) -> Scene {
    let admin = admin(conn);
    let user = approved(conn, &admin, UserRole::User, "Hanako");
    let guide = approved(conn, &admin, UserRole::Guide, "Taro");
    Scene { admin, user, guide }
}

fn outing_request(conn: &mut PgConnection, scene: &Scene) -> Request {
    request_service::create_request(
        conn,
        scene.user.id,
        RequestInput {
            request_type: RequestType::Outing,
            request_date: Local::now().date_naive() + Duration::days(3),
            request_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            address: "Tokyo Shibuya 1-2-3".into(),
            destination: Some("City hall".into()),
            notes: None,
        },
    )
    .unwrap()
}

fn choose_guide(conn: &mut PgConnection, scene: &Scene, request: &Request) -> Matching {
    match request_service::select_guide(conn, &scene.user, request.id, scene.guide.id, true).unwrap() {
        Selection::Matched { matching } => matching,
        other => panic!("expected a matching, got {other:?}"),
    }
}

fn matched(conn: &mut PgConnection, scene: &Scene) -> Matching {
    let request = outing_request(conn, scene);
    request_service::apply(conn, scene.guide.id, request.id, Some("Happy to help".into())).unwrap();
    choose_guide(conn, scene, &request)
}

fn times(start: (u32, u32), end: (u32, u32)) -> ReportChanges {
    ReportChanges {
        actual_date: Some(Local::now().date_naive()),
        actual_start_time: NaiveTime::from_hms_opt(start.0, start.1, 0),
        actual_end_time: NaiveTime::from_hms_opt(end.0, end.1, 0),
        service_content: Some("Accompanied to city hall".into()),
        report_content: Some("All went smoothly".into()),
    }
}

fn submitted_report(conn: &mut PgConnection, scene: &Scene, matching: &Matching) -> Report {
    let report = report_service::create_report(conn, &scene.guide, matching.id, times((10, 0), (11, 45))).unwrap();
    report_service::submit_report(conn, &scene.guide, report.id).unwrap()
}

#[test]
fn outing_runs_from_request_to_approved_report() {
    let Some(mut conn) = connect() else { return };
    let conn = &mut conn;
    let scene = scene(conn);

    let matching = matched(conn, &scene);
    assert_eq!(matching.status().unwrap(), MatchingStatus::Matched);

    let request = request_service::get_request(conn, &scene.guide, matching.request_id).unwrap();
    assert_eq!(request.status, RequestStatus::Matched);
    assert_eq!(request.address, "Tokyo Shibuya 1-2-3");

    matching_service::start_matching(conn, &scene.guide, matching.id).unwrap();

    let hello = MessageBody::parse("See you at the station").unwrap();
    chat_service::send_message(conn, &scene.user, matching.id, &hello).unwrap();
    assert_eq!(chat_service::unread_count(conn, scene.guide.id).unwrap(), 1);

    let report = submitted_report(conn, &scene, &matching);
    assert_eq!(report.status().unwrap(), ReportStatus::Submitted);

    let approved = report_service::approve_report(conn, scene.admin.id, report.id).unwrap();
    assert_eq!(approved.status().unwrap(), ReportStatus::AdminApproved);
    assert_eq!(approved.approved_by, Some(scene.admin.id));

    let detail = matching_service::get_matching(conn, &scene.user, matching.id).unwrap();
    assert!(!detail.can_send);

    let reply = MessageBody::parse("Thank you!").unwrap();
    let err = chat_service::send_message(conn, &scene.guide, matching.id, &reply).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::ChatClosed));

    let history = chat_service::list_messages(conn, &scene.guide, matching.id).unwrap();
    assert_eq!(history.messages.len(), 1);
    assert_eq!(history.messages[0].sender_role, UserRole::User);
    assert!(!history.messages[0].is_mine);
    assert!(!history.can_send);
    assert_eq!(history.closed_reason, Some(ClosedReason::ReportApproved));

    let stats = report_service::usage_stats(
        conn,
        report_service::UsageSubject::User(scene.user.id),
        Local::now().date_naive(),
    )
    .unwrap();
    assert_eq!(stats.current_month.total_minutes, 105);
    assert_eq!(stats.current_month.by_type.outing, 1.8);
}

#[test]
fn revision_loop_returns_report_to_guide() {
    let Some(mut conn) = connect() else { return };
    let conn = &mut conn;
    let scene = scene(conn);
    let matching = matched(conn, &scene);
    let report = submitted_report(conn, &scene, &matching);

    let err = report_service::request_revision(conn, scene.admin.id, report.id, "   ").unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::RevisionNotesRequired));

    let revised = report_service::request_revision(conn, scene.admin.id, report.id, "time incorrect").unwrap();
    assert_eq!(revised.status().unwrap(), ReportStatus::RevisionRequested);
    assert_eq!(revised.revision_notes.as_deref(), Some("time incorrect"));

    // Chat stays open while the report is under revision.
    let note = MessageBody::parse("Was it 11:30?").unwrap();
    chat_service::send_message(conn, &scene.guide, matching.id, &note).unwrap();

    report_service::update_report(conn, &scene.guide, report.id, times((10, 0), (11, 30))).unwrap();
    let resubmitted = report_service::submit_report(conn, &scene.guide, report.id).unwrap();
    assert_eq!(resubmitted.status().unwrap(), ReportStatus::Submitted);

    report_service::approve_report(conn, scene.admin.id, report.id).unwrap();
    let err = report_service::update_report(conn, &scene.guide, report.id, ReportChanges::default()).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::ReportFinalized));
}

#[test]
fn cancelled_request_closes_the_chat() {
    let Some(mut conn) = connect() else { return };
    let conn = &mut conn;
    let scene = scene(conn);
    let matching = matched(conn, &scene);

    let cancelled = request_service::cancel_request(conn, &scene.user, matching.request_id).unwrap();
    assert_eq!(cancelled.status().unwrap(), RequestStatus::Cancelled);

    let body = MessageBody::parse("Are we still on?").unwrap();
    let err = chat_service::send_message(conn, &scene.guide, matching.id, &body).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::ChatClosed));

    let history = chat_service::list_messages(conn, &scene.user, matching.id).unwrap();
    assert_eq!(history.closed_reason, Some(ClosedReason::Cancelled));
}

#[test]
fn outsiders_cannot_reach_a_matching() {
    let Some(mut conn) = connect() else { return };
    let conn = &mut conn;
    let scene = scene(conn);

    let request = outing_request(conn, &scene);
    let rival = approved(conn, &scene.admin, UserRole::Guide, "Shiro");
    request_service::apply(conn, rival.id, request.id, None).unwrap();
    request_service::apply(conn, scene.guide.id, request.id, None).unwrap();
    let matching = choose_guide(conn, &scene, &request);
    let stranger = approved(conn, &scene.admin, UserRole::Guide, "Jiro");

    let err = matching_service::get_matching(conn, &stranger, matching.id).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::NotMatchingParticipant));

    let err = chat_service::list_messages(conn, &stranger, matching.id).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::NotMatchingParticipant));

    let err = request_service::get_request(conn, &stranger, request.id).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::Forbidden));

    // A declined applicant still sees the request, but only the masked address.
    let view = request_service::get_request(conn, &rival, request.id).unwrap();
    assert_eq!(view.address, "Tokyo Shibuya***");
    let err = chat_service::list_messages(conn, &rival, matching.id).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::NotMatchingParticipant));

    assert!(matching_service::get_matching(conn, &scene.admin, matching.id).is_ok());
}

#[test]
fn cancelled_matching_freezes_its_report() {
    let Some(mut conn) = connect() else { return };
    let conn = &mut conn;
    let scene = scene(conn);
    let matching = matched(conn, &scene);
    matching_service::start_matching(conn, &scene.guide, matching.id).unwrap();
    let report = submitted_report(conn, &scene, &matching);

    request_service::cancel_request(conn, &scene.user, matching.request_id).unwrap();

    let err = report_service::approve_report(conn, scene.admin.id, report.id).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidMatchingTransition));
    let err = report_service::request_revision(conn, scene.admin.id, report.id, "time incorrect").unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidMatchingTransition));

    let detail = matching_service::get_matching(conn, &scene.admin, matching.id).unwrap();
    assert_eq!(detail.summary.status, MatchingStatus::Cancelled);
    let request = request_service::get_request(conn, &scene.user, matching.request_id).unwrap();
    assert_eq!(request.status, RequestStatus::Cancelled);
    let report = report_service::get_report(conn, &scene.admin, report.id).unwrap();
    assert_eq!(report.status().unwrap(), ReportStatus::Submitted);
}

#[test]
fn cancelled_matching_refuses_report_edits() {
    let Some(mut conn) = connect() else { return };
    let conn = &mut conn;
    let scene = scene(conn);
    let matching = matched(conn, &scene);
    let draft = report_service::create_report(conn, &scene.guide, matching.id, times((9, 0), (10, 0))).unwrap();

    request_service::cancel_request(conn, &scene.user, matching.request_id).unwrap();

    let err = report_service::update_report(conn, &scene.guide, draft.id, times((9, 0), (10, 30))).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidMatchingTransition));
    let err = report_service::submit_report(conn, &scene.guide, draft.id).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidMatchingTransition));
}

#[test]
fn reading_an_approved_chat_restores_missing_completion_stamp() {
    let Some(mut conn) = connect() else { return };
    let conn = &mut conn;
    let scene = scene(conn);
    let matching = matched(conn, &scene);
    let report = submitted_report(conn, &scene, &matching);
    report_service::approve_report(conn, scene.admin.id, report.id).unwrap();

    diesel::update(matchings::table.find(matching.id))
        .set(matchings::report_completed_at.eq(None::<chrono::DateTime<chrono::Utc>>))
        .execute(conn)
        .unwrap();

    let history = chat_service::list_messages(conn, &scene.user, matching.id).unwrap();
    assert_eq!(history.closed_reason, Some(ClosedReason::ReportApproved));

    let stamp: Option<chrono::DateTime<chrono::Utc>> = matchings::table
        .find(matching.id)
        .select(matchings::report_completed_at)
        .first(conn)
        .unwrap();
    assert!(stamp.is_some());
}

#[test]
fn applications_are_accepted_once_and_only_while_open() {
    let Some(mut conn) = connect() else { return };
    let conn = &mut conn;
    let scene = scene(conn);

    let request = request_service::create_request(
        conn,
        scene.user.id,
        RequestInput {
            request_type: RequestType::Home,
            request_date: Local::now().date_naive(),
            request_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            address: "Nagoya Naka 7-8".into(),
            destination: None,
            notes: None,
        },
    )
    .unwrap();
    request_service::apply(conn, scene.guide.id, request.id, None).unwrap();
    let err = request_service::apply(conn, scene.guide.id, request.id, None).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::AlreadyApplied));

    let matching = matched(conn, &scene);
    let latecomer = approved(conn, &scene.admin, UserRole::Guide, "Saburo");
    let err = request_service::apply(conn, latecomer.id, matching.request_id, None).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::RequestNotOpen));
}

#[test]
fn manual_matching_waits_for_admin() {
    let Some(mut conn) = connect() else { return };
    let conn = &mut conn;
    let scene = scene(conn);

    let request = request_service::create_request(
        conn,
        scene.user.id,
        RequestInput {
            request_type: RequestType::Home,
            request_date: Local::now().date_naive(),
            request_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            address: "Osaka Kita 4-5".into(),
            destination: None,
            notes: None,
        },
    )
    .unwrap();
    request_service::apply(conn, scene.guide.id, request.id, None).unwrap();

    let application = match request_service::select_guide(conn, &scene.user, request.id, scene.guide.id, false).unwrap() {
        Selection::AwaitingApproval { application } => application,
        other => panic!("expected pending approval, got {other:?}"),
    };

    let matching = request_service::approve_selection(conn, scene.admin.id, application.id).unwrap();
    assert_eq!(matching.guide_id, scene.guide.id);
    assert_eq!(matching.status().unwrap(), MatchingStatus::Matched);
}

#[test]
fn announcements_are_marked_read_once() {
    let Some(mut conn) = connect() else { return };
    let conn = &mut conn;
    let scene = scene(conn);

    let announcement = announcement_service::create(
        conn,
        scene.admin.id,
        AnnouncementInput {
            title: "Holiday schedule".into(),
            content: "The office is closed on the 3rd.".into(),
            target_audience: Audience::Guide,
        },
    )
    .unwrap();

    let err = announcement_service::mark_read(conn, scene.user.id, UserRole::User, announcement.id).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::AnnouncementNotTargeted));

    let first = announcement_service::mark_read(conn, scene.guide.id, UserRole::Guide, announcement.id).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(5));
    let second = announcement_service::mark_read(conn, scene.guide.id, UserRole::Guide, announcement.id).unwrap();
    assert_eq!((first.announcement_id, first.user_id), (second.announcement_id, second.user_id));
    assert!(second.read_at > first.read_at);

    let rows: i64 = announcement_reads::table
        .filter(announcement_reads::announcement_id.eq(announcement.id))
        .count()
        .get_result(conn)
        .unwrap();
    assert_eq!(rows, 1);

    let unread = announcement_service::list_unread(conn, scene.guide.id, UserRole::Guide).unwrap();
    assert!(unread.iter().all(|v| v.announcement.id != announcement.id));
}
