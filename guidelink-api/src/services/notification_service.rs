use diesel::prelude::*;
use diesel::PgConnection;
use serde_json::json;
use uuid::Uuid;

use guidelink_shared::errors::{AppError, AppResult, ErrorCode};
use guidelink_shared::types::pagination::{Paginated, PaginationParams};

use crate::models::{NewNotification, Notification};
use crate::schema::notifications;

/// Lifecycle events that leave a notification in someone's feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    AccountApproved,
    ApplicationReceived,
    SelectionPending,
    ApplicationDeclined,
    MatchingCreated,
    RequestCancelled,
    ReportSubmitted,
    RevisionRequested,
    ReportApproved,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::AccountApproved => "account_approved",
            NotificationKind::ApplicationReceived => "application_received",
            NotificationKind::SelectionPending => "selection_pending",
            NotificationKind::ApplicationDeclined => "application_declined",
            NotificationKind::MatchingCreated => "matching_created",
            NotificationKind::RequestCancelled => "request_cancelled",
            NotificationKind::ReportSubmitted => "report_submitted",
            NotificationKind::RevisionRequested => "revision_requested",
            NotificationKind::ReportApproved => "report_approved",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            NotificationKind::AccountApproved => "Your account has been approved",
            NotificationKind::ApplicationReceived => "A guide applied to your request",
            NotificationKind::SelectionPending => "Your selection is awaiting approval",
            NotificationKind::ApplicationDeclined => "Another guide was selected",
            NotificationKind::MatchingCreated => "Matching confirmed",
            NotificationKind::RequestCancelled => "Request cancelled",
            NotificationKind::ReportSubmitted => "A report was submitted",
            NotificationKind::RevisionRequested => "Report revision requested",
            NotificationKind::ReportApproved => "Report approved",
        }
    }
}

pub fn notify(
    conn: &mut PgConnection,
    user_id: Uuid,
    kind: NotificationKind,
    body: impl Into<String>,
    data: serde_json::Value,
) -> AppResult<Notification> {
    let new_notification = NewNotification {
        user_id,
        notification_type: kind.as_str().to_string(),
        title: kind.title().to_string(),
        body: body.into(),
        data: Some(data),
    };

    let notification = diesel::insert_into(notifications::table)
        .values(&new_notification)
        .get_result::<Notification>(conn)?;

    tracing::debug!(
        notification_id = %notification.id,
        user_id = %user_id,
        notification_type = kind.as_str(),
        "notification created"
    );

    Ok(notification)
}

/// Convenience for the common `{ "<key>": id }` payload.
pub fn notify_about(
    conn: &mut PgConnection,
    user_id: Uuid,
    kind: NotificationKind,
    body: impl Into<String>,
    key: &str,
    id: Uuid,
) -> AppResult<Notification> {
    notify(conn, user_id, kind, body, json!({ key: id }))
}

pub fn list(
    conn: &mut PgConnection,
    user_id: Uuid,
    params: &PaginationParams,
) -> AppResult<Paginated<Notification>> {
    let total: i64 = notifications::table
        .filter(notifications::user_id.eq(user_id))
        .count()
        .get_result(conn)?;

    let items = notifications::table
        .filter(notifications::user_id.eq(user_id))
        .order(notifications::created_at.desc())
        .limit(params.limit() as i64)
        .offset(params.offset())
        .load::<Notification>(conn)?;

    Ok(Paginated::new(items, total as u64, params))
}

pub fn latest_unread(conn: &mut PgConnection, user_id: Uuid, limit: i64) -> AppResult<Vec<Notification>> {
    Ok(notifications::table
        .filter(notifications::user_id.eq(user_id))
        .filter(notifications::is_read.eq(false))
        .order(notifications::created_at.desc())
        .limit(limit)
        .load(conn)?)
}

pub fn count_unread(conn: &mut PgConnection, user_id: Uuid) -> AppResult<i64> {
    Ok(notifications::table
        .filter(notifications::user_id.eq(user_id))
        .filter(notifications::is_read.eq(false))
        .count()
        .get_result(conn)?)
}

pub fn mark_all_read(conn: &mut PgConnection, user_id: Uuid) -> AppResult<usize> {
    let updated = diesel::update(
        notifications::table
            .filter(notifications::user_id.eq(user_id))
            .filter(notifications::is_read.eq(false)),
    )
    .set(notifications::is_read.eq(true))
    .execute(conn)?;

    Ok(updated)
}

/// Only the owner's notifications can be marked; anything else reads as missing.
pub fn mark_read(conn: &mut PgConnection, notification_id: Uuid, user_id: Uuid) -> AppResult<Notification> {
    diesel::update(
        notifications::table
            .filter(notifications::id.eq(notification_id))
            .filter(notifications::user_id.eq(user_id)),
    )
    .set(notifications::is_read.eq(true))
    .get_result::<Notification>(conn)
    .map_err(|e| match e {
        diesel::result::Error::NotFound => {
            AppError::new(ErrorCode::NotificationNotFound, "notification not found")
        }
        other => AppError::Database(other),
    })
}
