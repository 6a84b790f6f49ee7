use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::PgConnection;
use serde::Serialize;
use uuid::Uuid;

use guidelink_shared::errors::{AppError, AppResult, ErrorCode};
use guidelink_shared::types::auth::UserRole;
use guidelink_shared::types::pagination::{Paginated, PaginationParams};

use crate::domain::access;
use crate::domain::status::Audience;
use crate::models::{Announcement, AnnouncementRead, NewAnnouncement, NewAnnouncementRead};
use crate::schema::{announcement_reads, announcements, users};

#[derive(Debug, Serialize)]
pub struct AnnouncementView {
    #[serde(flatten)]
    pub announcement: Announcement,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct AuthoredAnnouncement {
    #[serde(flatten)]
    pub announcement: Announcement,
    pub author_name: String,
}

#[derive(Debug)]
pub struct AnnouncementInput {
    pub title: String,
    pub content: String,
    pub target_audience: Audience,
}

/// Title and content must carry text after trimming.
pub fn validate_input(input: &AnnouncementInput) -> AppResult<()> {
    if input.title.trim().is_empty() {
        return Err(AppError::new(ErrorCode::ValidationError, "title is required"));
    }
    if input.content.trim().is_empty() {
        return Err(AppError::new(ErrorCode::ValidationError, "content is required"));
    }
    Ok(())
}

fn find_announcement(conn: &mut PgConnection, id: Uuid) -> AppResult<Announcement> {
    announcements::table
        .find(id)
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::AnnouncementNotFound, "announcement not found"))
}

/// Announcements targeted at `role`, newest first, with the caller's read marker.
pub fn list_for_user(conn: &mut PgConnection, user_id: Uuid, role: UserRole) -> AppResult<Vec<AnnouncementView>> {
    let audiences: Vec<&str> = access::audiences_for(role).iter().map(Audience::as_str).collect();

    let rows: Vec<(Announcement, Option<DateTime<Utc>>)> = announcements::table
        .left_join(
            announcement_reads::table.on(announcement_reads::announcement_id
                .eq(announcements::id)
                .and(announcement_reads::user_id.eq(user_id))),
        )
        .filter(announcements::target_audience.eq_any(audiences))
        .order((announcements::created_at.desc(), announcements::id.desc()))
        .select((announcements::all_columns, announcement_reads::read_at.nullable()))
        .load(conn)?;

    Ok(rows
        .into_iter()
        .map(|(announcement, read_at)| AnnouncementView {
            announcement,
            is_read: read_at.is_some(),
            read_at,
        })
        .collect())
}

pub fn list_unread(conn: &mut PgConnection, user_id: Uuid, role: UserRole) -> AppResult<Vec<AnnouncementView>> {
    let mut views = list_for_user(conn, user_id, role)?;
    views.retain(|v| !v.is_read);
    Ok(views)
}

/// Idempotent: a second call moves `read_at` forward and keeps one row.
pub fn mark_read(
    conn: &mut PgConnection,
    user_id: Uuid,
    role: UserRole,
    announcement_id: Uuid,
) -> AppResult<AnnouncementRead> {
    let announcement = find_announcement(conn, announcement_id)?;
    if !access::is_targeted(announcement.audience()?, role) {
        return Err(AppError::new(
            ErrorCode::AnnouncementNotTargeted,
            "this announcement is not addressed to you",
        ));
    }

    let now = Utc::now();
    let read = diesel::insert_into(announcement_reads::table)
        .values(&NewAnnouncementRead { announcement_id, user_id, read_at: now })
        .on_conflict((announcement_reads::announcement_id, announcement_reads::user_id))
        .do_update()
        .set(announcement_reads::read_at.eq(now))
        .get_result::<AnnouncementRead>(conn)?;

    Ok(read)
}

// --- Admin ---

pub fn list_all(conn: &mut PgConnection, params: &PaginationParams) -> AppResult<Paginated<AuthoredAnnouncement>> {
    let total: i64 = announcements::table.count().get_result(conn)?;

    let rows: Vec<(Announcement, String)> = announcements::table
        .inner_join(users::table.on(users::id.eq(announcements::created_by)))
        .order(announcements::created_at.desc())
        .limit(params.limit() as i64)
        .offset(params.offset())
        .select((announcements::all_columns, users::name))
        .load(conn)?;

    let items = rows
        .into_iter()
        .map(|(announcement, author_name)| AuthoredAnnouncement { announcement, author_name })
        .collect();

    Ok(Paginated::new(items, total as u64, params))
}

pub fn create(conn: &mut PgConnection, admin_id: Uuid, input: AnnouncementInput) -> AppResult<Announcement> {
    validate_input(&input)?;

    let announcement: Announcement = diesel::insert_into(announcements::table)
        .values(&NewAnnouncement {
            title: input.title.trim().to_string(),
            content: input.content.trim().to_string(),
            target_audience: input.target_audience.as_str().to_string(),
            created_by: admin_id,
        })
        .get_result(conn)?;

    tracing::info!(
        announcement_id = %announcement.id,
        audience = %announcement.target_audience,
        "announcement created"
    );
    Ok(announcement)
}

pub fn update(conn: &mut PgConnection, id: Uuid, input: AnnouncementInput) -> AppResult<Announcement> {
    validate_input(&input)?;

    diesel::update(announcements::table.find(id))
        .set((
            announcements::title.eq(input.title.trim()),
            announcements::content.eq(input.content.trim()),
            announcements::target_audience.eq(input.target_audience.as_str()),
            announcements::updated_at.eq(Utc::now()),
        ))
        .get_result(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::AnnouncementNotFound, "announcement not found"))
}

/// Read markers go with it through the cascade.
pub fn delete(conn: &mut PgConnection, id: Uuid) -> AppResult<()> {
    let deleted = diesel::delete(announcements::table.find(id)).execute(conn)?;
    if deleted == 0 {
        return Err(AppError::new(ErrorCode::AnnouncementNotFound, "announcement not found"));
    }
    tracing::info!(announcement_id = %id, "announcement deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_title_or_content_is_rejected() {
        let input = |title: &str, content: &str| AnnouncementInput {
            title: title.into(),
            content: content.into(),
            target_audience: Audience::All,
        };

        assert!(validate_input(&input("Holiday hours", "Closed on the 3rd")).is_ok());
        assert_eq!(
            validate_input(&input("  ", "body")).unwrap_err().code(),
            Some(ErrorCode::ValidationError)
        );
        assert_eq!(
            validate_input(&input("title", "")).unwrap_err().code(),
            Some(ErrorCode::ValidationError)
        );
    }
}
