use std::collections::HashMap;

use chrono::Utc;
use diesel::prelude::*;
use diesel::pg::Pg;
use diesel::PgConnection;
use serde::Deserialize;
use uuid::Uuid;

use guidelink_shared::errors::{AppError, AppResult, ErrorCode};
use guidelink_shared::types::auth::UserRole;
use guidelink_shared::types::pagination::{Paginated, PaginationParams};

use crate::models::{ProfileChanges, User};
use crate::schema::users;
use crate::services::notification_service::{self, NotificationKind};

pub fn get_user(conn: &mut PgConnection, user_id: Uuid) -> AppResult<User> {
    users::table
        .find(user_id)
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))
}

pub fn update_profile(conn: &mut PgConnection, user_id: Uuid, changes: ProfileChanges) -> AppResult<User> {
    diesel::update(users::table.find(user_id))
        .set(&changes)
        .get_result(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))
}

#[derive(Debug, Default, Deserialize)]
pub struct UserFilter {
    pub role: Option<UserRole>,
    pub approved: Option<bool>,
}

pub fn list_users(
    conn: &mut PgConnection,
    filter: &UserFilter,
    params: &PaginationParams,
) -> AppResult<Paginated<User>> {
    let build = || {
        let mut query: users::BoxedQuery<'_, Pg> = users::table.into_boxed();
        if let Some(role) = filter.role {
            query = query.filter(users::role.eq(role.as_str()));
        }
        if let Some(approved) = filter.approved {
            query = query.filter(users::is_approved.eq(approved));
        }
        query
    };

    let total: i64 = build().count().get_result(conn)?;
    let items = build()
        .order(users::created_at.desc())
        .limit(params.limit() as i64)
        .offset(params.offset())
        .load::<User>(conn)?;

    Ok(Paginated::new(items, total as u64, params))
}

pub fn approve_user(conn: &mut PgConnection, admin_id: Uuid, user_id: Uuid) -> AppResult<User> {
    conn.transaction(|conn| {
        let user: User = users::table
            .find(user_id)
            .for_update()
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))?;

        if user.is_approved {
            return Err(AppError::new(ErrorCode::UserAlreadyApproved, "user is already approved"));
        }

        let now = Utc::now();
        let user: User = diesel::update(users::table.find(user_id))
            .set((
                users::is_approved.eq(true),
                users::approved_at.eq(Some(now)),
                users::updated_at.eq(now),
            ))
            .get_result(conn)?;

        notification_service::notify_about(
            conn,
            user.id,
            NotificationKind::AccountApproved,
            "You can now log in and use the service.",
            "user_id",
            user.id,
        )?;

        tracing::info!(user_id = %user.id, approved_by = %admin_id, "user approved");
        Ok(user)
    })
}

pub fn count_pending_approval(conn: &mut PgConnection) -> AppResult<i64> {
    Ok(users::table
        .filter(users::is_approved.eq(false))
        .count()
        .get_result(conn)?)
}

/// Display names for a set of users, for joining onto listings.
pub fn names_by_id(conn: &mut PgConnection, ids: &[Uuid]) -> AppResult<HashMap<Uuid, String>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = users::table
        .filter(users::id.eq_any(ids.to_vec()))
        .select((users::id, users::name))
        .load::<(Uuid, String)>(conn)?;
    Ok(rows.into_iter().collect())
}

pub fn admin_ids(conn: &mut PgConnection) -> AppResult<Vec<Uuid>> {
    Ok(users::table
        .filter(users::role.eq(UserRole::Admin.as_str()))
        .select(users::id)
        .load(conn)?)
}
