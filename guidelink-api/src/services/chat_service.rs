use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::PgConnection;
use serde::Serialize;
use uuid::Uuid;

use guidelink_shared::errors::{AppError, AppResult, ErrorCode};
use guidelink_shared::types::auth::{AuthUser, UserRole};

use crate::domain::chat_window::{self, ChatWindow, ClosedReason};
use crate::domain::{access, status::ReportStatus};
use crate::models::{ChatMessage, Matching, NewChatMessage, NewChatRead};
use crate::schema::{chat_messages, chat_reads, matchings, reports, users};
use crate::services::matching_service;

pub const MAX_MESSAGE_CHARS: usize = 1000;

/// Message text that passed length checks, trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBody(String);

impl MessageBody {
    pub fn parse(raw: &str) -> AppResult<Self> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(AppError::new(ErrorCode::EmptyMessage, "message must not be empty"));
        }
        if text.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AppError::new(
                ErrorCode::MessageTooLong,
                format!("message must be at most {MAX_MESSAGE_CHARS} characters"),
            ));
        }
        Ok(Self(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Serialize)]
pub struct ChatMessageView {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub sender_role: UserRole,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub is_mine: bool,
}

#[derive(Debug, Serialize)]
pub struct ChatHistory {
    pub matching_id: Uuid,
    pub messages: Vec<ChatMessageView>,
    pub can_send: bool,
    pub closed_reason: Option<ClosedReason>,
}

/// Current chat window for a matching.
///
/// Also repairs `report_completed_at` on matchings approved before the stamp
/// was written at approval time.
pub fn window_for(conn: &mut PgConnection, matching: &Matching) -> AppResult<ChatWindow> {
    let statuses = reports::table
        .filter(reports::matching_id.eq(matching.id))
        .select(reports::status)
        .load::<String>(conn)?
        .iter()
        .map(|s| ReportStatus::from_column(s))
        .collect::<AppResult<Vec<_>>>()?;

    let window = chat_window::evaluate(matching.status()?, &statuses);

    if window.needs_completion_stamp(matching.report_completed_at) {
        let stamped = diesel::update(
            matchings::table
                .find(matching.id)
                .filter(matchings::report_completed_at.is_null()),
        )
        .set(matchings::report_completed_at.eq(Some(Utc::now())))
        .execute(conn)?;
        if stamped > 0 {
            tracing::warn!(matching_id = %matching.id, "backfilled missing report_completed_at");
        }
    }

    Ok(window)
}

fn participant_matching(conn: &mut PgConnection, actor: &AuthUser, matching_id: Uuid) -> AppResult<Matching> {
    let matching = matching_service::find_matching(conn, matching_id)?;
    access::ensure_participant(&matching, actor)?;
    Ok(matching)
}

pub fn send_message(
    conn: &mut PgConnection,
    actor: &AuthUser,
    matching_id: Uuid,
    body: &MessageBody,
) -> AppResult<ChatMessage> {
    let matching = participant_matching(conn, actor, matching_id)?;
    window_for(conn, &matching)?.ensure_open()?;

    let message: ChatMessage = diesel::insert_into(chat_messages::table)
        .values(&NewChatMessage {
            matching_id,
            sender_id: actor.id,
            message: body.as_str(),
        })
        .get_result(conn)?;

    mark_read_until(conn, matching_id, actor.id, message.created_at)?;

    tracing::debug!(matching_id = %matching_id, sender_id = %actor.id, "chat message sent");
    Ok(message)
}

/// Full history, oldest first. Reading always works for participants even
/// after the window has closed.
pub fn list_messages(conn: &mut PgConnection, actor: &AuthUser, matching_id: Uuid) -> AppResult<ChatHistory> {
    let matching = participant_matching(conn, actor, matching_id)?;
    let window = window_for(conn, &matching)?;

    let rows: Vec<(ChatMessage, String, String)> = chat_messages::table
        .inner_join(users::table)
        .filter(chat_messages::matching_id.eq(matching_id))
        .order((chat_messages::created_at.asc(), chat_messages::id.asc()))
        .select((chat_messages::all_columns, users::name, users::role))
        .load(conn)?;

    mark_read_until(conn, matching_id, actor.id, Utc::now())?;

    let messages = rows
        .into_iter()
        .map(|(m, sender_name, role)| {
            Ok(ChatMessageView {
                is_mine: m.sender_id == actor.id,
                id: m.id,
                sender_id: m.sender_id,
                sender_name,
                sender_role: role.parse().map_err(AppError::internal)?,
                message: m.message,
                created_at: m.created_at,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ChatHistory {
        matching_id,
        messages,
        can_send: window.is_open(),
        closed_reason: window.closed_reason(),
    })
}

fn mark_read_until(conn: &mut PgConnection, matching_id: Uuid, user_id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
    diesel::insert_into(chat_reads::table)
        .values(&NewChatRead { matching_id, user_id, last_read_at: at })
        .on_conflict((chat_reads::matching_id, chat_reads::user_id))
        .do_update()
        .set(chat_reads::last_read_at.eq(at))
        .execute(conn)?;
    Ok(())
}

/// Messages from the other side newer than the caller's read marker, across
/// all of the caller's matchings.
pub fn unread_count(conn: &mut PgConnection, user_id: Uuid) -> AppResult<i64> {
    Ok(chat_messages::table
        .inner_join(matchings::table)
        .left_join(
            chat_reads::table.on(chat_reads::matching_id
                .eq(chat_messages::matching_id)
                .and(chat_reads::user_id.eq(user_id))),
        )
        .filter(matchings::user_id.eq(user_id).or(matchings::guide_id.eq(user_id)))
        .filter(chat_messages::sender_id.ne(user_id))
        .filter(
            chat_reads::last_read_at
                .nullable()
                .is_null()
                .or(chat_messages::created_at.nullable().gt(chat_reads::last_read_at.nullable())),
        )
        .count()
        .get_result(conn)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_body_is_trimmed_and_bounded() {
        assert_eq!(MessageBody::parse("  hello ").unwrap().as_str(), "hello");

        let err = MessageBody::parse(" \n ").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::EmptyMessage));

        let exact = "あ".repeat(MAX_MESSAGE_CHARS);
        assert!(MessageBody::parse(&exact).is_ok());

        let err = MessageBody::parse(&"a".repeat(MAX_MESSAGE_CHARS + 1)).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::MessageTooLong));
    }
}
