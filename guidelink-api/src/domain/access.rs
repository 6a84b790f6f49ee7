use uuid::Uuid;

use guidelink_shared::errors::{AppError, AppResult, ErrorCode};
use guidelink_shared::types::auth::{AuthUser, UserRole};

use crate::domain::status::Audience;
use crate::models::{Matching, Request};

/// The requester or the matched guide.
pub fn is_participant(matching: &Matching, actor_id: Uuid) -> bool {
    matching.user_id == actor_id || matching.guide_id == actor_id
}

pub fn has_role(actor: &AuthUser, roles: &[UserRole]) -> bool {
    actor.has_role(roles)
}

/// Chat is strictly for the two participants; admins are not let in.
pub fn ensure_participant(matching: &Matching, actor: &AuthUser) -> AppResult<()> {
    if is_participant(matching, actor.id) {
        Ok(())
    } else {
        Err(AppError::new(
            ErrorCode::NotMatchingParticipant,
            "you are not a participant of this matching",
        ))
    }
}

pub fn ensure_participant_or_admin(matching: &Matching, actor: &AuthUser) -> AppResult<()> {
    if actor.is_admin() {
        return Ok(());
    }
    ensure_participant(matching, actor)
}

pub fn ensure_request_owner(request: &Request, actor: &AuthUser) -> AppResult<()> {
    if request.user_id == actor.id {
        Ok(())
    } else {
        Err(AppError::new(ErrorCode::NotRequestOwner, "you do not own this request"))
    }
}

/// Whether the unmasked address may be shown.
pub fn can_view_full_address(request: &Request, matching: Option<&Matching>, actor: &AuthUser) -> bool {
    actor.is_admin()
        || request.user_id == actor.id
        || matching.is_some_and(|m| m.guide_id == actor.id)
}

/// Audiences whose announcements a role receives.
pub fn audiences_for(role: UserRole) -> &'static [Audience] {
    match role {
        UserRole::User => &[Audience::User, Audience::All],
        UserRole::Guide => &[Audience::Guide, Audience::All],
        UserRole::Admin => Audience::ALL,
    }
}

pub fn is_targeted(audience: Audience, role: UserRole) -> bool {
    audiences_for(role).contains(&audience)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, Utc};

    fn actor(id: Uuid, role: UserRole) -> AuthUser {
        AuthUser { id, role, token_id: Uuid::new_v4() }
    }

    fn matching(user_id: Uuid, guide_id: Uuid) -> Matching {
        Matching {
            id: Uuid::new_v4(),
            request_id: Uuid::new_v4(),
            user_id,
            guide_id,
            status: "matched".into(),
            matched_at: Utc::now(),
            report_completed_at: None,
            updated_at: Utc::now(),
        }
    }

    fn request(user_id: Uuid) -> Request {
        Request {
            id: Uuid::new_v4(),
            user_id,
            request_type: "outing".into(),
            request_date: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            request_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            address: "Shibuya 1-2-3".into(),
            masked_address: "Shibuya ***".into(),
            destination: None,
            notes: None,
            status: "pending".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn participants_are_user_and_guide_only() {
        let (user, guide, other) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let m = matching(user, guide);

        assert!(is_participant(&m, user));
        assert!(is_participant(&m, guide));
        assert!(!is_participant(&m, other));

        let err = ensure_participant(&m, &actor(other, UserRole::Guide)).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::NotMatchingParticipant));
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
    }

    #[test]
    fn admin_bypasses_participant_check_only_where_allowed() {
        let m = matching(Uuid::new_v4(), Uuid::new_v4());
        let admin = actor(Uuid::new_v4(), UserRole::Admin);

        assert!(ensure_participant(&m, &admin).is_err());
        assert!(ensure_participant_or_admin(&m, &admin).is_ok());
    }

    #[test]
    fn full_address_visibility() {
        let (owner, guide) = (Uuid::new_v4(), Uuid::new_v4());
        let req = request(owner);
        let m = matching(owner, guide);

        assert!(can_view_full_address(&req, None, &actor(owner, UserRole::User)));
        assert!(can_view_full_address(&req, Some(&m), &actor(guide, UserRole::Guide)));
        assert!(!can_view_full_address(&req, None, &actor(guide, UserRole::Guide)));
        assert!(!can_view_full_address(&req, Some(&m), &actor(Uuid::new_v4(), UserRole::Guide)));
    }

    #[test]
    fn announcement_targeting() {
        assert!(is_targeted(Audience::All, UserRole::User));
        assert!(is_targeted(Audience::Guide, UserRole::Guide));
        assert!(!is_targeted(Audience::Guide, UserRole::User));
        assert!(!is_targeted(Audience::User, UserRole::Guide));
        assert!(is_targeted(Audience::User, UserRole::Admin));
    }
}
