use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use guidelink_shared::clients::db::checkout;
use guidelink_shared::errors::AppResult;
use guidelink_shared::middleware::issue_jwt;
use guidelink_shared::types::auth::{AccessToken, AuthUser, UserRole};
use guidelink_shared::types::ApiResponse;

use crate::models::{ProfileChanges, User};
use crate::services::auth_service::{self, Registration};
use crate::services::user_service;
use crate::AppState;

// --- POST /api/auth/register ---

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    pub password: String,
    pub role: UserRole,
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(max = 100))]
    pub name_kana: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<NaiveDate>,
    #[validate(length(max = 20))]
    pub gender: Option<String>,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    req.validate()?;
    auth_service::ensure_registrable_role(req.role)?;
    auth_service::validate_password(&req.password)?;

    let mut conn = checkout(&state.db)?;
    let user = auth_service::register(
        &mut conn,
        Registration {
            email: req.email,
            password: req.password,
            role: req.role,
            name: req.name,
            name_kana: req.name_kana,
            phone: req.phone,
            address: req.address,
            birth_date: req.birth_date,
            gender: req.gender,
        },
    )?;

    Ok(Json(ApiResponse::ok_with_message(
        user,
        "registration received; an administrator will review your account",
    )))
}

// --- POST /api/auth/login ---

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub token: AccessToken,
    pub user: User,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    req.validate()?;

    let mut conn = checkout(&state.db)?;
    let user = auth_service::login(&mut conn, &req.email, &req.password)?;

    let ttl = state.config.jwt_access_ttl;
    let token = issue_jwt(user.id, user.role()?, &state.jwt, ttl)?;

    Ok(Json(ApiResponse::ok(LoginResponse {
        token: AccessToken::bearer(token, ttl),
        user,
    })))
}

// --- GET /api/auth/me ---

pub async fn me(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<User>>> {
    let mut conn = checkout(&state.db)?;
    let profile = user_service::get_user(&mut conn, user.id)?;
    Ok(Json(ApiResponse::ok(profile)))
}

// --- PUT /api/auth/me ---

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 100))]
    pub name_kana: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<NaiveDate>,
    #[validate(length(max = 20))]
    pub gender: Option<String>,
}

pub async fn update_me(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    req.validate()?;

    let changes = ProfileChanges {
        name: req.name,
        name_kana: req.name_kana,
        phone: req.phone,
        address: req.address,
        birth_date: req.birth_date,
        gender: req.gender,
        updated_at: Utc::now(),
    };

    let mut conn = checkout(&state.db)?;
    let updated = user_service::update_profile(&mut conn, user.id, changes)?;

    tracing::info!(user_id = %user.id, "profile updated");
    Ok(Json(ApiResponse::ok(updated)))
}
