use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use diesel::PgConnection;

use guidelink_shared::errors::{AppError, AppResult, ErrorCode};
use guidelink_shared::types::auth::UserRole;

use crate::models::{NewUser, User};
use crate::schema::users;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::internal(format!("invalid password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < 8 {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password must be at least 8 characters"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password must contain at least one number"));
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password must contain at least one letter"));
    }
    Ok(())
}

pub fn ensure_registrable_role(role: UserRole) -> Result<(), AppError> {
    if role == UserRole::Admin {
        return Err(AppError::forbidden("admin accounts cannot be self-registered"));
    }
    Ok(())
}

#[derive(Debug)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub name: String,
    pub name_kana: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
}

/// New accounts wait for admin approval before they can log in.
pub fn register(conn: &mut PgConnection, input: Registration) -> AppResult<User> {
    ensure_registrable_role(input.role)?;
    validate_password(&input.password)?;

    let email = input.email.trim().to_lowercase();
    let exists: i64 = users::table
        .filter(users::email.eq(&email))
        .count()
        .get_result(conn)?;
    if exists > 0 {
        return Err(AppError::new(ErrorCode::EmailAlreadyExists, "email already registered"));
    }

    let new_user = NewUser {
        email,
        password_hash: hash_password(&input.password)?,
        role: input.role.as_str().to_string(),
        is_approved: false,
        name: input.name,
        name_kana: input.name_kana,
        phone: input.phone,
        address: input.address,
        birth_date: input.birth_date,
        gender: input.gender,
        approved_at: None,
    };

    let user: User = diesel::insert_into(users::table)
        .values(&new_user)
        .get_result(conn)?;

    tracing::info!(user_id = %user.id, role = %user.role, "user registered");
    Ok(user)
}

pub fn login(conn: &mut PgConnection, email: &str, password: &str) -> AppResult<User> {
    let user: User = users::table
        .filter(users::email.eq(email.trim().to_lowercase()))
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::InvalidCredentials, "invalid email or password"))?;

    if !verify_password(password, &user.password_hash)? {
        return Err(AppError::new(ErrorCode::InvalidCredentials, "invalid email or password"));
    }
    if !user.is_approved {
        return Err(AppError::new(
            ErrorCode::AccountPendingApproval,
            "account is awaiting administrator approval",
        ));
    }

    tracing::info!(user_id = %user.id, "user logged in");
    Ok(user)
}

/// Returns `None` when an account with this email already exists.
pub fn seed_admin(
    conn: &mut PgConnection,
    email: &str,
    password: &str,
    name: &str,
) -> AppResult<Option<User>> {
    let email = email.trim().to_lowercase();
    validate_password(password)?;

    let new_user = NewUser {
        email,
        password_hash: hash_password(password)?,
        role: UserRole::Admin.as_str().to_string(),
        is_approved: true,
        name: name.to_string(),
        name_kana: None,
        phone: None,
        address: None,
        birth_date: None,
        gender: None,
        approved_at: Some(Utc::now()),
    };

    let user = diesel::insert_into(users::table)
        .values(&new_user)
        .on_conflict(users::email)
        .do_nothing()
        .get_result::<User>(conn)
        .optional()?;

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("guide1234").unwrap();
        assert!(verify_password("guide1234", &hash).unwrap());
        assert!(!verify_password("guide12345", &hash).unwrap());
    }

    #[test]
    fn password_rules() {
        let weak = |p| validate_password(p).unwrap_err().code();
        assert_eq!(weak("short1"), Some(ErrorCode::PasswordTooWeak));
        assert_eq!(weak("onlyletters"), Some(ErrorCode::PasswordTooWeak));
        assert_eq!(weak("12345678"), Some(ErrorCode::PasswordTooWeak));
        assert!(validate_password("letters123").is_ok());
    }
}
