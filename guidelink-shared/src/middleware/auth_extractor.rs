use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::header::AUTHORIZATION;
use std::sync::Arc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::errors::{AppError, ErrorCode};
use crate::types::auth::{AuthUser, Claims, JwtSecret, UserRole};

/// Lets any `Arc`-wrapped application state that exposes its signing secret
/// drive the auth extractors.
impl<T> FromRef<Arc<T>> for JwtSecret
where
    T: AsRef<JwtSecret>,
{
    fn from_ref(state: &Arc<T>) -> Self {
        <T as AsRef<JwtSecret>>::as_ref(state).clone()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    JwtSecret: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let secret = JwtSecret::from_ref(state);
        let token = extract_token(parts)?;
        let claims = validate_jwt(&token, &secret)?;

        if claims.is_expired() {
            return Err(AppError::new(ErrorCode::TokenExpired, "token has expired"));
        }

        Ok(AuthUser::from(claims))
    }
}

/// Only the `Authorization: Bearer` header is honoured.
fn extract_token(parts: &Parts) -> Result<String, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::new(ErrorCode::Unauthorized, "missing authorization header"))?;
    let value = header
        .to_str()
        .map_err(|_| AppError::new(ErrorCode::Unauthorized, "invalid authorization header"))?;

    value
        .strip_prefix("Bearer ")
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::new(ErrorCode::Unauthorized, "authorization header must use Bearer scheme"))
}

pub fn issue_jwt(user_id: Uuid, role: UserRole, secret: &JwtSecret, ttl_secs: i64) -> Result<String, AppError> {
    let claims = Claims::new(user_id, role, ttl_secs);
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::internal(format!("JWT encoding failed: {e}")))
}

pub fn validate_jwt(token: &str, secret: &JwtSecret) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::new(ErrorCode::TokenExpired, "token has expired")
            }
            _ => AppError::new(ErrorCode::TokenInvalid, format!("invalid token: {e}")),
        })?;

    Ok(token_data.claims)
}

macro_rules! role_extractor {
    ($(#[$meta:meta])* $name:ident, [$($role:expr),+], $message:literal) => {
        $(#[$meta])*
        pub struct $name(pub AuthUser);

        #[axum::async_trait]
        impl<S> FromRequestParts<S> for $name
        where
            JwtSecret: FromRef<S>,
            S: Send + Sync,
        {
            type Rejection = AppError;

            async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
                let user = AuthUser::from_request_parts(parts, state).await?;
                if !user.has_role(&[$($role),+]) {
                    return Err(AppError::new(ErrorCode::Forbidden, $message));
                }
                Ok(Self(user))
            }
        }
    };
}

role_extractor!(
    /// Require Admin role
    AdminUser,
    [UserRole::Admin],
    "admin access required"
);

role_extractor!(
    /// Require Guide role
    GuideUser,
    [UserRole::Guide],
    "guide access required"
);

role_extractor!(
    /// Require the requester (`user`) role
    RequesterUser,
    [UserRole::User],
    "user access required"
);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn secret() -> JwtSecret {
        JwtSecret("test-secret".into())
    }

    fn parts_for(uri: &str, auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri(uri);
        if let Some(value) = auth {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn bearer_token_resolves_user() {
        let id = Uuid::new_v4();
        let token = issue_jwt(id, UserRole::Guide, &secret(), 60).unwrap();
        let mut parts = parts_for("/api/matchings", Some(&format!("Bearer {token}")));

        let user = AuthUser::from_request_parts(&mut parts, &secret()).await.unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.role, UserRole::Guide);
    }

    #[tokio::test]
    async fn query_token_is_ignored() {
        let token = issue_jwt(Uuid::new_v4(), UserRole::User, &secret(), 60).unwrap();
        let mut parts = parts_for(&format!("/api/chat/x/messages?page=1&token={token}"), None);

        let err = AuthUser::from_request_parts(&mut parts, &secret()).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::Unauthorized));
    }

    struct State {
        jwt: JwtSecret,
    }

    impl AsRef<JwtSecret> for State {
        fn as_ref(&self) -> &JwtSecret {
            &self.jwt
        }
    }

    #[tokio::test]
    async fn shared_state_supplies_the_secret() {
        let state = Arc::new(State { jwt: secret() });
        let token = issue_jwt(Uuid::new_v4(), UserRole::Admin, &secret(), 60).unwrap();
        let mut parts = parts_for("/", Some(&format!("Bearer {token}")));

        assert!(AdminUser::from_request_parts(&mut parts, &state).await.is_ok());
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let token = issue_jwt(Uuid::new_v4(), UserRole::User, &JwtSecret("other".into()), 60).unwrap();
        let mut parts = parts_for("/", Some(&format!("Bearer {token}")));

        let err = AuthUser::from_request_parts(&mut parts, &secret()).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::TokenInvalid));
    }

    #[tokio::test]
    async fn missing_or_malformed_header_is_unauthorized() {
        let mut parts = parts_for("/", None);
        let err = AuthUser::from_request_parts(&mut parts, &secret()).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::Unauthorized));

        let mut parts = parts_for("/", Some("Basic abc"));
        let err = AuthUser::from_request_parts(&mut parts, &secret()).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::Unauthorized));
    }

    #[tokio::test]
    async fn role_extractors_gate_by_role() {
        let token = issue_jwt(Uuid::new_v4(), UserRole::Guide, &secret(), 60).unwrap();
        let header = format!("Bearer {token}");

        let mut parts = parts_for("/", Some(&header));
        assert!(GuideUser::from_request_parts(&mut parts, &secret()).await.is_ok());

        let mut parts = parts_for("/", Some(&header));
        let err = AdminUser::from_request_parts(&mut parts, &secret()).await.err().unwrap();
        assert_eq!(err.code(), Some(ErrorCode::Forbidden));

        let mut parts = parts_for("/", Some(&header));
        assert!(RequesterUser::from_request_parts(&mut parts, &secret()).await.is_err());
    }
}
