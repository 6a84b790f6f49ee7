use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Auth errors
/// - E2xxx: User errors
/// - E3xxx: Request and application errors
/// - E4xxx: Matching errors
/// - E5xxx: Chat errors
/// - E6xxx: Report errors
/// - E7xxx: Announcement errors
/// - E8xxx: Notification errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    BadRequest,

    // Auth (E1xxx)
    InvalidCredentials,
    EmailAlreadyExists,
    TokenExpired,
    TokenInvalid,
    PasswordTooWeak,
    AccountPendingApproval,

    // User (E2xxx)
    UserNotFound,
    UserAlreadyApproved,

    // Request (E3xxx)
    RequestNotFound,
    NotRequestOwner,
    RequestNotOpen,
    RequestDateInPast,
    AlreadyApplied,
    ApplicationNotFound,
    ApplicationNotPending,

    // Matching (E4xxx)
    MatchingNotFound,
    NotMatchingParticipant,
    AlreadyMatched,
    InvalidMatchingTransition,

    // Chat (E5xxx)
    ChatClosed,
    MessageTooLong,
    EmptyMessage,

    // Report (E6xxx)
    ReportNotFound,
    ReportAlreadyExists,
    InvalidReportTransition,
    ReportFinalized,
    RevisionNotesRequired,
    InvalidActivityTime,

    // Announcement (E7xxx)
    AnnouncementNotFound,
    AnnouncementNotTargeted,

    // Notification (E8xxx)
    NotificationNotFound,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::BadRequest => "E0006",

            // Auth
            Self::InvalidCredentials => "E1001",
            Self::EmailAlreadyExists => "E1002",
            Self::TokenExpired => "E1003",
            Self::TokenInvalid => "E1004",
            Self::PasswordTooWeak => "E1005",
            Self::AccountPendingApproval => "E1006",

            // User
            Self::UserNotFound => "E2001",
            Self::UserAlreadyApproved => "E2002",

            // Request
            Self::RequestNotFound => "E3001",
            Self::NotRequestOwner => "E3002",
            Self::RequestNotOpen => "E3003",
            Self::RequestDateInPast => "E3004",
            Self::AlreadyApplied => "E3005",
            Self::ApplicationNotFound => "E3006",
            Self::ApplicationNotPending => "E3007",

            // Matching
            Self::MatchingNotFound => "E4001",
            Self::NotMatchingParticipant => "E4002",
            Self::AlreadyMatched => "E4003",
            Self::InvalidMatchingTransition => "E4004",

            // Chat
            Self::ChatClosed => "E5001",
            Self::MessageTooLong => "E5002",
            Self::EmptyMessage => "E5003",

            // Report
            Self::ReportNotFound => "E6001",
            Self::ReportAlreadyExists => "E6002",
            Self::InvalidReportTransition => "E6003",
            Self::ReportFinalized => "E6004",
            Self::RevisionNotesRequired => "E6005",
            Self::InvalidActivityTime => "E6006",

            // Announcement
            Self::AnnouncementNotFound => "E7001",
            Self::AnnouncementNotTargeted => "E7002",

            // Notification
            Self::NotificationNotFound => "E8001",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError | Self::BadRequest | Self::PasswordTooWeak
            | Self::RequestDateInPast | Self::MessageTooLong | Self::EmptyMessage
            | Self::RevisionNotesRequired | Self::InvalidActivityTime => StatusCode::BAD_REQUEST,
            Self::NotFound | Self::UserNotFound | Self::RequestNotFound
            | Self::ApplicationNotFound | Self::MatchingNotFound | Self::ReportNotFound
            | Self::AnnouncementNotFound | Self::NotificationNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::InvalidCredentials | Self::TokenExpired
            | Self::TokenInvalid => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::AccountPendingApproval | Self::NotRequestOwner
            | Self::NotMatchingParticipant | Self::AnnouncementNotTargeted => StatusCode::FORBIDDEN,
            Self::EmailAlreadyExists | Self::UserAlreadyApproved | Self::RequestNotOpen
            | Self::AlreadyApplied | Self::ApplicationNotPending | Self::AlreadyMatched
            | Self::InvalidMatchingTransition | Self::ChatClosed | Self::ReportAlreadyExists
            | Self::InvalidReportTransition | Self::ReportFinalized => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// The error code carried by a known error, if any.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            AppError::Known { code, .. } => Some(*code),
            AppError::Validation(_) => Some(ErrorCode::ValidationError),
            _ => None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Known { code, .. } => code.status_code(),
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Database(diesel::result::Error::NotFound) => StatusCode::NOT_FOUND,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = serde_json::to_value(&errors).unwrap_or(serde_json::Value::Null);
        Self::with_details(ErrorCode::ValidationError, "request validation failed", details)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Database(err) => {
                match err {
                    diesel::result::Error::NotFound => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new("E0003", "resource not found"),
                    ),
                    _ => {
                        tracing::error!(error = %err, "database error");
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            ApiErrorResponse::new("E0001", "database error"),
                        )
                    }
                }
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("E0002", msg),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn known_error_renders_code_and_message() {
        let (status, body) =
            body_json(AppError::new(ErrorCode::ChatClosed, "chat is closed")).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "E5001");
        assert_eq!(body["error"]["message"], "chat is closed");
        assert!(body["error"].get("details").is_none());
    }

    #[tokio::test]
    async fn internal_errors_hide_their_cause() {
        let (status, body) =
            body_json(AppError::Internal(anyhow::anyhow!("pool exhausted"))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "E0001");
        assert_eq!(body["error"]["message"], "internal server error");
    }

    #[tokio::test]
    async fn diesel_not_found_maps_to_404() {
        let (status, body) = body_json(AppError::Database(diesel::result::Error::NotFound)).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "E0003");
    }

    #[test]
    fn taxonomy_status_codes() {
        assert_eq!(ErrorCode::MatchingNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::NotMatchingParticipant.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::RevisionNotesRequired.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::ReportFinalized.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::TokenExpired.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn known_error_exposes_code() {
        let err = AppError::new(ErrorCode::MessageTooLong, "too long");
        assert_eq!(err.code(), Some(ErrorCode::MessageTooLong));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::internal("x").code(), Some(ErrorCode::InternalError));
    }
}
