use chrono::{DateTime, Utc};
use serde::Serialize;

use guidelink_shared::errors::{AppError, AppResult, ErrorCode};

use crate::domain::status::{MatchingStatus, ReportStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosedReason {
    Cancelled,
    ReportApproved,
}

/// Whether messages may be sent on a matching. Derived on every call, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatWindow {
    Open,
    Closed(ClosedReason),
}

/// Cancellation wins over an approved report when both hold.
pub fn evaluate(matching: MatchingStatus, reports: &[ReportStatus]) -> ChatWindow {
    if matching == MatchingStatus::Cancelled {
        return ChatWindow::Closed(ClosedReason::Cancelled);
    }
    if reports.iter().any(ReportStatus::is_terminal) {
        return ChatWindow::Closed(ClosedReason::ReportApproved);
    }
    ChatWindow::Open
}

impl ChatWindow {
    pub fn is_open(&self) -> bool {
        matches!(self, ChatWindow::Open)
    }

    pub fn closed_reason(&self) -> Option<ClosedReason> {
        match self {
            ChatWindow::Open => None,
            ChatWindow::Closed(reason) => Some(*reason),
        }
    }

    pub fn ensure_open(&self) -> AppResult<()> {
        match self {
            ChatWindow::Open => Ok(()),
            ChatWindow::Closed(ClosedReason::Cancelled) => Err(AppError::new(
                ErrorCode::ChatClosed,
                "chat is unavailable because the matching was cancelled",
            )),
            ChatWindow::Closed(ClosedReason::ReportApproved) => Err(AppError::new(
                ErrorCode::ChatClosed,
                "chat is unavailable because the report has been approved",
            )),
        }
    }

    /// Rows approved before `report_completed_at` existed still lack the stamp.
    pub fn needs_completion_stamp(&self, stamp: Option<DateTime<Utc>>) -> bool {
        *self == ChatWindow::Closed(ClosedReason::ReportApproved) && stamp.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_while_matched_or_in_progress() {
        assert!(evaluate(MatchingStatus::Matched, &[]).is_open());
        assert!(evaluate(MatchingStatus::InProgress, &[ReportStatus::Draft]).is_open());
        assert!(evaluate(MatchingStatus::InProgress, &[ReportStatus::Submitted]).is_open());
        assert!(evaluate(MatchingStatus::Matched, &[ReportStatus::RevisionRequested]).is_open());
    }

    #[test]
    fn cancelled_matching_closes_chat() {
        let window = evaluate(MatchingStatus::Cancelled, &[]);
        assert_eq!(window, ChatWindow::Closed(ClosedReason::Cancelled));

        let err = window.ensure_open().unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::ChatClosed));
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
    }

    #[test]
    fn approved_report_closes_chat() {
        let window = evaluate(
            MatchingStatus::InProgress,
            &[ReportStatus::Submitted, ReportStatus::AdminApproved],
        );
        assert_eq!(window.closed_reason(), Some(ClosedReason::ReportApproved));
        assert!(window.ensure_open().is_err());
    }

    #[test]
    fn legacy_approved_value_also_closes() {
        let legacy = ReportStatus::from_column("approved").unwrap();
        assert!(!evaluate(MatchingStatus::Completed, &[legacy]).is_open());
    }

    #[test]
    fn cancellation_takes_precedence() {
        let window = evaluate(MatchingStatus::Cancelled, &[ReportStatus::AdminApproved]);
        assert_eq!(window.closed_reason(), Some(ClosedReason::Cancelled));
        assert!(!window.needs_completion_stamp(None));
    }

    #[test]
    fn stamp_needed_only_when_missing() {
        let window = evaluate(MatchingStatus::Completed, &[ReportStatus::AdminApproved]);
        assert!(window.needs_completion_stamp(None));
        assert!(!window.needs_completion_stamp(Some(Utc::now())));
        assert!(!ChatWindow::Open.needs_completion_stamp(None));
    }
}
