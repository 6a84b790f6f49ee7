use chrono::{NaiveDate, NaiveTime};

use guidelink_shared::errors::{AppError, AppResult, ErrorCode};

use crate::domain::status::ReportStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportAction<'a> {
    Edit,
    Submit,
    Approve,
    RequestRevision(&'a str),
}

impl ReportAction<'_> {
    fn name(&self) -> &'static str {
        match self {
            ReportAction::Edit => "edit",
            ReportAction::Submit => "submit",
            ReportAction::Approve => "approve",
            ReportAction::RequestRevision(_) => "request revision",
        }
    }
}

impl ReportStatus {
    /// Next status for `action`, or why it is refused.
    pub fn apply(self, action: ReportAction<'_>) -> AppResult<ReportStatus> {
        use ReportStatus::*;

        if self.is_terminal() {
            return Err(AppError::new(
                ErrorCode::ReportFinalized,
                "report has been approved and can no longer change",
            ));
        }

        match (self, action) {
            (Draft | RevisionRequested, ReportAction::Edit) => Ok(self),
            (Draft | RevisionRequested, ReportAction::Submit) => Ok(Submitted),
            (Submitted, ReportAction::Approve) => Ok(AdminApproved),
            (Submitted, ReportAction::RequestRevision(notes)) => {
                if notes.trim().is_empty() {
                    return Err(AppError::new(
                        ErrorCode::RevisionNotesRequired,
                        "revision notes must not be empty",
                    ));
                }
                Ok(RevisionRequested)
            }
            (from, action) => Err(AppError::new(
                ErrorCode::InvalidReportTransition,
                format!("cannot {} a report in status {from}", action.name()),
            )),
        }
    }
}

/// Activity window required before a report may be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityTime {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

pub fn require_activity_time(
    date: Option<NaiveDate>,
    start: Option<NaiveTime>,
    end: Option<NaiveTime>,
) -> AppResult<ActivityTime> {
    let (Some(date), Some(start), Some(end)) = (date, start, end) else {
        return Err(AppError::new(
            ErrorCode::InvalidActivityTime,
            "actual date, start time and end time are required to submit",
        ));
    };
    check_span(Some(start), Some(end))?;
    Ok(ActivityTime { date, start, end })
}

/// End must be after start whenever both are known.
pub fn check_span(start: Option<NaiveTime>, end: Option<NaiveTime>) -> AppResult<()> {
    match (start, end) {
        (Some(start), Some(end)) if end <= start => Err(AppError::new(
            ErrorCode::InvalidActivityTime,
            "end time must be after start time",
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::status::ReportStatus::*;

    fn t(h: u32, m: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(h, m, 0)
    }

    #[test]
    fn legal_transitions() {
        assert_eq!(Draft.apply(ReportAction::Submit).unwrap(), Submitted);
        assert_eq!(RevisionRequested.apply(ReportAction::Submit).unwrap(), Submitted);
        assert_eq!(Submitted.apply(ReportAction::Approve).unwrap(), AdminApproved);
        assert_eq!(
            Submitted.apply(ReportAction::RequestRevision("time incorrect")).unwrap(),
            RevisionRequested
        );
        assert_eq!(Draft.apply(ReportAction::Edit).unwrap(), Draft);
        assert_eq!(RevisionRequested.apply(ReportAction::Edit).unwrap(), RevisionRequested);
    }

    #[test]
    fn approved_is_terminal() {
        for action in [
            ReportAction::Edit,
            ReportAction::Submit,
            ReportAction::Approve,
            ReportAction::RequestRevision("again"),
        ] {
            let err = AdminApproved.apply(action).unwrap_err();
            assert_eq!(err.code(), Some(ErrorCode::ReportFinalized));
        }
    }

    #[test]
    fn out_of_order_actions_are_rejected() {
        let err = Draft.apply(ReportAction::Approve).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::InvalidReportTransition));

        let err = Submitted.apply(ReportAction::Edit).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::InvalidReportTransition));

        let err = Submitted.apply(ReportAction::Submit).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::InvalidReportTransition));

        let err = RevisionRequested.apply(ReportAction::RequestRevision("x")).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::InvalidReportTransition));
    }

    #[test]
    fn revision_needs_notes() {
        let err = Submitted.apply(ReportAction::RequestRevision("   ")).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::RevisionNotesRequired));
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn revision_loop_reaches_terminal() {
        let status = Draft
            .apply(ReportAction::Submit)
            .and_then(|s| s.apply(ReportAction::RequestRevision("time incorrect")))
            .and_then(|s| s.apply(ReportAction::Edit))
            .and_then(|s| s.apply(ReportAction::Submit))
            .and_then(|s| s.apply(ReportAction::Approve))
            .unwrap();
        assert!(status.is_terminal());
    }

    #[test]
    fn submission_requires_full_activity_window() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2);
        let ok = require_activity_time(date, t(9, 0), t(10, 45)).unwrap();
        assert_eq!(ok.start, t(9, 0).unwrap());

        let err = require_activity_time(date, t(9, 0), None).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::InvalidActivityTime));

        let err = require_activity_time(date, t(10, 0), t(10, 0)).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::InvalidActivityTime));

        assert!(check_span(t(10, 0), None).is_ok());
    }
}
