//! String-backed enums for the `varchar` status columns.
//!
//! Rows keep the raw string; services parse it through these types before
//! making any decision so unknown values surface as internal errors instead of
//! silently falling through a `match`.

use serde::{Deserialize, Serialize};

use guidelink_shared::errors::AppError;

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => $value:literal $(| $alias:literal)*),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }

            /// Parse a stored column value; unknown values are a data error.
            pub fn from_column(value: &str) -> Result<Self, AppError> {
                value.parse().map_err(|e: String| AppError::internal(e))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value $(| $alias)* => Ok($name::$variant),)+
                    _ => Err(format!(concat!("unknown ", stringify!($name), ": {}"), s)),
                }
            }
        }
    };
}

string_enum! {
    pub enum RequestType {
        Outing => "outing",
        Home => "home",
    }
}

string_enum! {
    pub enum RequestStatus {
        Pending => "pending",
        GuideAccepted => "guide_accepted",
        Matched => "matched",
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

string_enum! {
    pub enum ApplicationStatus {
        Pending => "pending",
        Selected => "selected",
        Matched => "matched",
        Declined => "declined",
    }
}

string_enum! {
    pub enum MatchingStatus {
        Matched => "matched",
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

string_enum! {
    /// `approved` is the legacy spelling of `admin_approved` found in older rows.
    pub enum ReportStatus {
        Draft => "draft",
        Submitted => "submitted",
        RevisionRequested => "revision_requested",
        AdminApproved => "admin_approved" | "approved",
    }
}

string_enum! {
    pub enum Audience {
        User => "user",
        Guide => "guide",
        All => "all",
    }
}

impl RequestStatus {
    /// Guides may still apply.
    pub fn accepts_applications(&self) -> bool {
        matches!(self, RequestStatus::Pending | RequestStatus::GuideAccepted)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Cancelled)
    }
}

impl MatchingStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, MatchingStatus::Matched | MatchingStatus::InProgress)
    }
}

impl ReportStatus {
    /// Statuses that count as a finalized report, including the legacy value.
    pub const APPROVED_VALUES: [&'static str; 2] = ["admin_approved", "approved"];

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportStatus::AdminApproved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_approved_parses_as_admin_approved() {
        assert_eq!("approved".parse::<ReportStatus>().unwrap(), ReportStatus::AdminApproved);
        assert_eq!(ReportStatus::AdminApproved.as_str(), "admin_approved");
        assert!(ReportStatus::AdminApproved.is_terminal());
    }

    #[test]
    fn every_variant_round_trips() {
        for status in RequestStatus::ALL {
            assert_eq!(status.as_str().parse::<RequestStatus>().unwrap(), *status);
        }
        for status in MatchingStatus::ALL {
            assert_eq!(status.as_str().parse::<MatchingStatus>().unwrap(), *status);
        }
        for status in ReportStatus::ALL {
            assert_eq!(status.as_str().parse::<ReportStatus>().unwrap(), *status);
        }
    }

    #[test]
    fn unknown_column_value_is_internal_error() {
        let err = RequestType::from_column("外出").unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn serde_uses_column_values() {
        assert_eq!(serde_json::to_value(ReportStatus::RevisionRequested).unwrap(), "revision_requested");
        assert_eq!(serde_json::from_value::<Audience>("all".into()).unwrap(), Audience::All);
    }
}
