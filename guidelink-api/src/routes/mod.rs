pub mod admin;
pub mod announcements;
pub mod auth;
pub mod chat;
pub mod dashboard;
pub mod health;
pub mod matchings;
pub mod notifications;
pub mod reports;
pub mod requests;

/// Calendar date used for "today" checks and monthly usage windows.
pub(crate) fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}
