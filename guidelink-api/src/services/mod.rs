pub mod announcement_service;
pub mod auth_service;
pub mod chat_service;
pub mod dashboard_service;
pub mod matching_service;
pub mod notification_service;
pub mod report_service;
pub mod request_service;
pub mod user_service;
