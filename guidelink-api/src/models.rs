use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use guidelink_shared::errors::AppResult;
use guidelink_shared::types::auth::UserRole;

use crate::domain::status::{
    ApplicationStatus, Audience, MatchingStatus, ReportStatus, RequestStatus, RequestType,
};
use crate::schema::{
    announcement_reads, announcements, chat_messages, chat_reads, guide_applications, matchings,
    notifications, reports, requests, users,
};

// --- User ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub is_approved: bool,
    pub name: String,
    pub name_kana: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> AppResult<UserRole> {
        self.role
            .parse()
            .map_err(|e: String| guidelink_shared::errors::AppError::internal(e))
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub is_approved: bool,
    pub name: String,
    pub name_kana: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = users)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub name_kana: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub updated_at: DateTime<Utc>,
}

// --- Request ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = requests)]
pub struct Request {
    pub id: Uuid,
    pub user_id: Uuid,
    pub request_type: String,
    pub request_date: NaiveDate,
    pub request_time: NaiveTime,
    pub address: String,
    pub masked_address: String,
    pub destination: Option<String>,
    pub notes: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Request {
    pub fn status(&self) -> AppResult<RequestStatus> {
        RequestStatus::from_column(&self.status)
    }

    pub fn request_type(&self) -> AppResult<RequestType> {
        RequestType::from_column(&self.request_type)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = requests)]
pub struct NewRequest {
    pub user_id: Uuid,
    pub request_type: String,
    pub request_date: NaiveDate,
    pub request_time: NaiveTime,
    pub address: String,
    pub masked_address: String,
    pub destination: Option<String>,
    pub notes: Option<String>,
}

// --- GuideApplication ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = guide_applications)]
pub struct GuideApplication {
    pub id: Uuid,
    pub request_id: Uuid,
    pub guide_id: Uuid,
    pub status: String,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GuideApplication {
    pub fn status(&self) -> AppResult<ApplicationStatus> {
        ApplicationStatus::from_column(&self.status)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = guide_applications)]
pub struct NewGuideApplication {
    pub request_id: Uuid,
    pub guide_id: Uuid,
    pub message: Option<String>,
}

// --- Matching ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = matchings)]
pub struct Matching {
    pub id: Uuid,
    pub request_id: Uuid,
    pub user_id: Uuid,
    pub guide_id: Uuid,
    pub status: String,
    pub matched_at: DateTime<Utc>,
    pub report_completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Matching {
    pub fn status(&self) -> AppResult<MatchingStatus> {
        MatchingStatus::from_column(&self.status)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = matchings)]
pub struct NewMatching {
    pub request_id: Uuid,
    pub user_id: Uuid,
    pub guide_id: Uuid,
}

// --- Chat ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = chat_messages)]
pub struct ChatMessage {
    pub id: Uuid,
    pub matching_id: Uuid,
    pub sender_id: Uuid,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = chat_messages)]
pub struct NewChatMessage<'a> {
    pub matching_id: Uuid,
    pub sender_id: Uuid,
    pub message: &'a str,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = chat_reads)]
pub struct NewChatRead {
    pub matching_id: Uuid,
    pub user_id: Uuid,
    pub last_read_at: DateTime<Utc>,
}

// --- Report ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = reports)]
pub struct Report {
    pub id: Uuid,
    pub matching_id: Uuid,
    pub user_id: Uuid,
    pub guide_id: Uuid,
    pub request_id: Uuid,
    pub actual_date: Option<NaiveDate>,
    pub actual_start_time: Option<NaiveTime>,
    pub actual_end_time: Option<NaiveTime>,
    pub service_content: Option<String>,
    pub report_content: Option<String>,
    pub status: String,
    pub revision_notes: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Report {
    pub fn status(&self) -> AppResult<ReportStatus> {
        ReportStatus::from_column(&self.status)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = reports)]
pub struct NewReport {
    pub matching_id: Uuid,
    pub user_id: Uuid,
    pub guide_id: Uuid,
    pub request_id: Uuid,
    pub actual_date: Option<NaiveDate>,
    pub actual_start_time: Option<NaiveTime>,
    pub actual_end_time: Option<NaiveTime>,
    pub service_content: Option<String>,
    pub report_content: Option<String>,
}

/// Guide edits; `None` leaves a column untouched.
#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = reports)]
pub struct ReportChanges {
    pub actual_date: Option<NaiveDate>,
    pub actual_start_time: Option<NaiveTime>,
    pub actual_end_time: Option<NaiveTime>,
    pub service_content: Option<String>,
    pub report_content: Option<String>,
}

// --- Announcement ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = announcements)]
pub struct Announcement {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub target_audience: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Announcement {
    pub fn audience(&self) -> AppResult<Audience> {
        Audience::from_column(&self.target_audience)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = announcements)]
pub struct NewAnnouncement {
    pub title: String,
    pub content: String,
    pub target_audience: String,
    pub created_by: Uuid,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = announcement_reads)]
pub struct NewAnnouncementRead {
    pub announcement_id: Uuid,
    pub user_id: Uuid,
    pub read_at: DateTime<Utc>,
}

#[derive(Debug, Queryable, Serialize, Clone)]
#[diesel(table_name = announcement_reads)]
pub struct AnnouncementRead {
    pub announcement_id: Uuid,
    pub user_id: Uuid,
    pub read_at: DateTime<Utc>,
}

// --- Notification ---

#[derive(Debug, Queryable, Identifiable, Serialize)]
#[diesel(table_name = notifications)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_type: String,
    pub title: String,
    pub body: String,
    pub data: Option<serde_json::Value>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = notifications)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub notification_type: String,
    pub title: String,
    pub body: String,
    pub data: Option<serde_json::Value>,
}
