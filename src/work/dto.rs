use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::dto::PublicUser;
use crate::work::report::{ReportUser, UserReport, YearReport};

/// Optional filters for report queries. `user_id` is only honored for
/// managers.
#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub date: Option<String>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct TargetQuery {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct StartedSession {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    pub date: String,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub message: String,
    pub session: StartedSession,
}

#[derive(Debug, Serialize)]
pub struct EndedSession {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,
    pub total_hours: f64,
    pub date: String,
}

#[derive(Debug, Serialize)]
pub struct EndSessionResponse {
    pub message: String,
    pub session: EndedSession,
}

/// Active session with live-computed hours. The owner is embedded only in
/// the manager view.
#[derive(Debug, Serialize)]
pub struct CurrentSession {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    pub current_hours: f64,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<ReportUser>,
}

#[derive(Debug, Serialize)]
pub struct CurrentSessionResponse {
    pub message: String,
    pub session: Option<CurrentSession>,
}

#[derive(Debug, Serialize)]
pub struct DailyReportResponse {
    pub message: String,
    pub data: Vec<YearReport>,
}

#[derive(Debug, Serialize)]
pub struct TeamReportResponse {
    pub message: String,
    pub data: Vec<UserReport>,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub message: String,
    pub users: Vec<PublicUser>,
}
