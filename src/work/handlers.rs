use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::{format_description::BorrowedFormatItem, macros::format_description, Date, OffsetDateTime};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{
        dto::PublicUser,
        extractors::{AuthUser, ManagerUser},
        repo::{Role, User},
    },
    error::ApiError,
    state::AppState,
    work::{
        dto::{
            CurrentSession, CurrentSessionResponse, DailyReportResponse, EndSessionResponse,
            EndedSession, ReportQuery, StartSessionResponse, StartedSession, TargetQuery,
            TeamReportResponse, UsersResponse,
        },
        repo::{self, WorkSession},
        report::{build_team, build_yearly, elapsed_hours, round_hours, ReportUser},
    },
};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

fn parse_date(s: &str) -> Result<Date, ApiError> {
    Date::parse(s, DATE_FORMAT)
        .map_err(|_| ApiError::validation("Invalid date. Expected YYYY-MM-DD"))
}

/// Managers may act on another user's data; everyone else is pinned to
/// their own.
fn resolve_target(user: &User, requested: Option<Uuid>) -> Uuid {
    match requested {
        Some(id) if user.role == Role::Manager => id,
        _ => user.id,
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/start", post(start_session))
        .route("/end", post(end_session))
        .route("/daily", get(daily_report))
        .route("/current", get(current_session))
        .route("/users", get(list_users))
        .route("/all-sessions", get(all_sessions))
}

#[instrument(skip(state, user))]
pub async fn start_session(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<(StatusCode, Json<StartSessionResponse>), ApiError> {
    let now = OffsetDateTime::now_utc();
    let session = WorkSession::start(&state.db, user.id, now, now.date())
        .await?
        .ok_or_else(|| {
            ApiError::conflict(
                "You already have an active work session. Please end it before starting a new one.",
            )
        })?;

    info!(user_id = %user.id, session_id = %session.id, "work session started");
    Ok((
        StatusCode::CREATED,
        Json(StartSessionResponse {
            message: "Work session started".into(),
            session: StartedSession {
                id: session.id,
                start_time: session.start_time,
                date: session.date.to_string(),
            },
        }),
    ))
}

#[instrument(skip(state, user))]
pub async fn end_session(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<EndSessionResponse>, ApiError> {
    let now = OffsetDateTime::now_utc();
    let session = WorkSession::close(&state.db, user.id, now)
        .await?
        .ok_or_else(|| {
            ApiError::conflict(
                "No active work session found. Please start a work session first.",
            )
        })?;

    info!(
        user_id = %user.id,
        session_id = %session.id,
        hours = session.total_hours,
        "work session ended"
    );
    Ok(Json(EndSessionResponse {
        message: "Work session ended".into(),
        session: EndedSession {
            id: session.id,
            start_time: session.start_time,
            end_time: session.end_time,
            total_hours: round_hours(session.total_hours),
            date: session.date.to_string(),
        },
    }))
}

#[instrument(skip(state, user))]
pub async fn current_session(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<TargetQuery>,
) -> Result<Json<CurrentSessionResponse>, ApiError> {
    let is_manager = user.role == Role::Manager;
    let target = resolve_target(&user, query.user_id);

    let Some(session) = WorkSession::find_active(&state.db, target).await? else {
        return Ok(Json(CurrentSessionResponse {
            message: "No active session".into(),
            session: None,
        }));
    };

    let owner = if is_manager {
        User::find_by_id(&state.db, target).await?.map(|u| ReportUser {
            id: u.id,
            name: u.name,
            lastname: u.lastname,
            email: u.email,
        })
    } else {
        None
    };

    let now = OffsetDateTime::now_utc();
    Ok(Json(CurrentSessionResponse {
        message: "Active session found".into(),
        session: Some(CurrentSession {
            id: session.id,
            start_time: session.start_time,
            current_hours: round_hours(elapsed_hours(session.start_time, now)),
            date: session.date.to_string(),
            user: owner,
        }),
    }))
}

#[instrument(skip(state, user))]
pub async fn daily_report(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<ReportQuery>,
) -> Result<Json<DailyReportResponse>, ApiError> {
    let target = resolve_target(&user, query.user_id);
    let date = query.date.as_deref().map(parse_date).transpose()?;

    let rows = repo::list_closed(&state.db, Some(target), date).await?;
    Ok(Json(DailyReportResponse {
        message: "Daily working hours retrieved".into(),
        data: build_yearly(&rows),
    }))
}

#[instrument(skip(state, _manager))]
pub async fn list_users(
    State(state): State<AppState>,
    ManagerUser(_manager): ManagerUser,
) -> Result<Json<UsersResponse>, ApiError> {
    let users = User::list_all(&state.db).await?;
    Ok(Json(UsersResponse {
        message: "Users retrieved successfully".into(),
        users: users.iter().map(PublicUser::from).collect(),
    }))
}

#[instrument(skip(state, _manager))]
pub async fn all_sessions(
    State(state): State<AppState>,
    ManagerUser(_manager): ManagerUser,
    Query(query): Query<ReportQuery>,
) -> Result<Json<TeamReportResponse>, ApiError> {
    let date = query.date.as_deref().map(parse_date).transpose()?;

    let rows = repo::list_closed(&state.db, query.user_id, date).await?;
    Ok(Json(TeamReportResponse {
        message: "All work sessions retrieved".into(),
        data: build_team(&rows),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_accepts_iso_dates() {
        let date = parse_date("2024-03-05").expect("valid date");
        assert_eq!(date, time::macros::date!(2024-03-05));
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert!(parse_date("03/05/2024").is_err());
        assert!(parse_date("2024-13-01").is_err());
        assert!(parse_date("").is_err());
    }
}
