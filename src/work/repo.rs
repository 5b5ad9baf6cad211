use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct WorkSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub start_time: OffsetDateTime,
    pub end_time: Option<OffsetDateTime>,
    pub date: Date,
    pub total_hours: f64,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
}

/// A closed session joined with its owner, the aggregation input.
#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub start_time: OffsetDateTime,
    pub end_time: Option<OffsetDateTime>,
    pub date: Date,
    pub total_hours: f64,
    pub name: String,
    pub lastname: String,
    pub email: String,
}

const SESSION_COLS: &str =
    "id, user_id, start_time, end_time, date, total_hours, is_active, created_at";

impl WorkSession {
    /// Open a session stamped with `now` and its UTC calendar date.
    /// Returns `None` when the user already has an active session; the
    /// partial unique index makes this safe against concurrent starts.
    pub async fn start(
        db: &PgPool,
        user_id: Uuid,
        now: OffsetDateTime,
        date: Date,
    ) -> anyhow::Result<Option<WorkSession>> {
        let res = sqlx::query_as::<_, WorkSession>(&format!(
            "INSERT INTO work_sessions (user_id, start_time, date, is_active) \
             VALUES ($1, $2, $3, TRUE) \
             RETURNING {SESSION_COLS}"
        ))
        .bind(user_id)
        .bind(now)
        .bind(date)
        .fetch_one(db)
        .await;

        match res {
            Ok(session) => Ok(Some(session)),
            Err(sqlx::Error::Database(e))
                if e.constraint() == Some("work_sessions_one_active") =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Close the user's active session: stamps the end time, derives the
    /// elapsed hours at full precision and clears the active flag in one
    /// statement. The row is never mutated again. `None` when there is no
    /// active session.
    pub async fn close(
        db: &PgPool,
        user_id: Uuid,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<WorkSession>> {
        let session = sqlx::query_as::<_, WorkSession>(&format!(
            "UPDATE work_sessions \
             SET end_time = $2, \
                 total_hours = EXTRACT(EPOCH FROM ($2 - start_time)) / 3600.0, \
                 is_active = FALSE \
             WHERE user_id = $1 AND is_active \
             RETURNING {SESSION_COLS}"
        ))
        .bind(user_id)
        .bind(now)
        .fetch_optional(db)
        .await?;
        Ok(session)
    }

    pub async fn find_active(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<WorkSession>> {
        let session = sqlx::query_as::<_, WorkSession>(&format!(
            "SELECT {SESSION_COLS} FROM work_sessions WHERE user_id = $1 AND is_active"
        ))
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(session)
    }
}

/// Closed sessions with their owners, newest first, optionally filtered by
/// user and/or exact date.
pub async fn list_closed(
    db: &PgPool,
    user_id: Option<Uuid>,
    date: Option<Date>,
) -> anyhow::Result<Vec<SessionRow>> {
    let rows = sqlx::query_as::<_, SessionRow>(
        "SELECT s.id, s.user_id, s.start_time, s.end_time, s.date, s.total_hours, \
                u.name, u.lastname, u.email \
         FROM work_sessions s \
         JOIN users u ON u.id = s.user_id \
         WHERE s.is_active = FALSE \
           AND ($1::uuid IS NULL OR s.user_id = $1) \
           AND ($2::date IS NULL OR s.date = $2) \
         ORDER BY s.date DESC, s.start_time DESC",
    )
    .bind(user_id)
    .bind(date)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
