use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Manager,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub lastname: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub is_verified: bool,
    pub verification_token: Option<String>,
    pub verification_token_expiry: Option<OffsetDateTime>,
    pub reset_token: Option<String>,
    pub reset_token_expiry: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

const USER_COLS: &str = "id, email, name, lastname, password_hash, role, is_verified, \
     verification_token, verification_token_expiry, reset_token, reset_token_expiry, created_at";

impl User {
    /// Find a user by normalized email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create an unverified user with a pending verification token.
    /// Returns `None` when the email is already taken.
    pub async fn create(
        db: &PgPool,
        email: &str,
        name: &str,
        lastname: &str,
        password_hash: &str,
        verification_token: &str,
        verification_token_expiry: OffsetDateTime,
    ) -> anyhow::Result<Option<User>> {
        let res = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, name, lastname, password_hash, \
                                verification_token, verification_token_expiry) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {USER_COLS}"
        ))
        .bind(email)
        .bind(name)
        .bind(lastname)
        .bind(password_hash)
        .bind(verification_token)
        .bind(verification_token_expiry)
        .fetch_one(db)
        .await;

        match res {
            Ok(user) => Ok(Some(user)),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Consume a live verification token: marks the account verified and
    /// clears the token pair in one statement. `None` when the token is
    /// unknown or expired.
    pub async fn verify_email(
        db: &PgPool,
        token: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users \
             SET is_verified = TRUE, verification_token = NULL, verification_token_expiry = NULL \
             WHERE verification_token = $1 AND verification_token_expiry > $2 \
             RETURNING {USER_COLS}"
        ))
        .bind(token)
        .bind(now)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Rotate the verification token (resend flow).
    pub async fn set_verification_token(
        db: &PgPool,
        id: Uuid,
        token: &str,
        expiry: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE users SET verification_token = $2, verification_token_expiry = $3 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .bind(expiry)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn set_reset_token(
        db: &PgPool,
        id: Uuid,
        token: &str,
        expiry: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE users SET reset_token = $2, reset_token_expiry = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .bind(expiry)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Consume a live reset token: swaps the password hash and clears the
    /// token pair atomically, so a consumed token can never be replayed.
    /// `None` when the token is unknown or expired.
    pub async fn reset_password(
        db: &PgPool,
        token: &str,
        password_hash: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users \
             SET password_hash = $2, reset_token = NULL, reset_token_expiry = NULL \
             WHERE reset_token = $1 AND reset_token_expiry > $3 \
             RETURNING {USER_COLS}"
        ))
        .bind(token)
        .bind(password_hash)
        .bind(now)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Change a user's role, addressed by normalized email.
    pub async fn set_role(db: &PgPool, email: &str, role: Role) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = $2 WHERE email = $1 RETURNING {USER_COLS}"
        ))
        .bind(email)
        .bind(role)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// All users, ascending by lastname then name, case-insensitive.
    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLS} FROM users ORDER BY LOWER(lastname), LOWER(name)"
        ))
        .fetch_all(db)
        .await?;
        Ok(users)
    }
}
