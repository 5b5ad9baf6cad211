use axum::{
    extract::{FromRef, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, EmailRequest, LoginRequest, MessageResponse, PublicUser,
            RegisterRequest, ResetPasswordRequest, UserResponse, VerifyEmailQuery,
        },
        extractors::{clear_session_cookie, session_cookie, AuthUser},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::User,
        tokens::generate_token,
    },
    error::ApiError,
    mailer::MailKind,
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 6;
const VERIFICATION_TOKEN_TTL: Duration = Duration::hours(24);
const RESET_TOKEN_TTL: Duration = Duration::hours(1);

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/verify-email", get(verify_email))
        .route("/resend-verification", post(resend_verification))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    let name = payload.name.trim();
    let lastname = payload.lastname.trim();

    if payload.email.is_empty() || name.is_empty() || lastname.is_empty() || payload.password.is_empty()
    {
        return Err(ApiError::validation("Please provide all fields"));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::validation("Invalid email"));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(
            "Password must be at least 6 characters",
        ));
    }

    let hash = hash_password(&payload.password)?;
    let token = generate_token();
    let expiry = OffsetDateTime::now_utc() + VERIFICATION_TOKEN_TTL;

    // The unique index on email is authoritative; create() reports a
    // duplicate as None even when two registrations race.
    let user = User::create(&state.db, &payload.email, name, lastname, &hash, &token, expiry)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "email already registered");
            ApiError::conflict("User already exists with this email")
        })?;

    // Best-effort dispatch: registration succeeds even if the email fails.
    if let Err(e) = state
        .mailer
        .send(MailKind::Verification, &user.email, &user.name, &token)
        .await
    {
        error!(error = %e, email = %user.email, "failed to send verification email");
    }

    if !state.config.production {
        info!(email = %user.email, %token, "verification token (dev only)");
    }

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully. Please check your email to verify your account."
                .into(),
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(mut payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("Please provide email and password"));
    }

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login unknown email");
            ApiError::unauthorized("Invalid credentials")
        })?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    // Distinct from the generic credential failure.
    if !user.is_verified {
        return Err(ApiError::forbidden(
            "Please verify your email address before logging in.",
        ));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;
    let jar = jar.add(session_cookie(&state.config, token));

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok((
        jar,
        Json(AuthResponse {
            message: "Login successful".into(),
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip(jar))]
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    let jar = jar.add(clear_session_cookie());
    (jar, Json(MessageResponse::new("Logged out successfully")))
}

#[instrument(skip(state, jar, query))]
pub async fn verify_email(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::validation("Verification token is required"))?;

    let now = OffsetDateTime::now_utc();
    // Unknown and expired tokens are indistinguishable to the caller.
    let user = User::verify_email(&state.db, &token, now)
        .await?
        .ok_or_else(|| {
            warn!("verification with invalid or expired token");
            ApiError::validation("Invalid or expired verification token")
        })?;

    let keys = JwtKeys::from_ref(&state);
    let session = keys.sign(user.id)?;
    let jar = jar.add(session_cookie(&state.config, session));

    info!(user_id = %user.id, email = %user.email, "email verified");
    Ok((
        jar,
        Json(AuthResponse {
            message: "Email verified successfully".into(),
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn resend_verification(
    State(state): State<AppState>,
    Json(payload): Json<EmailRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }

    let Some(user) = User::find_by_email(&state.db, &email).await? else {
        // Don't reveal whether the account exists.
        return Ok(Json(MessageResponse::new(
            "If an account exists with this email, a verification link has been sent.",
        )));
    };

    if user.is_verified {
        return Err(ApiError::validation("Email is already verified"));
    }

    let token = generate_token();
    let expiry = OffsetDateTime::now_utc() + VERIFICATION_TOKEN_TTL;
    User::set_verification_token(&state.db, user.id, &token, expiry).await?;

    // Unlike registration, a delivery failure here is the whole point of
    // the request, so it is surfaced.
    state
        .mailer
        .send(MailKind::Verification, &user.email, &user.name, &token)
        .await
        .map_err(|e| {
            error!(error = %e, email = %user.email, "failed to send verification email");
            ApiError::Internal(e.context("send verification email"))
        })?;

    if !state.config.production {
        info!(email = %user.email, %token, "verification token (dev only)");
    }

    Ok(Json(MessageResponse::new(
        "Verification email sent. Please check your inbox.",
    )))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<EmailRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }

    let generic = MessageResponse::new(
        "If an account exists with this email, a password reset link has been sent.",
    );

    let Some(user) = User::find_by_email(&state.db, &email).await? else {
        return Ok(Json(generic));
    };

    let token = generate_token();
    let expiry = OffsetDateTime::now_utc() + RESET_TOKEN_TTL;
    User::set_reset_token(&state.db, user.id, &token, expiry).await?;

    state
        .mailer
        .send(MailKind::PasswordReset, &user.email, &user.name, &token)
        .await
        .map_err(|e| {
            error!(error = %e, email = %user.email, "failed to send password reset email");
            ApiError::Internal(e.context("send password reset email"))
        })?;

    Ok(Json(generic))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.token.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("Token and password are required"));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(
            "Password must be at least 6 characters",
        ));
    }

    let hash = hash_password(&payload.password)?;
    let now = OffsetDateTime::now_utc();

    // Single-statement consume: the token pair is cleared together with the
    // password change, so a second attempt with the same token fails.
    let user = User::reset_password(&state.db, &payload.token, &hash, now)
        .await?
        .ok_or_else(|| {
            warn!("password reset with invalid or expired token");
            ApiError::validation("Invalid or expired reset token")
        })?;

    info!(user_id = %user.id, "password reset");
    Ok(Json(MessageResponse::new(
        "Password reset successfully. You can now login with your new password.",
    )))
}

#[instrument(skip(user))]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(UserResponse {
        user: PublicUser::from(&user),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_regex_accepts_plausible_addresses() {
        assert!(is_valid_email("alice@x.com"));
        assert!(is_valid_email("a.b+c@sub.domain.org"));
    }

    #[test]
    fn email_regex_rejects_malformed_addresses() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@x.com"));
    }
}
