use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::warn;

use crate::auth::jwt::JwtKeys;
use crate::auth::repo::{Role, User};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::state::AppState;

pub const TOKEN_COOKIE: &str = "token";

/// Session cookie carrying the signed token. HttpOnly and SameSite=Strict
/// always; Secure in production.
pub fn session_cookie(config: &AppConfig, token: String) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token))
        .http_only(true)
        .secure(config.production)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(time::Duration::minutes(config.jwt.ttl_minutes))
        .build()
}

/// Overwrites the session cookie with an immediately-expiring one.
pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, ""))
        .http_only(true)
        .path("/")
        .max_age(time::Duration::ZERO)
        .build()
}

/// Validates the session cookie and resolves the calling user.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(TOKEN_COOKIE)
            .map(|c| c.value().to_string())
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(&token).map_err(|_| {
            warn!("invalid or expired token");
            ApiError::unauthorized("Invalid or expired token")
        })?;

        let user = User::find_by_id(&state.db, claims.sub)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Invalid or expired token"))?;

        Ok(AuthUser(user))
    }
}

/// AuthUser plus the manager role check; rejects with 403, not 401.
pub struct ManagerUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for ManagerUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if user.role != Role::Manager {
            warn!(user_id = %user.id, "manager route denied");
            return Err(ApiError::forbidden("Access denied. Manager role required."));
        }
        Ok(ManagerUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn session_cookie_is_hardened() {
        let state = AppState::fake();
        let cookie = session_cookie(&state.config, "tok".into());
        assert_eq!(cookie.name(), TOKEN_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.path(), Some("/"));
        // fake config is non-production
        assert_ne!(cookie.secure(), Some(true));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie();
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
    }
}
