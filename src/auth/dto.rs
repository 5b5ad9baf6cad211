use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo::{Role, User};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub lastname: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for resend-verification and forgot-password.
#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailQuery {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// Public part of the user returned to the client. Never carries the hash.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub lastname: String,
    pub role: Role,
    pub is_verified: bool,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            name: u.name.clone(),
            lastname: u.lastname.clone(),
            role: u.role,
            is_verified: u.is_verified,
        }
    }
}

/// Message-only response (logout, anti-enumeration flows, password reset).
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Message plus user summary (register, login, verify, role change).
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub user: PublicUser,
}

/// Current identity (`/me`).
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: PublicUser,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "alice@x.com".into(),
            name: "Alice".into(),
            lastname: "Smith".into(),
            password_hash: "$argon2id$...".into(),
            role: Role::User,
            is_verified: true,
            verification_token: None,
            verification_token_expiry: None,
            reset_token: None,
            reset_token_expiry: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn public_user_omits_password_hash() {
        let public = PublicUser::from(&sample_user());
        let json = serde_json::to_string(&public).unwrap();
        assert!(json.contains("alice@x.com"));
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"role\":\"user\""));
    }

    #[test]
    fn user_serialization_skips_hash() {
        let json = serde_json::to_value(sample_user()).unwrap();
        assert!(json.get("password_hash").is_none());
    }
}
