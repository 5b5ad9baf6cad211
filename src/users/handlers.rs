use axum::{
    extract::State,
    routing::put,
    Json, Router,
};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, PublicUser},
        extractors::ManagerUser,
        repo::{Role, User},
    },
    error::ApiError,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub email: String,
    pub role: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/role", put(update_role))
}

#[instrument(skip(state, manager, payload))]
pub async fn update_role(
    State(state): State<AppState>,
    ManagerUser(manager): ManagerUser,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }

    let role = match payload.role.as_str() {
        "user" => Role::User,
        "manager" => Role::Manager,
        _ => {
            return Err(ApiError::validation(
                "Invalid role. Must be 'user' or 'manager'",
            ))
        }
    };

    let user = User::set_role(&state.db, &email, role)
        .await?
        .ok_or_else(|| {
            warn!(%email, "role change for unknown user");
            ApiError::not_found("User not found")
        })?;

    info!(manager_id = %manager.id, user_id = %user.id, role = ?role, "user role updated");
    Ok(Json(AuthResponse {
        message: "User role updated successfully".into(),
        user: PublicUser::from(&user),
    }))
}
