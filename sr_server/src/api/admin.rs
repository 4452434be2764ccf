//! User administration handlers.
//!
//! These routes sit behind both the authentication and admin middleware.
//! The user listing exposes account and lock state but never password
//! digests; toggling a lock off also resets the failed-attempt counter so
//! the account gets a fresh run of attempts.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;
use stockroom::auth::{AuthError, Role, User, UserId};
use tracing::error;

use super::AppState;

/// Admin view of one account
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub role: Role,
    pub is_locked: bool,
    pub failed_attempts: i32,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            role: user.role,
            is_locked: user.is_locked,
            failed_attempts: user.failed_attempts,
        }
    }
}

fn storage_error(err: &AuthError) -> Response {
    error!("admin storage failure: {err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
        .into_response()
}

/// List all user accounts.
pub async fn list_users(State(state): State<AppState>) -> Response {
    match state.auth.list_users().await {
        Ok(users) => {
            let summaries: Vec<UserSummary> = users.into_iter().map(UserSummary::from).collect();
            Json(summaries).into_response()
        }
        Err(err) => storage_error(&err),
    }
}

/// Delete a user account.
pub async fn delete_user(State(state): State<AppState>, Path(user_id): Path<UserId>) -> Response {
    match state.auth.delete_user(user_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => storage_error(&err),
    }
}

/// Toggle a user's lock state.
///
/// Locking takes effect on the next login attempt; unlocking resets the
/// failed-attempt counter. Returns the updated account.
pub async fn toggle_lock(State(state): State<AppState>, Path(user_id): Path<UserId>) -> Response {
    match state.auth.toggle_lock(user_id).await {
        Ok(Some(user)) => Json(UserSummary::from(user)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "User not found" })),
        )
            .into_response(),
        Err(err) => storage_error(&err),
    }
}
