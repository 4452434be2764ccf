//! Authentication API handlers.
//!
//! Registration and login establish a session and answer with a redirect to
//! the items screen, mirroring the form-driven flow the frontend uses.
//! Error responses carry a JSON body with a client-safe message only; the
//! status codes are part of the boundary contract:
//!
//! - `400 Bad Request`: malformed input or policy violation
//! - `401 Unauthorized`: bad credentials (unknown email and wrong password
//!   are indistinguishable)
//! - `403 Forbidden`: locked account
//! - `409 Conflict`: duplicate registration
//! - `500 Internal Server Error`: storage failure, detail logged server-side

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;
use stockroom::auth::{AuthError, LoginRequest, RegisterRequest};
use tracing::error;

use super::{AppState, middleware};
use crate::logging::log_security_event;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Map an authentication error to its response.
///
/// Every variant maps to a fixed status code; the body always goes through
/// [`AuthError::client_message`] so storage detail never leaves the server.
fn error_response(err: &AuthError) -> Response {
    let status = match err {
        AuthError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
        AuthError::AccountLocked => StatusCode::FORBIDDEN,
        AuthError::DuplicateAccount => StatusCode::CONFLICT,
        AuthError::HashingFailed | AuthError::Storage(_) => {
            error!("authentication backend failure: {err}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (
        status,
        Json(ErrorResponse {
            error: err.client_message(),
        }),
    )
        .into_response()
}

/// Respond with a redirect to the items screen plus the session cookie.
fn session_established(state: &AppState, token: &str) -> Response {
    let max_age = state.auth.sessions().idle_timeout().as_secs();
    let mut response = middleware::redirect_to("/items");
    match middleware::session_cookie(token, max_age, state.cookie_secure) {
        Ok(cookie) => {
            response.headers_mut().insert(SET_COOKIE, cookie);
            response
        }
        Err(err) => {
            error!("failed to build session cookie: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal server error" })),
            )
                .into_response()
        }
    }
}

/// Register a new user account and automatically log them in.
///
/// # Request Body
///
/// ```json
/// {
///   "email": "alice@example.com",
///   "username": "alice",
///   "password": "Str0ng!Pass"
/// }
/// ```
///
/// On success the new account is bound to a fresh session and the client is
/// redirected to `/items` with the session cookie set.
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
) -> Response {
    let prior = middleware::extract_session_token(&headers);

    match state.auth.register(payload, prior.as_deref()).await {
        Ok((_user, token)) => session_established(&state, &token),
        Err(err) => error_response(&err),
    }
}

/// Authenticate a user and start a session.
///
/// The session token is regenerated on every successful login, so a cookie
/// captured before authentication is worthless afterwards. Failed attempts
/// count toward the account lockout threshold.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Response {
    let prior = middleware::extract_session_token(&headers);

    match state
        .auth
        .login(&payload.email, &payload.password, prior.as_deref())
        .await
    {
        Ok((_user, token)) => session_established(&state, &token),
        Err(err) => {
            match &err {
                AuthError::Unauthorized => {
                    log_security_event("failed_login", None, "Invalid credentials");
                }
                AuthError::AccountLocked => {
                    log_security_event("account_locked", None, "Login attempt on locked account");
                }
                _ => {}
            }
            error_response(&err)
        }
    }
}

/// End the current session.
///
/// Always clears the cookie and redirects to the login screen, whether or
/// not a live session was attached to the request.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = middleware::extract_session_token(&headers) {
        state.auth.logout(&token);
    }

    let mut response = middleware::redirect_to("/login");
    if let Ok(cookie) = middleware::clear_session_cookie(state.cookie_secure) {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    response
}
