//! Session cookie handling and authorization middleware.
//!
//! The session cookie carries only an opaque token; the canonical session
//! state lives server-side. Cookies are `HttpOnly` and `SameSite=Strict`,
//! with a `Max-Age` equal to the session idle timeout, and `Secure` unless
//! explicitly disabled for local development.
//!
//! Two middleware layers implement the gate:
//! - [`auth_middleware`] touches the session and redirects missing or
//!   expired sessions back to the login screen
//! - [`admin_middleware`] runs after it and answers role mismatches with
//!   `403 Forbidden`, which must stay distinct from the login redirect

use axum::{
    extract::{Request, State},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{COOKIE, InvalidHeaderValue, LOCATION},
    },
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use stockroom::auth::{Access, Role, SessionSnapshot, require_authenticated, require_role};

use super::AppState;

/// Session cookie name
pub const SESSION_COOKIE_NAME: &str = "sid";

/// Path clients are sent to when authentication is required
const LOGIN_REDIRECT: &str = "/login?errorMessage=Session%20expired.%20Please%20log%20in%20again.";

/// Build a 302 redirect response
pub fn redirect_to(location: &str) -> Response {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(location) {
        headers.insert(LOCATION, value);
    }
    (StatusCode::FOUND, headers).into_response()
}

/// Build the session cookie for a freshly authenticated session.
pub fn session_cookie(
    token: &str,
    max_age_secs: u64,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Strict; Max-Age={max_age_secs}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Build the cookie that clears the session on logout.
pub fn clear_session_cookie(secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Extract the session token from the request's cookies, if present.
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == SESSION_COOKIE_NAME {
            return Some(val.to_string());
        }
    }
    None
}

/// Authentication middleware for protected routes.
///
/// Touches the session before the handler runs, so idle expiry is enforced
/// ahead of any protected-resource access. On success the
/// [`SessionSnapshot`] is injected into request extensions for downstream
/// handlers; otherwise the client is redirected to the login screen with a
/// generic message that does not reveal why the session was rejected.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = extract_session_token(request.headers());

    match require_authenticated(state.auth.sessions(), token.as_deref()) {
        Access::Granted(snapshot) => {
            request.extensions_mut().insert(snapshot);
            next.run(request).await
        }
        _ => redirect_to(LOGIN_REDIRECT),
    }
}

/// Admin middleware, applied inside [`auth_middleware`].
///
/// Reads the session snapshot the authentication layer injected; a missing
/// snapshot means the layering is wrong and is answered like a role
/// mismatch rather than letting the request through.
pub async fn admin_middleware(request: Request, next: Next) -> Response {
    let allowed = request
        .extensions()
        .get::<SessionSnapshot>()
        .is_some_and(|snapshot| matches!(require_role(snapshot, Role::Admin), Access::Granted(_)));

    if allowed {
        next.run(request).await
    } else {
        crate::logging::log_security_event("admin_denied", None, "Non-admin hit an admin route");
        (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Access Denied: Admins only" })),
        )
            .into_response()
    }
}
