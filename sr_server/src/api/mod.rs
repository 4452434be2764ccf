//! HTTP API for the inventory store server.
//!
//! # Architecture
//!
//! The API is built with:
//! - **Axum**: Async web framework
//! - **Tower**: Middleware for CORS and request correlation
//! - **Cookie sessions**: Opaque server-held tokens in an HttpOnly cookie
//!
//! # Modules
//!
//! - [`auth`]: Registration, login, logout
//! - [`items`]: Per-user inventory items (authenticated only)
//! - [`admin`]: User administration (admin only)
//! - [`middleware`]: Session cookie handling and the authorization gate
//!
//! # Endpoints Overview
//!
//! ## Public
//! - `GET  /health` - Server health status
//! - `GET  /` - Redirect to `/items` or `/login` based on session state
//! - `POST /api/v1/auth/register` - Register and start a session
//! - `POST /api/v1/auth/login` - Login with credentials
//! - `POST /api/v1/auth/logout` - End the current session
//!
//! ## Authenticated
//! - `GET    /api/v1/items` - List own items
//! - `POST   /api/v1/items` - Create item
//! - `PUT    /api/v1/items/{id}` - Update item
//! - `DELETE /api/v1/items/{id}` - Delete item
//!
//! ## Admin only
//! - `GET    /api/v1/admin/users` - List all users
//! - `DELETE /api/v1/admin/users/{id}` - Delete user
//! - `POST   /api/v1/admin/users/{id}/lock` - Toggle account lock

pub mod admin;
pub mod auth;
pub mod items;
pub mod middleware;
pub mod request_id;

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post, put},
};
use serde_json::json;
use std::sync::Arc;
use stockroom::auth::{Access, AuthManager, require_authenticated};
use stockroom::db::Database;
use stockroom::inventory::ItemRepository;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
///
/// Cloned per request (cheap due to Arc wrappers).
#[derive(Clone)]
pub struct AppState {
    /// Authentication service and session store
    pub auth: Arc<AuthManager>,
    /// Item records read by protected routes
    pub items: Arc<dyn ItemRepository>,
    /// Database handle for health checks; absent when running against an
    /// in-memory store in tests
    pub db: Option<Database>,
    /// Whether session cookies carry the Secure attribute
    pub cookie_secure: bool,
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout));

    let admin_routes = Router::new()
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/{user_id}", delete(admin::delete_user))
        .route("/admin/users/{user_id}/lock", post(admin::toggle_lock))
        .layer(axum::middleware::from_fn(middleware::admin_middleware));

    let protected_routes = Router::new()
        .route("/items", get(items::list_items).post(items::create_item))
        .route(
            "/items/{item_id}",
            put(items::update_item).delete(items::delete_item),
        )
        .merge(admin_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/", get(root_redirect))
        .nest("/api/v1", public_routes.merge(protected_routes))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Redirect `/` to the items screen for live sessions, otherwise to login.
async fn root_redirect(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let token = middleware::extract_session_token(&headers);
    match require_authenticated(state.auth.sessions(), token.as_deref()) {
        Access::Granted(_) => middleware::redirect_to("/items"),
        _ => middleware::redirect_to("/login"),
    }
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the database responds, `503 Service Unavailable`
/// otherwise.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = match &state.db {
        Some(db) => db.health_check().await.is_ok(),
        None => true,
    };

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
