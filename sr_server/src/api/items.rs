//! Inventory item handlers.
//!
//! All routes here sit behind the authentication middleware; the session
//! snapshot in request extensions identifies the owner, and every query is
//! scoped to that user. One user can never read or modify another's items.

use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use stockroom::auth::{AuthError, SessionSnapshot};
use stockroom::inventory::ItemInput;
use tracing::error;

use super::AppState;

fn storage_error(err: &AuthError) -> Response {
    error!("item storage failure: {err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
        .into_response()
}

/// List the authenticated user's items.
pub async fn list_items(
    State(state): State<AppState>,
    Extension(session): Extension<SessionSnapshot>,
) -> Response {
    match state.items.list_for_user(session.user_id).await {
        Ok(items) => Json(items).into_response(),
        Err(err) => storage_error(&err),
    }
}

/// Create an item owned by the authenticated user.
pub async fn create_item(
    State(state): State<AppState>,
    Extension(session): Extension<SessionSnapshot>,
    Json(input): Json<ItemInput>,
) -> Response {
    if input.name.trim().is_empty() || input.quantity < 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Item name and a non-negative quantity are required" })),
        )
            .into_response();
    }

    match state.items.create(session.user_id, input).await {
        Ok(item) => (StatusCode::CREATED, Json(item)).into_response(),
        Err(err) => storage_error(&err),
    }
}

/// Update one of the authenticated user's items.
pub async fn update_item(
    State(state): State<AppState>,
    Extension(session): Extension<SessionSnapshot>,
    Path(item_id): Path<i64>,
    Json(input): Json<ItemInput>,
) -> Response {
    if input.name.trim().is_empty() || input.quantity < 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Item name and a non-negative quantity are required" })),
        )
            .into_response();
    }

    match state.items.update(session.user_id, item_id, input).await {
        Ok(Some(item)) => Json(item).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Item not found" })),
        )
            .into_response(),
        Err(err) => storage_error(&err),
    }
}

/// Delete one of the authenticated user's items.
pub async fn delete_item(
    State(state): State<AppState>,
    Extension(session): Extension<SessionSnapshot>,
    Path(item_id): Path<i64>,
) -> Response {
    match state.items.delete(session.user_id, item_id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Item not found" })),
        )
            .into_response(),
        Err(err) => storage_error(&err),
    }
}
