//! Contact message API endpoints.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};

use crate::auth;
use crate::errors::AppError;
use crate::models::Message;
use crate::AppState;

/// GET /messages - List all messages, newest first (admin only).
pub async fn list_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Value>>, AppError> {
    auth::require_admin(&state, &headers).await?;

    let rows = state
        .store
        .select("messages")
        .order_desc("created_at")
        .fetch()
        .await?;
    Ok(Json(rows))
}

/// POST /messages - Create a new contact message (public).
pub async fn create_message(
    State(state): State<AppState>,
    Json(message): Json<Message>,
) -> Result<Json<Value>, AppError> {
    let mut row = serde_json::Map::new();
    row.insert("name".to_string(), Value::String(message.name));
    row.insert("message".to_string(), Value::String(message.message));
    if let Some(email) = message.email {
        row.insert("email".to_string(), Value::String(email));
    }

    let mut rows = state.store.insert("messages", &Value::Object(row)).await?;
    if rows.is_empty() {
        return Err(AppError::Internal("failed_to_create_message".to_string()));
    }
    Ok(Json(rows.remove(0)))
}

/// PATCH|POST /messages/{id} - Update a message's read flag (admin only).
pub async fn update_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(message_id): Path<i64>,
    Json(data): Json<Value>,
) -> Result<Json<Value>, AppError> {
    auth::require_admin(&state, &headers).await?;

    let mut changes = serde_json::Map::new();
    if let Some(read) = data.get("read").and_then(Value::as_bool) {
        changes.insert("read".to_string(), Value::Bool(read));
    }
    if changes.is_empty() {
        return Err(AppError::BadRequest("no_updatable_fields".to_string()));
    }

    let mut rows = state
        .store
        .update("messages", Value::Object(changes))
        .eq("id", message_id)
        .execute()
        .await?;
    if rows.is_empty() {
        return Err(AppError::NotFound("message_not_found".to_string()));
    }
    Ok(Json(rows.remove(0)))
}

/// DELETE /messages/{id} - Delete a message (admin only).
pub async fn delete_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(message_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    auth::require_admin(&state, &headers).await?;

    state
        .store
        .delete("messages")
        .eq("id", message_id)
        .execute()
        .await?;
    Ok(Json(json!({ "ok": true })))
}

/// POST /messages/reset - Delete all messages and reset the id sequence
/// (admin only).
///
/// The fast-path truncate procedure may not exist; the fallback deletes all
/// rows and then resets the sequence best-effort.
pub async fn reset_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    auth::require_admin(&state, &headers).await?;

    if state.store.rpc("truncate_messages").await.is_err() {
        state
            .store
            .delete("messages")
            .neq("id", 0)
            .execute()
            .await?;
        if let Err(err) = state.store.rpc("reset_messages_identity").await {
            tracing::warn!("Failed to reset messages identity sequence: {}", err);
        }
    }
    Ok(Json(json!({ "ok": true })))
}
