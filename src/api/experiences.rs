//! Work experience API endpoints.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::page_bounds;
use crate::auth;
use crate::errors::AppError;
use crate::models::{Experience, Page};
use crate::AppState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct ExperienceListQuery {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

/// GET /experiences - List experiences, most recent start date first
/// (public).
pub async fn list_experiences(
    State(state): State<AppState>,
    Query(params): Query<ExperienceListQuery>,
) -> Result<Json<Page<Value>>, AppError> {
    let (limit, offset) = page_bounds(params.limit, params.offset, DEFAULT_LIMIT, MAX_LIMIT)?;

    let (items, total) = state
        .store
        .select("experiences")
        .order_desc("start_date")
        .range(offset, limit)
        .fetch_with_count()
        .await?;
    Ok(Json(Page { items, total }))
}

/// POST /experiences - Create a new experience (admin only).
pub async fn create_experience(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(experience): Json<Experience>,
) -> Result<Json<Value>, AppError> {
    auth::require_admin(&state, &headers).await?;

    let row = serde_json::to_value(&experience)?;
    let mut rows = state.store.insert("experiences", &row).await?;
    if rows.is_empty() {
        return Err(AppError::Internal(
            "failed_to_create_experience".to_string(),
        ));
    }
    Ok(Json(rows.remove(0)))
}

/// POST /experiences/update - Update an experience (admin only).
pub async fn update_experience(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(data): Json<Value>,
) -> Result<Json<Value>, AppError> {
    auth::require_admin(&state, &headers).await?;

    let id = data
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::BadRequest("id_required".to_string()))?
        .to_string();

    let mut changes = data.as_object().cloned().unwrap_or_default();
    changes.remove("id");

    let mut rows = state
        .store
        .update("experiences", Value::Object(changes))
        .eq("id", &id)
        .execute()
        .await?;
    if rows.is_empty() {
        return Err(AppError::NotFound("experience_not_found".to_string()));
    }
    Ok(Json(rows.remove(0)))
}

/// DELETE /experiences/{id} - Delete an experience (admin only).
pub async fn delete_experience(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(experience_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    auth::require_admin(&state, &headers).await?;

    state
        .store
        .delete("experiences")
        .eq("id", experience_id)
        .execute()
        .await?;
    Ok(Json(json!({ "ok": true })))
}
