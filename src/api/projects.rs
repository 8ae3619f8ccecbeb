//! Project API endpoints.

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
use crate::models::{Page, Project};
use crate::AppState;

const DEFAULT_LIMIT: i64 = 24;
const MAX_LIMIT: i64 = 100;
const FEATURED_LIMIT: i64 = 6;

#[derive(Debug, Deserialize)]
pub struct ProjectListQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub stack: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

/// GET /projects - List projects with optional search and stack filtering.
pub async fn list_projects(
    State(state): State<AppState>,
    Query(params): Query<ProjectListQuery>,
) -> Result<Json<Page<Value>>, AppError> {
    let (limit, offset) = page_bounds(params.limit, params.offset, DEFAULT_LIMIT, MAX_LIMIT)?;

    let mut query = state.store.select("projects").order_desc("created_at");

    if let Some(q) = params.q.as_deref().filter(|q| !q.is_empty()) {
        query = query.search(&["title", "description"], q);
    }

    if let Some(stack) = params.stack.as_deref() {
        let parts: Vec<String> = stack
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect();
        if !parts.is_empty() {
            query = query.contains_all("stack", &parts);
        }
    }

    let (items, total) = query.range(offset, limit).fetch_with_count().await?;
    Ok(Json(Page { items, total }))
}

/// GET /projects/featured - Featured projects, newest first.
pub async fn featured_projects(State(state): State<AppState>) -> Result<Json<Vec<Value>>, AppError> {
    let items = state
        .store
        .select("projects")
        .eq("featured", true)
        .order_desc("created_at")
        .limit(FEATURED_LIMIT)
        .fetch()
        .await?;
    Ok(Json(items))
}

/// POST /projects - Create a new project (admin only).
pub async fn create_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(project): Json<Project>,
) -> Result<Json<Value>, AppError> {
    auth::require_admin(&state, &headers).await?;

    let row = serde_json::to_value(&project)?;
    let mut rows = state.store.insert("projects", &row).await?;
    if rows.is_empty() {
        return Err(AppError::Internal("failed_to_create_project".to_string()));
    }
    Ok(Json(rows.remove(0)))
}

/// POST /projects/update - Update an existing project (admin only).
pub async fn update_project(
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
        .update("projects", Value::Object(changes))
        .eq("id", &id)
        .execute()
        .await?;
    if rows.is_empty() {
        return Err(AppError::NotFound("project_not_found".to_string()));
    }
    Ok(Json(rows.remove(0)))
}

/// DELETE /projects/{id} - Delete a project (admin only).
pub async fn delete_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    auth::require_admin(&state, &headers).await?;

    state
        .store
        .delete("projects")
        .eq("id", project_id)
        .execute()
        .await?;
    Ok(Json(json!({ "ok": true })))
}
