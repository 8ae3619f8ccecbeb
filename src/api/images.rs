//! Image API endpoints.
//!
//! Binary content is stored inline as `data:<mime>;base64,<payload>` text;
//! fetch-by-id decodes it back into a cacheable binary response.

use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::{header, HeaderMap},
    response::Response,
    Json,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::page_bounds;
use crate::auth;
use crate::errors::AppError;
use crate::models::{Image, Page};
use crate::AppState;

const DEFAULT_LIMIT: i64 = 24;
const MAX_LIMIT: i64 = 100;
/// Raw payload ceiling for the editor-upload variant, checked before encoding.
const EDITOR_UPLOAD_MAX_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct ImageListQuery {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ImageUploadQuery {
    #[serde(default)]
    pub data_uri: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// GET /images - List image metadata (admin only).
pub async fn list_images(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ImageListQuery>,
) -> Result<Json<Page<Value>>, AppError> {
    auth::require_admin(&state, &headers).await?;

    let (limit, offset) = page_bounds(params.limit, params.offset, DEFAULT_LIMIT, MAX_LIMIT)?;
    let (items, total) = state
        .store
        .select("images")
        .columns("id,filename,mime_type,created_at")
        .order_desc("created_at")
        .range(offset, limit)
        .fetch_with_count()
        .await?;
    Ok(Json(Page { items, total }))
}

/// POST /images - Upload a new image (admin only).
///
/// Accepts either a multipart `file` field or a prebuilt `data_uri` query
/// parameter; exactly one must be provided.
pub async fn upload_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ImageUploadQuery>,
    request: Request,
) -> Result<Json<Value>, AppError> {
    auth::require_admin(&state, &headers).await?;

    let mut filename = params.filename;
    let mut mime_type = params.mime_type;
    let mut data_uri = params.data_uri;
    let mut uploaded = false;

    if is_multipart(&headers) {
        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|_| AppError::BadRequest("invalid_multipart_body".to_string()))?;
        if let Some((file_name, file_mime, bytes)) = read_file_field(&mut multipart).await? {
            let mime = file_mime.unwrap_or_else(|| "application/octet-stream".to_string());
            filename = file_name.or(filename);
            data_uri = Some(build_data_uri(&mime, &bytes));
            mime_type = Some(mime);
            uploaded = true;
        }
    }

    let Some(data_uri) = data_uri else {
        return Err(AppError::BadRequest(
            "no_file_or_data_uri_provided".to_string(),
        ));
    };
    if !uploaded && parse_data_uri(&data_uri).is_none() {
        return Err(AppError::BadRequest(
            "invalid_or_missing_data_uri".to_string(),
        ));
    }

    let mut row = serde_json::Map::new();
    row.insert("data_uri".to_string(), Value::String(data_uri));
    if let Some(filename) = &filename {
        row.insert("filename".to_string(), Value::String(filename.clone()));
    }
    if let Some(mime_type) = &mime_type {
        row.insert("mime_type".to_string(), Value::String(mime_type.clone()));
    }

    let mut rows = state.store.insert("images", &Value::Object(row)).await?;
    if rows.is_empty() {
        return Err(AppError::Internal("failed_to_upload_image".to_string()));
    }

    let stored: Image = serde_json::from_value(rows.remove(0))
        .map_err(|_| AppError::Internal("failed_to_upload_image".to_string()))?;
    let id = stored
        .id
        .ok_or_else(|| AppError::Internal("failed_to_upload_image".to_string()))?;

    Ok(Json(json!({
        "id": id,
        "filename": stored.filename,
        "mime_type": stored.mime_type,
        "url": format!("/images/{}", id),
    })))
}

/// POST /images/upload-for-editor - Upload an image from the rich-text
/// editor (admin only), returning only its public URL.
pub async fn upload_image_for_editor(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    auth::require_admin(&state, &headers).await?;

    let Some((file_name, file_mime, bytes)) = read_file_field(&mut multipart).await? else {
        return Err(AppError::BadRequest("file_required".to_string()));
    };

    if bytes.len() > EDITOR_UPLOAD_MAX_BYTES {
        return Err(AppError::BadRequest(
            "File too large. Maximum size is 10MB.".to_string(),
        ));
    }

    let filename = file_name.unwrap_or_else(|| "editor-upload.jpg".to_string());
    let mime_type = file_mime.unwrap_or_else(|| "image/jpeg".to_string());
    let row = json!({
        "filename": filename,
        "mime_type": mime_type,
        "data_uri": build_data_uri(&mime_type, &bytes),
    });

    let mut rows = state.store.insert("images", &row).await?;
    if rows.is_empty() {
        return Err(AppError::Internal("failed_to_upload_image".to_string()));
    }

    let stored: Image = serde_json::from_value(rows.remove(0))
        .map_err(|_| AppError::Internal("failed_to_upload_image".to_string()))?;
    let id = stored
        .id
        .ok_or_else(|| AppError::Internal("failed_to_upload_image".to_string()))?;

    Ok(Json(json!({ "url": format!("/images/{}", id) })))
}

/// GET /images/{id} - Serve an image's binary content (public).
pub async fn get_image(
    State(state): State<AppState>,
    Path(image_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let row = state
        .store
        .select("images")
        .columns("data_uri,mime_type,filename")
        .eq("id", image_id)
        .fetch_one()
        .await?
        .ok_or_else(|| AppError::NotFound("not_found".to_string()))?;

    let data_uri = row
        .get("data_uri")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::BadRequest("corrupt_data_uri".to_string()))?;
    let (mime, payload) = parse_data_uri(data_uri)
        .ok_or_else(|| AppError::BadRequest("corrupt_data_uri".to_string()))?;
    let bytes = STANDARD
        .decode(payload)
        .map_err(|_| AppError::BadRequest("invalid_base64_data".to_string()))?;

    Response::builder()
        .header(header::CONTENT_TYPE, mime)
        .header(
            header::CACHE_CONTROL,
            "public, max-age=31536000, immutable",
        )
        .body(Body::from(bytes))
        .map_err(|_| AppError::BadRequest("corrupt_data_uri".to_string()))
}

/// PATCH|POST /images/{id} - Update image metadata (admin only).
pub async fn update_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(image_id): Path<Uuid>,
    Json(data): Json<Value>,
) -> Result<Json<Value>, AppError> {
    auth::require_admin(&state, &headers).await?;

    let mut changes = serde_json::Map::new();
    for key in ["filename", "mime_type"] {
        if let Some(value) = data.get(key) {
            changes.insert(key.to_string(), value.clone());
        }
    }
    if changes.is_empty() {
        return Err(AppError::BadRequest("no_updatable_fields".to_string()));
    }

    let mut rows = state
        .store
        .update("images", Value::Object(changes))
        .eq("id", image_id)
        .execute()
        .await?;
    if rows.is_empty() {
        return Err(AppError::NotFound("image_not_found".to_string()));
    }
    Ok(Json(rows.remove(0)))
}

/// DELETE /images/{id} - Delete an image (admin only).
pub async fn delete_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(image_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    auth::require_admin(&state, &headers).await?;

    state
        .store
        .delete("images")
        .eq("id", image_id)
        .execute()
        .await?;
    Ok(Json(json!({ "ok": true })))
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("multipart/form-data"))
        .unwrap_or(false)
}

/// Read the `file` field from a multipart body, if present.
async fn read_file_field(
    multipart: &mut Multipart,
) -> Result<Option<(Option<String>, Option<String>, Bytes)>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::BadRequest("invalid_multipart_body".to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let mime = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|_| AppError::BadRequest("invalid_multipart_body".to_string()))?;
        return Ok(Some((filename, mime, bytes)));
    }
    Ok(None)
}

/// Build a `data:` URI embedding the payload as base64.
fn build_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Split a `data:<mime>;base64,<payload>` URI into mime and payload.
fn parse_data_uri(value: &str) -> Option<(&str, &str)> {
    let rest = value.strip_prefix("data:")?;
    let (mime, rest) = rest.split_once(';')?;
    if mime.is_empty() {
        return None;
    }
    let payload = rest.strip_prefix("base64,")?;
    Some((mime, payload))
}
