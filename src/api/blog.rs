//! Blog API endpoints.
//!
//! Visibility rule: anonymous and non-admin callers only ever see rows with
//! `published = true`; admins see everything. The same filter is applied in
//! the public list and the get-by-slug read.

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
use crate::models::{BlogPost, Page};
use crate::AppState;

const PUBLIC_DEFAULT_LIMIT: i64 = 12;
const PUBLIC_MAX_LIMIT: i64 = 50;
const ADMIN_DEFAULT_LIMIT: i64 = 50;
const ADMIN_MAX_LIMIT: i64 = 200;

/// Columns returned by the public list; `content` stays out of list
/// payloads.
const LIST_COLUMNS: &str = "id,title,slug,excerpt,featured_image,tags,published,created_at,updated_at";
const SEARCH_FIELDS: [&str; 3] = ["title", "excerpt", "content"];

#[derive(Debug, Deserialize)]
pub struct BlogListQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct BlogAdminListQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

/// GET /blog - List blog posts (public sees published only, admin sees
/// all).
pub async fn list_blog_posts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<BlogListQuery>,
) -> Result<Json<Page<Value>>, AppError> {
    let (limit, offset) = page_bounds(
        params.limit,
        params.offset,
        PUBLIC_DEFAULT_LIMIT,
        PUBLIC_MAX_LIMIT,
    )?;

    let is_admin = auth::optional_admin(&state, &headers).await;

    let mut query = state
        .store
        .select("blog_posts")
        .columns(LIST_COLUMNS)
        .order_desc("created_at");

    if !is_admin {
        query = query.eq("published", true);
    }
    if let Some(q) = params.q.as_deref().filter(|q| !q.is_empty()) {
        query = query.search(&SEARCH_FIELDS, q);
    }
    if let Some(tag) = params.tag.as_deref().filter(|t| !t.is_empty()) {
        query = query.contains_all("tags", &[tag.to_string()]);
    }

    let (items, total) = query.range(offset, limit).fetch_with_count().await?;
    Ok(Json(Page { items, total }))
}

/// GET /blog/posts - List all blog posts with full content (admin only).
pub async fn list_blog_posts_admin(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<BlogAdminListQuery>,
) -> Result<Json<Page<Value>>, AppError> {
    auth::require_admin(&state, &headers).await?;

    let (limit, offset) = page_bounds(
        params.limit,
        params.offset,
        ADMIN_DEFAULT_LIMIT,
        ADMIN_MAX_LIMIT,
    )?;

    let mut query = state.store.select("blog_posts").order_desc("created_at");
    if let Some(q) = params.q.as_deref().filter(|q| !q.is_empty()) {
        query = query.search(&SEARCH_FIELDS, q);
    }

    let (items, total) = query.range(offset, limit).fetch_with_count().await?;
    Ok(Json(Page { items, total }))
}

/// GET /blog/{slug} - Get a single blog post by slug (published for
/// everyone, drafts for admins).
pub async fn get_blog_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Result<Json<Value>, AppError> {
    let is_admin = auth::optional_admin(&state, &headers).await;

    let mut query = state.store.select("blog_posts").eq("slug", &slug);
    if !is_admin {
        query = query.eq("published", true);
    }

    let row = query
        .fetch_one()
        .await?
        .ok_or_else(|| AppError::NotFound("post_not_found".to_string()))?;
    Ok(Json(row))
}

/// POST /blog/posts - Create a new blog post (admin only).
pub async fn create_blog_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut post): Json<BlogPost>,
) -> Result<Json<Value>, AppError> {
    auth::require_admin(&state, &headers).await?;

    if post.slug.as_deref().map_or(true, str::is_empty) && !post.title.is_empty() {
        post.slug = Some(slugify(&post.title));
    }

    let row = serde_json::to_value(&post)?;
    let mut rows = state.store.insert("blog_posts", &row).await?;
    if rows.is_empty() {
        return Err(AppError::Internal("failed_to_create_blog_post".to_string()));
    }
    Ok(Json(rows.remove(0)))
}

/// POST /blog/update - Update a blog post (admin only).
///
/// The slug is re-derived from a changed title only when the caller did not
/// supply a slug in the same payload.
pub async fn update_blog_post(
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
    let slug_supplied = data.get("slug").is_some();

    let mut changes = data.as_object().cloned().unwrap_or_default();
    changes.remove("id");

    if !slug_supplied {
        let new_title = changes
            .get("title")
            .and_then(Value::as_str)
            .filter(|title| !title.is_empty())
            .map(str::to_string);
        if let Some(title) = new_title {
            changes.insert("slug".to_string(), Value::String(slugify(&title)));
        }
    }

    let mut rows = state
        .store
        .update("blog_posts", Value::Object(changes))
        .eq("id", &id)
        .execute()
        .await?;
    if rows.is_empty() {
        return Err(AppError::NotFound("blog_post_not_found".to_string()));
    }
    Ok(Json(rows.remove(0)))
}

/// DELETE /blog/{id} - Delete a blog post (admin only).
pub async fn delete_blog_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(post_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    auth::require_admin(&state, &headers).await?;

    state
        .store
        .delete("blog_posts")
        .eq("id", post_id)
        .execute()
        .await?;
    Ok(Json(json!({ "ok": true })))
}

/// Generate a URL-friendly slug from a title.
///
/// Lowercase, strip everything but letters/digits/spaces/hyphens, turn
/// whitespace runs into single hyphens, collapse repeated hyphens, trim
/// edge hyphens.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();
    let hyphenated = cleaned.split_whitespace().collect::<Vec<_>>().join("-");

    let mut slug = String::with_capacity(hyphenated.len());
    let mut prev_hyphen = false;
    for c in hyphenated.chars() {
        if c == '-' {
            if !prev_hyphen {
                slug.push('-');
            }
            prev_hyphen = true;
        } else {
            slug.push(c);
            prev_hyphen = false;
        }
    }
    slug.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("My First Post"), "my-first-post");
    }

    #[test]
    fn test_slugify_collapses_hyphens_and_whitespace() {
        assert_eq!(slugify("  A -- B  "), "a-b");
        assert_eq!(slugify("a   b\tc"), "a-b-c");
        assert_eq!(slugify("--already--slugged--"), "already-slugged");
    }

    #[test]
    fn test_slugify_strips_non_ascii() {
        assert_eq!(slugify("Café & Crème #5"), "caf-crme-5");
    }

    #[test]
    fn test_slugify_idempotent() {
        for title in ["Hello, World!", "  A -- B  ", "My First Post", "100% Rust"] {
            let once = slugify(title);
            assert_eq!(slugify(&once), once);
        }
    }

    #[test]
    fn test_slugify_empty_results() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify("   "), "");
    }
}
