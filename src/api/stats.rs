//! Aggregate statistics endpoint.

use axum::{extract::State, http::HeaderMap, Json};

use crate::auth;
use crate::errors::AppError;
use crate::models::Stats;
use crate::AppState;

/// GET /stats - Exact per-collection counts (admin only).
///
/// Each count is computed independently against the store; unread messages
/// are those whose `read` flag is null plus those where it is false.
pub async fn get_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Stats>, AppError> {
    auth::require_admin(&state, &headers).await?;

    let projects = state.store.select("projects").count().await?;
    let images = state.store.select("images").count().await?;
    let unread_null = state
        .store
        .select("messages")
        .is_null("read")
        .count()
        .await?;
    let unread_false = state
        .store
        .select("messages")
        .eq("read", false)
        .count()
        .await?;
    let experiences = state.store.select("experiences").count().await?;
    let comments = state.store.select("comments").count().await?;
    let blog_posts = state.store.select("blog_posts").count().await?;

    Ok(Json(Stats {
        projects,
        images,
        unread: unread_null + unread_false,
        experiences,
        comments,
        blog_posts,
    }))
}
