//! Comment API endpoints, including the polling event stream.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{self, Stream};
use serde::Deserialize;
use serde_json::{json, Value};

use super::page_bounds;
use crate::auth;
use crate::errors::AppError;
use crate::models::{Comment, Page};
use crate::store::StoreClient;
use crate::AppState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

/// Fixed poll interval while the stream is healthy.
const STREAM_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Longer interval after a failed poll.
const STREAM_ERROR_BACKOFF: Duration = Duration::from_secs(5);
const STREAM_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
pub struct CommentListQuery {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

/// GET /comments - List comments, newest first (public).
pub async fn list_comments(
    State(state): State<AppState>,
    Query(params): Query<CommentListQuery>,
) -> Result<Json<Page<Value>>, AppError> {
    let (limit, offset) = page_bounds(params.limit, params.offset, DEFAULT_LIMIT, MAX_LIMIT)?;

    let (items, total) = state
        .store
        .select("comments")
        .order_desc("created_at")
        .range(offset, limit)
        .fetch_with_count()
        .await?;
    Ok(Json(Page { items, total }))
}

/// POST /comments - Create a new comment (public).
pub async fn create_comment(
    State(state): State<AppState>,
    Json(comment): Json<Comment>,
) -> Result<Json<Value>, AppError> {
    if comment.message.trim().is_empty() {
        return Err(AppError::BadRequest("message_required".to_string()));
    }

    let mut row = serde_json::Map::new();
    row.insert("message".to_string(), Value::String(comment.message));
    if let Some(author) = comment.author {
        row.insert("author".to_string(), Value::String(author));
    }

    let mut rows = state.store.insert("comments", &Value::Object(row)).await?;
    if rows.is_empty() {
        return Err(AppError::Internal("failed_to_create_comment".to_string()));
    }
    Ok(Json(rows.remove(0)))
}

/// DELETE /comments/{id} - Delete a comment (admin only).
pub async fn delete_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(comment_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    auth::require_admin(&state, &headers).await?;

    state
        .store
        .delete("comments")
        .eq("id", comment_id)
        .execute()
        .await?;
    Ok(Json(json!({ "ok": true })))
}

/// POST /comments/reset - Delete all comments and reset the id sequence
/// (admin only).
pub async fn reset_comments(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    auth::require_admin(&state, &headers).await?;

    if state.store.rpc("truncate_comments").await.is_err() {
        state
            .store
            .delete("comments")
            .neq("id", 0)
            .execute()
            .await?;
        if let Err(err) = state.store.rpc("reset_comments_identity").await {
            tracing::warn!("Failed to reset comments identity sequence: {}", err);
        }
    }
    Ok(Json(json!({ "ok": true })))
}

/// GET /comments/stream - Long-lived event stream of new comments (public).
///
/// Polling over a held connection: a `connected` event on open, then each
/// new comment as a `comment` event in ascending id order. Transient poll
/// failures surface as non-fatal `error` events followed by a backoff;
/// only client disconnect ends the stream.
pub async fn stream_comments(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let poller = CommentPoller::new(state.store.clone());
    let stream = stream::unfold(poller, |mut poller| async move {
        let event = poller.next_event().await;
        Some((Ok::<Event, Infallible>(event), poller))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(STREAM_KEEPALIVE_INTERVAL)
            .text("keepalive"),
    )
}

/// Ascending-id cursor over the comments collection.
struct CommentPoller {
    store: StoreClient,
    last_seen: i64,
    pending: VecDeque<Event>,
    connected_sent: bool,
    baseline_set: bool,
    delay: Duration,
}

impl CommentPoller {
    fn new(store: StoreClient) -> Self {
        Self {
            store,
            last_seen: 0,
            pending: VecDeque::new(),
            connected_sent: false,
            baseline_set: false,
            delay: STREAM_POLL_INTERVAL,
        }
    }

    /// Produce the next event, sleeping between polls. Cancellation-safe:
    /// dropping the future at any await point just stops the loop.
    async fn next_event(&mut self) -> Event {
        if let Some(event) = self.pending.pop_front() {
            return event;
        }

        if !self.connected_sent {
            self.connected_sent = true;
            return sse_event("connected", &json!({ "ok": true }));
        }

        if !self.baseline_set {
            self.baseline_set = true;
            self.last_seen = self.baseline().await;
        }

        loop {
            tokio::time::sleep(self.delay).await;

            match self.poll().await {
                Ok(rows) => {
                    self.delay = STREAM_POLL_INTERVAL;
                    for row in rows {
                        if let Some(id) = row.get("id").and_then(Value::as_i64) {
                            self.last_seen = self.last_seen.max(id);
                        }
                        self.pending.push_back(sse_event("comment", &row));
                    }
                    if let Some(event) = self.pending.pop_front() {
                        return event;
                    }
                }
                Err(err) => {
                    tracing::warn!("Comment stream poll failed: {}", err);
                    self.delay = STREAM_ERROR_BACKOFF;
                    return sse_event("error", &json!({ "message": "stream_poll_failed" }));
                }
            }
        }
    }

    /// Current maximum comment id; a failed read baselines at 0 so the next
    /// successful poll replays anything missed.
    async fn baseline(&self) -> i64 {
        self.store
            .select("comments")
            .columns("id")
            .order_desc("id")
            .limit(1)
            .fetch()
            .await
            .ok()
            .and_then(|rows| {
                rows.first()
                    .and_then(|row| row.get("id"))
                    .and_then(Value::as_i64)
            })
            .unwrap_or(0)
    }

    async fn poll(&self) -> Result<Vec<Value>, AppError> {
        self.store
            .select("comments")
            .gt("id", self.last_seen)
            .order_asc("id")
            .fetch()
            .await
    }
}

fn sse_event(name: &str, payload: &Value) -> Event {
    Event::default().event(name).data(payload.to_string())
}
