//! Aggregate statistics model.

use serde::{Deserialize, Serialize};

/// Exact per-collection counts for the admin dashboard. `unread` counts
/// messages whose `read` flag is null or false.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    pub projects: i64,
    pub images: i64,
    pub unread: i64,
    pub experiences: i64,
    pub comments: i64,
    pub blog_posts: i64,
}
