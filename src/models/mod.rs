//! Data models for the Porto API gateway.
//!
//! Entities are flat records owned by the backend store; these shapes mirror
//! the store's rows and the frontend's request bodies.

mod blog;
mod comment;
mod experience;
mod image;
mod message;
mod project;
mod stats;
mod user;

pub use blog::*;
pub use comment::*;
pub use experience::*;
pub use image::*;
pub use message::*;
pub use project::*;
pub use stats::*;
pub use user::*;

use serde::Serialize;

/// Envelope for paginated list responses.
///
/// `total` is the exact count of rows matching the same filters as `items`,
/// independent of the page window.
#[derive(Debug, Serialize)]
pub struct Page<T: Serialize> {
    pub items: Vec<T>,
    pub total: i64,
}
