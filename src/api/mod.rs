//! REST API module.
//!
//! One handler module per resource; all list endpoints share the same
//! pagination contract enforced by [`page_bounds`].

mod auth;
mod blog;
mod comments;
mod experiences;
mod images;
mod messages;
mod projects;
mod stats;

pub use auth::*;
pub use blog::*;
pub use comments::*;
pub use experiences::*;
pub use images::*;
pub use messages::*;
pub use projects::*;
pub use stats::*;

use crate::errors::AppError;

/// Validate `limit`/`offset` against a resource's default and ceiling.
///
/// Out-of-bounds values are rejected, not clamped; the per-resource
/// ceilings are part of the API's compatibility contract.
pub fn page_bounds(
    limit: Option<i64>,
    offset: Option<i64>,
    default_limit: i64,
    max_limit: i64,
) -> Result<(i64, i64), AppError> {
    let limit = limit.unwrap_or(default_limit);
    if limit < 0 || limit > max_limit {
        return Err(AppError::BadRequest("limit_out_of_range".to_string()));
    }

    let offset = offset.unwrap_or(0);
    if offset < 0 {
        return Err(AppError::BadRequest("offset_out_of_range".to_string()));
    }

    Ok((limit, offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds_defaults() {
        assert_eq!(page_bounds(None, None, 24, 100).unwrap(), (24, 0));
    }

    #[test]
    fn test_page_bounds_explicit() {
        assert_eq!(page_bounds(Some(10), Some(30), 24, 100).unwrap(), (10, 30));
    }

    #[test]
    fn test_page_bounds_limit_at_ceiling() {
        assert_eq!(page_bounds(Some(100), None, 24, 100).unwrap(), (100, 0));
    }

    #[test]
    fn test_page_bounds_limit_over_ceiling() {
        assert!(page_bounds(Some(101), None, 24, 100).is_err());
    }

    #[test]
    fn test_page_bounds_negative_values() {
        assert!(page_bounds(Some(-1), None, 24, 100).is_err());
        assert!(page_bounds(None, Some(-1), 24, 100).is_err());
    }
}
