//! Read-query builder for the backend store.
//!
//! Filters, ordering and pagination are encoded as query parameters in the
//! store's REST dialect; exact totals come back in the `Content-Range`
//! header when requested.

use reqwest::Method;
use serde_json::Value;

use super::{check_status, StoreClient};
use crate::errors::AppError;

/// A filtered, ordered, paginated read of a single collection.
pub struct Select<'a> {
    client: &'a StoreClient,
    collection: String,
    params: Vec<(String, String)>,
}

impl<'a> Select<'a> {
    pub(crate) fn new(client: &'a StoreClient, collection: &str) -> Self {
        Self {
            client,
            collection: collection.to_string(),
            params: Vec::new(),
        }
    }

    /// Restrict the returned columns (comma-separated list).
    pub fn columns(mut self, columns: &str) -> Self {
        self.params.push(("select".to_string(), columns.to_string()));
        self
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.params
            .push((column.to_string(), format!("eq.{}", value.to_string())));
        self
    }

    pub fn gt(mut self, column: &str, value: impl ToString) -> Self {
        self.params
            .push((column.to_string(), format!("gt.{}", value.to_string())));
        self
    }

    pub fn is_null(mut self, column: &str) -> Self {
        self.params.push((column.to_string(), "is.null".to_string()));
        self
    }

    /// Match rows whose list-valued column contains all of `values`.
    pub fn contains_all(mut self, column: &str, values: &[String]) -> Self {
        self.params
            .push((column.to_string(), format!("cs.{{{}}}", values.join(","))));
        self
    }

    /// Case-insensitive substring match across several columns, OR-combined.
    pub fn search(mut self, columns: &[&str], needle: &str) -> Self {
        let clauses: Vec<String> = columns
            .iter()
            .map(|column| format!("{}.ilike.*{}*", column, needle))
            .collect();
        self.params
            .push(("or".to_string(), format!("({})", clauses.join(","))));
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.params
            .push(("order".to_string(), format!("{}.desc", column)));
        self
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.params
            .push(("order".to_string(), format!("{}.asc", column)));
        self
    }

    pub fn limit(mut self, n: i64) -> Self {
        self.params.push(("limit".to_string(), n.to_string()));
        self
    }

    pub fn offset(mut self, n: i64) -> Self {
        self.params.push(("offset".to_string(), n.to_string()));
        self
    }

    /// Page window: `offset` rows skipped, at most `limit` rows returned.
    pub fn range(self, offset: i64, limit: i64) -> Self {
        self.offset(offset).limit(limit)
    }

    /// Fetch the matching rows.
    pub async fn fetch(self) -> Result<Vec<Value>, AppError> {
        let resp = self.send(false).await?;
        Ok(resp.json().await?)
    }

    /// Fetch at most one row.
    pub async fn fetch_one(self) -> Result<Option<Value>, AppError> {
        let rows = self.limit(1).fetch().await?;
        Ok(rows.into_iter().next())
    }

    /// Fetch the page alongside the exact count of all rows matching the
    /// same filters, independent of the page window.
    pub async fn fetch_with_count(self) -> Result<(Vec<Value>, i64), AppError> {
        let resp = self.send(true).await?;
        let total = resp
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total);
        let rows: Vec<Value> = resp.json().await?;
        match total {
            Some(total) => Ok((rows, total)),
            None => {
                tracing::error!("Store response missing exact count");
                Err(AppError::Internal("store_count_missing".to_string()))
            }
        }
    }

    /// Exact count of rows matching the filters, without fetching them.
    pub async fn count(self) -> Result<i64, AppError> {
        let (_, total) = self.columns("id").limit(1).fetch_with_count().await?;
        Ok(total)
    }

    async fn send(self, exact_count: bool) -> Result<reqwest::Response, AppError> {
        let mut req = self
            .client
            .request(Method::GET, &self.collection)
            .query(&self.params);
        if exact_count {
            req = req.header("Prefer", "count=exact");
        }
        let resp = req.send().await?;
        check_status(resp).await
    }
}

/// Extract the total from a `Content-Range` header value such as `0-9/57`
/// or `*/0`.
fn parse_content_range_total(value: &str) -> Option<i64> {
    value.rsplit('/').next()?.trim().parse().ok()
}
