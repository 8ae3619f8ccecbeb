//! Backend store client.
//!
//! A thin typed wrapper over the hosted relational store's REST interface
//! (PostgREST dialect). The gateway owns no data; every operation here is a
//! single upstream request against a named collection.

mod query;

pub use query::*;

use reqwest::Method;
use serde_json::Value;

use crate::errors::AppError;

/// Client for the backend store's per-collection REST interface.
///
/// Constructed once at startup and shared by every handler through the
/// application state.
#[derive(Clone)]
pub struct StoreClient {
    http: reqwest::Client,
    rest_url: String,
    service_key: String,
}

impl StoreClient {
    pub fn new(base_url: &str, service_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            rest_url: format!("{}/rest/v1", base_url.trim_end_matches('/')),
            service_key: service_key.to_string(),
        }
    }

    /// Start a request against a collection path with the service credential
    /// attached.
    pub(crate) fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.rest_url, path))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    /// Begin a filtered/paginated read of a collection.
    pub fn select(&self, collection: &str) -> Select<'_> {
        Select::new(self, collection)
    }

    /// Insert a row and return the stored representation.
    pub async fn insert(&self, collection: &str, row: &Value) -> Result<Vec<Value>, AppError> {
        let resp = self
            .request(Method::POST, collection)
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }

    /// Begin a partial update of rows matching the filters added afterwards.
    pub fn update(&self, collection: &str, changes: Value) -> Update<'_> {
        Update {
            client: self,
            collection: collection.to_string(),
            changes,
            filters: Vec::new(),
        }
    }

    /// Begin a delete of rows matching the filters added afterwards.
    pub fn delete(&self, collection: &str) -> Delete<'_> {
        Delete {
            client: self,
            collection: collection.to_string(),
            filters: Vec::new(),
        }
    }

    /// Invoke a named stored procedure.
    ///
    /// The procedure may not exist server-side; callers treat an error here
    /// as "try the fallback", never as fatal on its own.
    pub async fn rpc(&self, function: &str) -> Result<(), AppError> {
        let resp = self
            .request(Method::POST, &format!("rpc/{}", function))
            .json(&Value::Object(Default::default()))
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }
}

/// Partial update builder returning the updated representations.
pub struct Update<'a> {
    client: &'a StoreClient,
    collection: String,
    changes: Value,
    filters: Vec<(String, String)>,
}

impl<'a> Update<'a> {
    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters
            .push((column.to_string(), format!("eq.{}", value.to_string())));
        self
    }

    pub async fn execute(self) -> Result<Vec<Value>, AppError> {
        let resp = self
            .client
            .request(Method::PATCH, &self.collection)
            .header("Prefer", "return=representation")
            .query(&self.filters)
            .json(&self.changes)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }
}

/// Delete builder.
pub struct Delete<'a> {
    client: &'a StoreClient,
    collection: String,
    filters: Vec<(String, String)>,
}

impl<'a> Delete<'a> {
    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters
            .push((column.to_string(), format!("eq.{}", value.to_string())));
        self
    }

    pub fn neq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters
            .push((column.to_string(), format!("neq.{}", value.to_string())));
        self
    }

    pub async fn execute(self) -> Result<(), AppError> {
        let resp = self
            .client
            .request(Method::DELETE, &self.collection)
            .query(&self.filters)
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }
}

/// Map a non-2xx store response to an opaque internal error, logging the
/// upstream body for operators only.
pub(crate) async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, AppError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    tracing::error!("Store responded {}: {}", status, body);
    Err(AppError::Internal("store_request_failed".to_string()))
}
