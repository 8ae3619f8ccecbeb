//! Authentication and authorization.
//!
//! Identity is resolved per request against the external identity provider;
//! admin status is a live lookup in the `admins` allowlist collection, never
//! a token claim, so revoking a row takes effect immediately.

use axum::http::{header, HeaderMap};
use serde_json::Value;

use crate::errors::AppError;
use crate::models::{LoginResponse, User};
use crate::AppState;

/// Client for the external identity provider.
#[derive(Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    auth_url: String,
    service_key: String,
}

impl AuthClient {
    pub fn new(base_url: &str, service_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth_url: format!("{}/auth/v1", base_url.trim_end_matches('/')),
            service_key: service_key.to_string(),
        }
    }

    /// Validate a bearer token with the provider and resolve it to a user.
    ///
    /// Every failure mode (expired token, malformed token, provider
    /// unreachable) collapses to `None`; callers cannot distinguish them.
    pub async fn get_user(&self, token: &str) -> Option<User> {
        let resp = self
            .http
            .get(format!("{}/user", self.auth_url))
            .header("apikey", &self.service_key)
            .bearer_auth(token)
            .send()
            .await
            .ok()?;

        if !resp.status().is_success() {
            return None;
        }

        resp.json::<User>().await.ok()
    }

    /// Verify credentials with the provider and return its session tokens.
    ///
    /// Failures forward the provider's message text under a normalized 400.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<LoginResponse, AppError> {
        let resp = self
            .http
            .post(format!("{}/token", self.auth_url))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.service_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        if resp.status().is_success() {
            return Ok(resp.json().await?);
        }

        let body: Value = resp.json().await.unwrap_or(Value::Null);
        let message = body
            .get("error_description")
            .or_else(|| body.get("msg"))
            .or_else(|| body.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("login_failed");
        Err(AppError::BadRequest(message.to_string()))
    }
}

/// Extract the token from a `Bearer <token>` Authorization header.
///
/// Any other header shape is anonymous, not an error.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Resolve the caller's identity if a valid bearer token is present.
///
/// Never fails; anonymous callers and invalid tokens both yield `None`.
pub async fn optional_identity(state: &AppState, headers: &HeaderMap) -> Option<User> {
    let token = bearer_token(headers)?;
    state.auth.get_user(token).await
}

/// Check the allowlist for the given user.
///
/// A failed lookup is treated as "not admin"; callers gating on admin
/// status must not leak the difference.
pub async fn is_admin(state: &AppState, user: &User) -> bool {
    match state
        .store
        .select("admins")
        .columns("user_id")
        .eq("user_id", user.id)
        .fetch()
        .await
    {
        Ok(rows) => !rows.is_empty(),
        Err(_) => false,
    }
}

/// Resolve the identity and check the allowlist, yielding `false` for
/// anonymous callers. Used by endpoints that merely behave differently for
/// admins rather than rejecting everyone else.
pub async fn optional_admin(state: &AppState, headers: &HeaderMap) -> bool {
    match optional_identity(state, headers).await {
        Some(user) => is_admin(state, &user).await,
        None => false,
    }
}

/// Require an authenticated admin.
///
/// Anonymous callers get 401; authenticated non-admins (and failed
/// allowlist lookups) get 403.
pub async fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let user = optional_identity(state, headers)
        .await
        .ok_or_else(|| AppError::Unauthorized("unauthorized".to_string()))?;

    if is_admin(state, &user).await {
        Ok(user)
    } else {
        Err(AppError::Forbidden("forbidden".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(
            bearer_token(&headers_with("Bearer abc123")),
            Some("abc123")
        );
    }

    #[test]
    fn test_bearer_token_missing_header() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_bearer_token_wrong_scheme() {
        assert_eq!(bearer_token(&headers_with("Basic abc123")), None);
        assert_eq!(bearer_token(&headers_with("bearer abc123")), None);
        assert_eq!(bearer_token(&headers_with("abc123")), None);
    }

    #[test]
    fn test_bearer_token_empty_token() {
        // "Bearer " with nothing after it resolves to an empty token; the
        // provider rejects it downstream.
        assert_eq!(bearer_token(&headers_with("Bearer ")), Some(""));
    }
}
