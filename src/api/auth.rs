//! Authentication API endpoints.

use axum::{extract::State, http::HeaderMap, Json};
use serde_json::{json, Value};

use crate::auth;
use crate::errors::AppError;
use crate::models::{LoginRequest, LoginResponse};
use crate::AppState;

/// POST /auth/login - Login with email or username plus password.
///
/// An identifier containing `@` is treated as an email; anything else is
/// resolved to an email through the admin allowlist's username column.
/// Credential verification is fully delegated to the identity provider.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let mut email = request.email;

    if email.is_none() {
        if let Some(identifier) = request.identifier {
            if identifier.contains('@') {
                email = Some(identifier);
            } else {
                let row = state
                    .store
                    .select("admins")
                    .columns("email")
                    .eq("username", &identifier)
                    .fetch_one()
                    .await?;
                let resolved = row
                    .as_ref()
                    .and_then(|r| r.get("email"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| AppError::BadRequest("invalid_username".to_string()))?;
                email = Some(resolved);
            }
        }
    }

    let Some(email) = email.filter(|e| !e.is_empty()) else {
        return Err(AppError::BadRequest(
            "email_or_username_and_password_required".to_string(),
        ));
    };
    if request.password.is_empty() {
        return Err(AppError::BadRequest(
            "email_or_username_and_password_required".to_string(),
        ));
    }

    let session = state.auth.sign_in(&email, &request.password).await?;
    Ok(Json(session))
}

/// GET /auth/me - Current authenticated user plus admin status.
pub async fn get_me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let user = auth::optional_identity(&state, &headers)
        .await
        .ok_or_else(|| AppError::Unauthorized("unauthorized".to_string()))?;

    let is_admin = auth::is_admin(&state, &user).await;
    Ok(Json(json!({ "user": user, "isAdmin": is_admin })))
}
