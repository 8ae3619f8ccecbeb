//! Identity and login models.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An authenticated caller, reconstructed per request from a validated
/// token. Never persisted by this system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
}

/// Login request: either `email` + `password`, or a generic `identifier`
/// (email or admin username) + `password`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
    #[serde(default)]
    pub identifier: Option<String>,
}

/// Session tokens issued by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}
